//! Search provider trait and factory.
//!
//! Defines the interface every image-search adapter implements, plus the
//! factory that builds the right adapter from a [`ProviderKind`] and config.

use crate::config::{Config, HttpConfig};
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::types::{dedup_results, ImageResult, ProviderKind, SearchQuery};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use std::time::Duration;

/// Trait that all image-search providers implement.
///
/// Implementors only write [`search`](Self::search), which may fail. The
/// provided methods wrap it with the shared contract: results are
/// deduplicated in first-seen order, capped at `limit`, and any error is
/// logged and degraded to an empty list. Callers therefore cannot tell
/// "no results" from "provider failed", and should not try to.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn ImageSearchProvider>` for dynamic dispatch).
#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    /// Which provider this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Provider name for logging (e.g., "Bing").
    fn name(&self) -> &str {
        self.kind().label()
    }

    /// Query the provider. May return duplicates and more than `limit` items.
    async fn search(&self, query: &SearchQuery, limit: usize)
        -> PipelineResult<Vec<ImageResult>>;

    /// Up to `limit` distinct results, or empty on any failure.
    async fn image_results(&self, query: &SearchQuery, limit: usize) -> Vec<ImageResult> {
        if limit == 0 {
            return Vec::new();
        }
        match self.search(query, limit).await {
            Ok(results) => {
                let results = dedup_results(results, limit);
                tracing::debug!(
                    provider = self.name(),
                    "{} result(s) for {:?}",
                    results.len(),
                    query.as_str()
                );
                results
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.name(),
                    "Search failed for {:?}: {e}",
                    query.as_str()
                );
                Vec::new()
            }
        }
    }

    /// Up to `limit` distinct image URLs, or empty on any failure.
    async fn image_urls(&self, query: &SearchQuery, limit: usize) -> Vec<String> {
        self.image_results(query, limit)
            .await
            .into_iter()
            .map(|r| r.url)
            .collect()
    }
}

/// Build the shared HTTP client: user agent, accept-language and timeout.
pub fn http_client(http: &HttpConfig) -> PipelineResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let language = HeaderValue::from_str(&http.accept_language).map_err(|e| {
        ConfigError::ValidationError(format!("http.accept_language is not a valid header: {e}"))
    })?;
    headers.insert(ACCEPT_LANGUAGE, language);

    reqwest::Client::builder()
        .user_agent(http.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(http.timeout_secs))
        .build()
        .map_err(|e| PipelineError::network("Failed to build HTTP client", e))
}

/// Factory that creates search providers from config.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create one provider.
    pub fn create(
        kind: ProviderKind,
        config: &Config,
    ) -> PipelineResult<Box<dyn ImageSearchProvider>> {
        let client = http_client(&config.http)?;
        let retry_delay = Duration::from_millis(config.search.retry_delay_ms);

        let provider: Box<dyn ImageSearchProvider> = match kind {
            ProviderKind::Bing => Box::new(super::bing::BingProvider::new(
                client,
                &config.search.bing,
                retry_delay,
            )),
            ProviderKind::DuckDuckGo => Box::new(super::duckduckgo::DuckDuckGoProvider::new(
                client,
                &config.search.duckduckgo,
                retry_delay,
            )),
            ProviderKind::Openverse => Box::new(super::openverse::OpenverseProvider::new(
                client,
                &config.search.openverse,
                retry_delay,
            )),
            ProviderKind::Google => Box::new(super::google::GoogleProvider::new(
                client,
                &config.search.google,
                retry_delay,
            )),
        };
        Ok(provider)
    }

    /// Create every provider listed in `search.providers`, in order.
    pub fn create_all(config: &Config) -> PipelineResult<Vec<Box<dyn ImageSearchProvider>>> {
        config
            .search
            .providers
            .iter()
            .map(|kind| Self::create(*kind, config))
            .collect()
    }
}
