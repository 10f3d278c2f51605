//! Google Custom Search JSON API (image mode).
//!
//! Needs an API key and a search engine ID (`cx`). Both come from config,
//! usually as `${ENV_VAR}` references. They are resolved once when the
//! provider is built; if either is missing that is logged there and every
//! search returns nothing without touching the network.

use super::provider::ImageSearchProvider;
use super::retry::{send_with_single_retry, TRANSIENT_STATUSES};
use crate::config::{resolve_env_var, GoogleConfig};
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::types::{ImageResult, ProviderKind, SearchQuery};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// The API caps `num` at 10 per request.
const MAX_PER_REQUEST: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
    image: Option<ItemImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemImage {
    thumbnail_link: Option<String>,
}

/// Google Custom Search adapter.
pub struct GoogleProvider {
    client: reqwest::Client,
    endpoint: String,
    /// `(api_key, cx)`, or `None` when either is unset
    credentials: Option<(String, String)>,
    site: Option<String>,
    image_type: Option<String>,
    retry_delay: Duration,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, config: &GoogleConfig, retry_delay: Duration) -> Self {
        let credentials = match (resolve_env_var(&config.api_key), resolve_env_var(&config.cx)) {
            (Some(key), Some(cx)) => Some((key, cx)),
            _ => {
                tracing::warn!(provider = "Google", "{}; skipping Google", missing_credentials());
                None
            }
        };
        Self {
            client,
            endpoint: config.endpoint.clone(),
            credentials,
            site: config.site.clone().filter(|s| !s.trim().is_empty()),
            image_type: config.image_type.clone().filter(|s| !s.trim().is_empty()),
            retry_delay,
        }
    }

    fn query_text(&self, query: &SearchQuery) -> String {
        match &self.site {
            Some(site) => format!("{} site:{site}", query.as_str()),
            None => query.as_str().to_string(),
        }
    }
}

#[async_trait]
impl ImageSearchProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn search(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> PipelineResult<Vec<ImageResult>> {
        let Some((key, cx)) = &self.credentials else {
            return Ok(Vec::new());
        };
        let q = self.query_text(query);
        let num = limit.min(MAX_PER_REQUEST).to_string();

        let mut params = vec![
            ("q", q.as_str()),
            ("cx", cx.as_str()),
            ("key", key.as_str()),
            ("searchType", "image"),
            ("num", num.as_str()),
            ("safe", "high"),
        ];
        if let Some(image_type) = &self.image_type {
            params.push(("imgType", image_type.as_str()));
        }

        let resp = send_with_single_retry(
            || self.client.get(&self.endpoint).query(&params),
            TRANSIENT_STATUSES,
            self.retry_delay,
            "Google search",
        )
        .await?;

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::parse(format!("Google response: {e}")))?;

        Ok(body
            .items
            .into_iter()
            .filter_map(|item| {
                let thumb = item.image.and_then(|i| i.thumbnail_link);
                ImageResult::prefer_full(ProviderKind::Google, item.link, thumb)
            })
            .collect())
    }
}

fn missing_credentials() -> ConfigError {
    ConfigError::MissingCredential {
        service: "google".to_string(),
        hint: "set search.google.api_key and search.google.cx \
               (or GOOGLE_API_KEY and GOOGLE_CX)"
            .to_string(),
    }
}
