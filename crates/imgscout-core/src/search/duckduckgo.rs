//! DuckDuckGo image search.
//!
//! Two steps: fetch the regular search page to obtain the `vqd` session
//! token, then call the `i.js` JSON endpoint with it. The token is embedded
//! in a few different shapes depending on the page variant.

use super::provider::ImageSearchProvider;
use super::retry::{send_with_single_retry, DUCKDUCKGO_TRANSIENT_STATUSES};
use crate::config::DuckDuckGoConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ImageResult, ProviderKind, SearchQuery};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, REFERER};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// Token patterns, tried in order.
static VQD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"vqd='([\w-]+)'",
        r#"vqd="([\w-]+)""#,
        r"vqd=([\w-]+)&",
        r#""vqd":"([\w-]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    results: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    image: Option<String>,
    thumbnail: Option<String>,
}

/// DuckDuckGo adapter.
pub struct DuckDuckGoProvider {
    client: reqwest::Client,
    base_url: String,
    image_api_url: String,
    region: String,
    retry_delay: Duration,
}

impl DuckDuckGoProvider {
    pub fn new(
        client: reqwest::Client,
        config: &DuckDuckGoConfig,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            image_api_url: config.image_api_url.clone(),
            region: config.region.clone(),
            retry_delay,
        }
    }

    async fn fetch_token(&self, query: &SearchQuery) -> PipelineResult<String> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", query.as_str())])
            .header(REFERER, &self.base_url)
            .send()
            .await
            .map_err(|e| PipelineError::network("DuckDuckGo token page", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::status("DuckDuckGo token page", status));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| PipelineError::network("DuckDuckGo token page body", e))?;

        extract_vqd(&html).ok_or_else(|| PipelineError::parse("DuckDuckGo vqd token not found"))
    }
}

#[async_trait]
impl ImageSearchProvider for DuckDuckGoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DuckDuckGo
    }

    async fn search(
        &self,
        query: &SearchQuery,
        _limit: usize,
    ) -> PipelineResult<Vec<ImageResult>> {
        let vqd = self.fetch_token(query).await?;
        tracing::trace!("DuckDuckGo vqd token: {vqd}");

        let params = [
            ("q", query.as_str()),
            ("o", "json"),
            ("vqd", vqd.as_str()),
            ("p", "1"),
            ("l", self.region.as_str()),
            ("s", "0"),
            ("ia", "images"),
            ("iax", "images"),
        ];

        let resp = send_with_single_retry(
            || {
                self.client
                    .get(&self.image_api_url)
                    .query(&params)
                    .header(ACCEPT, JSON_ACCEPT)
                    .header(REFERER, &self.base_url)
            },
            DUCKDUCKGO_TRANSIENT_STATUSES,
            self.retry_delay,
            "DuckDuckGo image search",
        )
        .await?;

        let body: ImageResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::parse(format!("DuckDuckGo response: {e}")))?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|item| {
                ImageResult::prefer_full(ProviderKind::DuckDuckGo, item.image, item.thumbnail)
            })
            .collect())
    }
}

/// Find the `vqd` token in a DuckDuckGo search page.
pub fn extract_vqd(html: &str) -> Option<String> {
    VQD_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
