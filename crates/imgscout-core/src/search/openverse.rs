//! Openverse public image search API.

use super::provider::ImageSearchProvider;
use super::retry::{send_with_single_retry, TRANSIENT_STATUSES};
use crate::config::OpenverseConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ImageResult, ProviderKind, SearchQuery};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    url: Option<String>,
    thumbnail: Option<String>,
}

/// Openverse adapter. No credentials needed.
pub struct OpenverseProvider {
    client: reqwest::Client,
    endpoint: String,
    license_type: String,
    retry_delay: Duration,
}

impl OpenverseProvider {
    pub fn new(client: reqwest::Client, config: &OpenverseConfig, retry_delay: Duration) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            license_type: config.license_type.clone(),
            retry_delay,
        }
    }
}

#[async_trait]
impl ImageSearchProvider for OpenverseProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Openverse
    }

    async fn search(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> PipelineResult<Vec<ImageResult>> {
        let page_size = limit.to_string();
        let params = [
            ("q", query.as_str()),
            ("license_type", self.license_type.as_str()),
            ("page_size", page_size.as_str()),
        ];

        let resp = send_with_single_retry(
            || self.client.get(&self.endpoint).query(&params),
            TRANSIENT_STATUSES,
            self.retry_delay,
            "Openverse search",
        )
        .await?;

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::parse(format!("Openverse response: {e}")))?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|item| {
                ImageResult::prefer_full(ProviderKind::Openverse, item.url, item.thumbnail)
            })
            .collect())
    }
}
