//! Bing image search via the async results page.
//!
//! Bing has no keyless JSON API. The async endpoint returns an HTML fragment
//! whose tiles carry an HTML-escaped JSON blob with `murl` (full image) and
//! `turl` (thumbnail) fields; we scrape those.

use super::provider::ImageSearchProvider;
use super::retry::{send_with_single_retry, TRANSIENT_STATUSES};
use crate::config::BingConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ImageResult, ProviderKind, SearchQuery};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static ESCAPED_MURL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"murl&quot;:&quot;(.*?)&quot;").expect("valid regex"));
static ESCAPED_TURL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"turl&quot;:&quot;(.*?)&quot;").expect("valid regex"));
static PLAIN_MURL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""murl":"(.*?)""#).expect("valid regex"));
static PLAIN_TURL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""turl":"(.*?)""#).expect("valid regex"));

/// Bing scraping adapter.
pub struct BingProvider {
    client: reqwest::Client,
    endpoint: String,
    retry_delay: Duration,
}

impl BingProvider {
    pub fn new(client: reqwest::Client, config: &BingConfig, retry_delay: Duration) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            retry_delay,
        }
    }
}

#[async_trait]
impl ImageSearchProvider for BingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bing
    }

    async fn search(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> PipelineResult<Vec<ImageResult>> {
        let count = limit.to_string();
        let params = [
            ("q", query.as_str()),
            ("first", "0"),
            ("count", count.as_str()),
            ("adlt", "safe"),
            ("qft", "+filterui:photo-photo"),
        ];

        let resp = send_with_single_retry(
            || self.client.get(&self.endpoint).query(&params),
            TRANSIENT_STATUSES,
            self.retry_delay,
            "Bing search",
        )
        .await?;

        let html = resp
            .text()
            .await
            .map_err(|e| PipelineError::network("Bing response body", e))?;

        Ok(extract_results(&html))
    }
}

/// Pull image results out of a Bing results fragment.
///
/// Tries the HTML-escaped form first, then plain JSON. Thumbnails are paired
/// by position only when both lists line up.
pub fn extract_results(html: &str) -> Vec<ImageResult> {
    let patterns = [
        (&*ESCAPED_MURL, &*ESCAPED_TURL),
        (&*PLAIN_MURL, &*PLAIN_TURL),
    ];

    for (full_re, thumb_re) in patterns {
        let full: Vec<String> = captures(full_re, html);
        if full.is_empty() {
            continue;
        }
        let thumbs: Vec<String> = captures(thumb_re, html);
        let paired = thumbs.len() == full.len();

        return full
            .into_iter()
            .enumerate()
            .filter_map(|(i, url)| {
                let thumb = if paired { thumbs.get(i).cloned() } else { None };
                ImageResult::prefer_full(ProviderKind::Bing, Some(url), thumb)
            })
            .collect();
    }
    Vec::new()
}

fn captures(re: &Regex, html: &str) -> Vec<String> {
    re.captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
        .collect()
}
