//! Core data types shared by providers, the pipeline, uploaders and drivers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::pipeline::guess_ext_and_type;

/// The image-search providers imgscout can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Bing,
    #[serde(alias = "ddg")]
    DuckDuckGo,
    Openverse,
    Google,
}

impl ProviderKind {
    /// All providers in their canonical order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Bing,
        ProviderKind::DuckDuckGo,
        ProviderKind::Openverse,
        ProviderKind::Google,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Bing => "Bing",
            ProviderKind::DuckDuckGo => "DuckDuckGo",
            ProviderKind::Openverse => "Openverse",
            ProviderKind::Google => "Google",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            ProviderKind::Bing => "bing",
            ProviderKind::DuckDuckGo => "duckduckgo",
            ProviderKind::Openverse => "openverse",
            ProviderKind::Google => "google",
        };
        f.write_str(key)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bing" => Ok(ProviderKind::Bing),
            "duckduckgo" | "ddg" => Ok(ProviderKind::DuckDuckGo),
            "openverse" => Ok(ProviderKind::Openverse),
            "google" => Ok(ProviderKind::Google),
            other => Err(format!("Unknown search provider: {other}")),
        }
    }
}

/// The image hosts imgscout can upload to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    Imgbb,
    Catbox,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKind::Imgbb => f.write_str("imgbb"),
            HostKind::Catbox => f.write_str("catbox"),
        }
    }
}

impl FromStr for HostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "imgbb" => Ok(HostKind::Imgbb),
            "catbox" | "catboxmoe" => Ok(HostKind::Catbox),
            other => Err(format!("Unknown upload host: {other}")),
        }
    }
}

/// A trimmed, non-empty product search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Returns `None` when the input is blank after trimming.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One image found by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub provider: ProviderKind,

    /// Full-resolution URL, or the thumbnail when no full URL was offered
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl ImageResult {
    /// Pick the full-resolution URL when present, falling back to the thumbnail.
    ///
    /// Returns `None` when neither is a non-empty string.
    pub fn prefer_full(
        provider: ProviderKind,
        full: Option<String>,
        thumbnail: Option<String>,
    ) -> Option<Self> {
        let full = full.filter(|u| !u.trim().is_empty());
        let thumbnail = thumbnail.filter(|u| !u.trim().is_empty());
        match (full, thumbnail) {
            (Some(url), thumbnail_url) => Some(Self {
                provider,
                url,
                thumbnail_url,
            }),
            (None, Some(thumb)) => Some(Self {
                provider,
                url: thumb.clone(),
                thumbnail_url: Some(thumb),
            }),
            (None, None) => None,
        }
    }
}

/// Drop repeated URLs, keep first-seen order, and cap the length at `limit`.
pub fn dedup_results(results: Vec<ImageResult>, limit: usize) -> Vec<ImageResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .take(limit)
        .collect()
}

/// Downloaded bytes plus what the server said about them.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub url: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Extension guessed from the content type or URL, with leading dot
    pub extension: String,
}

impl FetchedImage {
    /// Wrap downloaded bytes, guessing the extension from `content_type` and `url`.
    pub fn new(url: impl Into<String>, bytes: Vec<u8>, content_type: Option<String>) -> Self {
        let url = url.into();
        let (extension, _) = guess_ext_and_type(content_type.as_deref(), &url);
        Self {
            url,
            bytes,
            content_type,
            extension: extension.to_string(),
        }
    }
}

/// Bytes ready to send to an upload host.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    /// Extension with leading dot (".jpg", ".png", ...)
    pub extension: String,
    pub mime_type: String,
    /// True when the bytes were re-encoded as JPEG
    pub reencoded: bool,
}

/// Name of the output column for one slot.
///
/// With a single slot per provider the bare prefix is used; otherwise slots
/// are numbered from 1 (`<prefix>_1`, `<prefix>_2`, ...).
pub fn slot_column(prefix: &str, index: usize, slots: usize) -> String {
    if slots <= 1 {
        prefix.to_string()
    } else {
        format!("{prefix}_{index}")
    }
}

/// All output column names for a provider prefix.
pub fn slot_columns(prefix: &str, slots: usize) -> Vec<String> {
    (1..=slots.max(1))
        .map(|i| slot_column(prefix, i, slots))
        .collect()
}

/// What happened for one provider on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// At least one image was uploaded and recorded
    Uploaded,
    /// Existing value kept because overwrite is off
    Skipped,
    /// Provider returned no URLs
    NoResults,
    /// URLs were found but none made it through fetch and upload
    Failed,
    /// Dry run: URLs found, nothing uploaded
    Found,
}

/// Per-provider outcome inside a row report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOutcome {
    pub provider: ProviderKind,
    pub status: ProviderStatus,

    /// Values written to the provider's slots
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosted_urls: Vec<String>,

    /// Source URLs returned by the provider
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ProviderOutcome {
    pub fn new(provider: ProviderKind, status: ProviderStatus) -> Self {
        Self {
            provider,
            status,
            hosted_urls: Vec::new(),
            source_urls: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Outcome of processing one table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowReport {
    /// Zero-based row index in the table
    pub row: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// True when the row was left untouched because the product was blank
    #[serde(default)]
    pub skipped_blank: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<ProviderOutcome>,
}

/// Counters for a full pass over the table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunStats {
    pub rows_total: usize,
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub uploads_succeeded: usize,
    pub uploads_failed: usize,

    /// Rows updated per output column prefix
    pub updates: BTreeMap<String, usize>,

    pub total_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str) -> ImageResult {
        ImageResult {
            provider: ProviderKind::Bing,
            url: url.to_string(),
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_search_query_rejects_blank() {
        assert!(SearchQuery::new("   ").is_none());
        assert!(SearchQuery::new("").is_none());
        assert_eq!(SearchQuery::new("  Widget ").unwrap().as_str(), "Widget");
    }

    #[test]
    fn test_dedup_preserves_first_seen_order_and_limit() {
        let results = vec![
            result("http://a"),
            result("http://b"),
            result("http://a"),
            result("http://c"),
            result("http://b"),
            result("http://d"),
        ];
        let urls: Vec<_> = dedup_results(results, 3)
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(urls, vec!["http://a", "http://b", "http://c"]);
    }

    #[test]
    fn test_prefer_full_resolution() {
        let r = ImageResult::prefer_full(
            ProviderKind::Openverse,
            Some("http://full".into()),
            Some("http://thumb".into()),
        )
        .unwrap();
        assert_eq!(r.url, "http://full");
        assert_eq!(r.thumbnail_url.as_deref(), Some("http://thumb"));
    }

    #[test]
    fn test_prefer_full_falls_back_to_thumbnail() {
        let r = ImageResult::prefer_full(
            ProviderKind::DuckDuckGo,
            Some("".into()),
            Some("http://thumb".into()),
        )
        .unwrap();
        assert_eq!(r.url, "http://thumb");
        assert!(ImageResult::prefer_full(ProviderKind::Bing, None, None).is_none());
    }

    #[test]
    fn test_slot_columns_single_and_multi() {
        assert_eq!(slot_columns("image_bing", 1), vec!["image_bing"]);
        assert_eq!(
            slot_columns("image_bing", 3),
            vec!["image_bing_1", "image_bing_2", "image_bing_3"]
        );
    }

    #[test]
    fn test_provider_kind_parse_and_display() {
        assert_eq!("DDG".parse::<ProviderKind>(), Ok(ProviderKind::DuckDuckGo));
        assert_eq!(ProviderKind::DuckDuckGo.to_string(), "duckduckgo");
        assert!("yahoo".parse::<ProviderKind>().is_err());
        assert_eq!("catbox".parse::<HostKind>(), Ok(HostKind::Catbox));
    }

    #[test]
    fn test_row_report_serialization_skips_empty() {
        let report = RowReport {
            row: 0,
            product: Some("Widget".to_string()),
            skipped_blank: false,
            outcomes: vec![ProviderOutcome::new(
                ProviderKind::Bing,
                ProviderStatus::NoResults,
            )],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"no_results\""));
        assert!(!json.contains("hosted_urls"));
    }
}
