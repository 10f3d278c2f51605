//! Sub-configuration structs with their defaults.

use crate::types::{HostKind, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Shared HTTP client settings for providers and the fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Accept-Language header sent to search providers
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/123 Safari/537.36"
                .to_string(),
            timeout_secs: 20,
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Search provider selection and per-provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers queried for every row, in this order
    pub providers: Vec<ProviderKind>,

    /// Images retained per provider per row (1 writes a single column)
    pub max_images: usize,

    /// Fixed delay before the single retry on a transient status
    pub retry_delay_ms: u64,

    pub bing: BingConfig,
    pub duckduckgo: DuckDuckGoConfig,
    pub openverse: OpenverseConfig,
    pub google: GoogleConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderKind::Bing,
                ProviderKind::Openverse,
                ProviderKind::DuckDuckGo,
            ],
            max_images: 1,
            retry_delay_ms: 1000,
            bing: BingConfig::default(),
            duckduckgo: DuckDuckGoConfig::default(),
            openverse: OpenverseConfig::default(),
            google: GoogleConfig::default(),
        }
    }
}

/// Bing async image endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BingConfig {
    pub endpoint: String,
}

impl Default for BingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.bing.com/images/async".to_string(),
        }
    }
}

/// DuckDuckGo token page and image JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckDuckGoConfig {
    /// Page that embeds the `vqd` session token
    pub base_url: String,

    /// JSON image results endpoint
    pub image_api_url: String,

    /// Region code sent as `l`
    pub region: String,
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://duckduckgo.com/".to_string(),
            image_api_url: "https://duckduckgo.com/i.js".to_string(),
            region: "us-en".to_string(),
        }
    }
}

/// Openverse public search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenverseConfig {
    pub endpoint: String,

    /// License filter sent as `license_type`
    pub license_type: String,
}

impl Default for OpenverseConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openverse.engineering/v1/images/".to_string(),
            license_type: "commercial".to_string(),
        }
    }
}

/// Google Custom Search JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Search engine ID (supports ${ENV_VAR} syntax)
    pub cx: String,

    /// Restrict results to one site (appended as `site:<value>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    /// Optional `imgType` filter ("photo", "clipart", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            api_key: "${GOOGLE_API_KEY}".to_string(),
            cx: "${GOOGLE_CX}".to_string(),
            site: None,
            image_type: None,
        }
    }
}

/// Image download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Hard cap on a single streamed download, in megabytes
    pub max_download_mb: u64,

    /// Reject downloads that fail content-type or decode verification
    pub verify: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_download_mb: 250,
            verify: true,
        }
    }
}

/// Upload host selection, retry policy and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Which host receives uploads
    pub host: HostKind,

    /// Extra attempts after the first on transient failures
    pub retry_attempts: u32,

    /// Delay before retrying a transient HTTP status
    pub retry_delay_ms: u64,

    /// Delay before retrying a transport failure
    pub transport_retry_delay_ms: u64,

    /// JPEG quality used when re-encoding
    pub jpeg_quality: u8,

    /// Lower bound of the randomized pause after each upload
    pub pause_min_ms: u64,

    /// Upper bound of the randomized pause after each upload
    pub pause_max_ms: u64,

    /// Hard wait for one upload in interactive export
    pub deadline_secs: u64,

    pub imgbb: ImgbbConfig,
    pub catbox: CatboxConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            host: HostKind::Imgbb,
            retry_attempts: 2,
            retry_delay_ms: 1200,
            transport_retry_delay_ms: 1000,
            jpeg_quality: 85,
            pause_min_ms: 600,
            pause_max_ms: 1200,
            deadline_secs: 25,
            imgbb: ImgbbConfig::default(),
            catbox: CatboxConfig::default(),
        }
    }
}

/// ImgBB upload API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImgbbConfig {
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Re-encode ceiling in megabytes
    pub max_mb: u64,

    pub timeout_secs: u64,
}

impl Default for ImgbbConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.imgbb.com/1/upload".to_string(),
            api_key: "${IMGBB_API_KEY}".to_string(),
            max_mb: 15,
            timeout_secs: 20,
        }
    }
}

/// Catbox upload API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatboxConfig {
    pub endpoint: String,

    /// Optional account hash (supports ${ENV_VAR} syntax; anonymous if unset)
    pub userhash: String,

    /// Re-encode ceiling in megabytes
    pub max_mb: u64,

    pub timeout_secs: u64,
}

impl Default for CatboxConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://catbox.moe/user/api.php".to_string(),
            userhash: "${CATBOX_USERHASH}".to_string(),
            max_mb: 195,
            timeout_secs: 30,
        }
    }
}

/// Column layout of the product table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Column holding the search query
    pub product_column: String,

    /// Source image column; never written
    pub image_column: String,

    /// Replace existing values in provider columns
    pub overwrite: bool,

    /// Leave rows with a blank product name untouched
    pub skip_if_blank: bool,

    /// Only process the first N rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_rows: Option<usize>,

    /// Output column prefix per provider
    pub columns: ColumnsConfig,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            product_column: "Product Name".to_string(),
            image_column: "Image URL".to_string(),
            overwrite: false,
            skip_if_blank: true,
            limit_rows: None,
            columns: ColumnsConfig::default(),
        }
    }
}

/// Output column prefixes, one per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub bing: String,
    pub duckduckgo: String,
    pub openverse: String,
    pub google: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            bing: "image_bing".to_string(),
            duckduckgo: "image_duckduckgo".to_string(),
            openverse: "image_openverse".to_string(),
            google: "image_google".to_string(),
        }
    }
}

impl ColumnsConfig {
    /// Column prefix for a provider.
    pub fn prefix_for(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::Bing => &self.bing,
            ProviderKind::DuckDuckGo => &self.duckduckgo,
            ProviderKind::Openverse => &self.openverse,
            ProviderKind::Google => &self.google,
        }
    }
}

/// Local copies of downloaded images.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Save every downloaded image under `<save_root>/<provider>/` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_root: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
