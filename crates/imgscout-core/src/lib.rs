//! imgscout core - product image search and publishing.
//!
//! For every row of a product table, imgscout asks image-search providers for
//! candidate pictures, downloads and verifies them, prepares them for an image
//! host, uploads them, and writes the hosted URLs back into per-provider
//! columns.
//!
//! # Architecture
//!
//! ```text
//! Table row → Search (Bing/DDG/Openverse/Google) → Fetch → Validate
//!           → Normalize → Upload (ImgBB/Catbox) → Table columns
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use imgscout_core::{Config, ImgScout, Table};
//!
//! #[tokio::main]
//! async fn main() -> imgscout_core::Result<()> {
//!     let scout = ImgScout::new(Config::load()?)?;
//!     let mut table = Table::load("products.csv".as_ref())?;
//!
//!     let stats = scout.orchestrator(false)?.run(&mut table, |_| {}).await?;
//!     table.save("products.csv".as_ref())?;
//!     println!("uploaded {}", stats.uploads_succeeded);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod curate;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod search;
pub mod table;
pub mod types;
pub mod upload;

pub use config::Config;
pub use curate::{Candidate, Selection};
pub use error::{ConfigError, PipelineError, PipelineResult, Result, ScoutError, TableError};
pub use orchestrator::{Orchestrator, RunOptions};
pub use output::{OutputFormat, ReportWriter};
pub use pipeline::{FetchImage, ImageFetcher};
pub use search::{ImageSearchProvider, ProviderFactory};
pub use table::Table;
pub use types::{
    HostKind, ImageResult, ProviderKind, ProviderStatus, RowReport, RunStats, SearchQuery,
};
pub use upload::{UploadBackend, UploaderFactory};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Entry point that wires providers, fetcher and upload host from one config.
pub struct ImgScout {
    config: Config,
}

impl ImgScout {
    /// Validate `config` and keep it for building components.
    pub fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing imgscout v{}", VERSION);
        let config = config.validated()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configured providers, in configured order.
    pub fn providers(&self) -> Result<Vec<Box<dyn ImageSearchProvider>>> {
        Ok(ProviderFactory::create_all(&self.config)?)
    }

    pub fn fetcher(&self) -> Result<ImageFetcher> {
        Ok(ImageFetcher::from_config(&self.config)?)
    }

    /// The upload host selected by `upload.host`.
    pub fn uploader(&self) -> Result<Box<dyn UploadBackend>> {
        Ok(UploaderFactory::from_config(&self.config)?)
    }

    /// A batch orchestrator. Dry runs never build an upload backend, so they
    /// work without host credentials.
    pub fn orchestrator(&self, dry_run: bool) -> Result<Orchestrator> {
        let providers = self.providers()?;
        let fetcher = Box::new(self.fetcher()?);
        let options = RunOptions::from_config(&self.config);

        if dry_run {
            return Ok(Orchestrator::dry_run(providers, fetcher, options));
        }
        Ok(Orchestrator::new(providers, fetcher, self.uploader()?, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.search.max_images = 0;
        assert!(matches!(ImgScout::new(config), Err(ScoutError::Config(_))));
    }

    #[test]
    fn test_dry_run_needs_no_credentials() {
        let mut config = Config::default();
        config.upload.imgbb.api_key = String::new();
        let scout = ImgScout::new(config).unwrap();

        assert!(scout.orchestrator(true).unwrap().options().dry_run);
        assert!(matches!(
            scout.orchestrator(false),
            Err(ScoutError::Pipeline(PipelineError::Config(_)))
        ));
    }
}
