//! Upload backend trait, factory and the bounded-wait upload helper.

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::search::http_client;
use crate::types::{FetchedImage, HostKind};
use async_trait::async_trait;
use std::time::Duration;

use super::catbox::CatboxUploader;
use super::imgbb::ImgbbUploader;
use super::retry::RetryPolicy;

/// Trait that all image hosts implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn UploadBackend>` for dynamic dispatch).
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Host name for logging (e.g., "ImgBB").
    fn name(&self) -> &str;

    /// Which host this backend talks to.
    fn kind(&self) -> HostKind;

    /// Upload a downloaded image and return the hosted URL.
    ///
    /// `display_name` is sanitized and used as the file stem only. The
    /// extension and MIME type come from the image itself: its content type,
    /// then its magic bytes, then its source URL.
    async fn upload(&self, image: FetchedImage, display_name: &str) -> PipelineResult<String>;

    /// Ask the host to fetch `source_url` itself and return the hosted URL.
    async fn upload_url(&self, source_url: &str) -> PipelineResult<String>;
}

/// Factory that creates upload backends from config.
pub struct UploaderFactory;

impl UploaderFactory {
    /// Create the backend selected by `upload.host`.
    pub fn from_config(config: &Config) -> PipelineResult<Box<dyn UploadBackend>> {
        Self::create(config.upload.host, config)
    }

    /// Create a specific backend.
    ///
    /// Fails with a config error when the host needs a credential that is
    /// not set (ImgBB without an API key).
    pub fn create(kind: HostKind, config: &Config) -> PipelineResult<Box<dyn UploadBackend>> {
        let client = http_client(&config.http)?;
        let policy = RetryPolicy::from_config(&config.upload);
        let quality = config.upload.jpeg_quality;

        let backend: Box<dyn UploadBackend> = match kind {
            HostKind::Imgbb => Box::new(ImgbbUploader::new(
                client,
                &config.upload.imgbb,
                quality,
                policy,
            )?),
            HostKind::Catbox => Box::new(CatboxUploader::new(
                client,
                &config.upload.catbox,
                quality,
                policy,
            )),
        };
        tracing::debug!("Upload backend: {}", backend.name());
        Ok(backend)
    }
}

/// Result of an upload bounded by a deadline.
#[derive(Debug)]
pub enum DeadlineOutcome {
    /// Host returned a URL in time
    Hosted(String),
    /// Host answered with a failure in time
    Failed(PipelineError),
    /// Deadline passed; the request was cancelled
    TimedOut,
}

impl DeadlineOutcome {
    /// The hosted URL, or `fallback` when the upload did not succeed.
    pub fn hosted_or(self, fallback: &str) -> String {
        match self {
            DeadlineOutcome::Hosted(url) => url,
            DeadlineOutcome::Failed(_) | DeadlineOutcome::TimedOut => fallback.to_string(),
        }
    }
}

/// Upload with a hard upper bound on the wait.
///
/// The upload future is dropped when the deadline passes, which cancels the
/// in-flight request.
pub async fn upload_with_deadline(
    backend: &dyn UploadBackend,
    image: FetchedImage,
    display_name: &str,
    deadline: Duration,
) -> DeadlineOutcome {
    match tokio::time::timeout(deadline, backend.upload(image, display_name)).await {
        Ok(Ok(url)) => DeadlineOutcome::Hosted(url),
        Ok(Err(e)) => {
            tracing::warn!("{} upload failed for {display_name}: {e}", backend.name());
            DeadlineOutcome::Failed(e)
        }
        Err(_) => {
            tracing::warn!(
                "{} upload for {display_name} timed out after {deadline:?}",
                backend.name()
            );
            DeadlineOutcome::TimedOut
        }
    }
}
