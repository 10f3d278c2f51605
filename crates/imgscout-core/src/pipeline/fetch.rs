//! Streaming image downloads with a hard size cap.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use super::validate::Validator;
use crate::config::{Config, FetchConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::search::http_client;
use crate::types::FetchedImage;

/// Source of verified image bytes.
///
/// The orchestrator and curation flow only see this trait, so tests can
/// hand them canned bytes without a network.
#[async_trait]
pub trait FetchImage: Send + Sync {
    /// Download and verify `url`. `None` means "skip this candidate".
    async fn fetch_image(&self, url: &str) -> Option<FetchedImage>;
}

/// HTTP downloader.
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    verify: bool,
    validator: Validator,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client, config: &FetchConfig) -> Self {
        Self {
            client,
            max_bytes: config.max_download_mb * 1024 * 1024,
            verify: config.verify,
            validator: Validator::new(),
        }
    }

    /// Build a fetcher with the shared HTTP client settings.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        Ok(Self::new(http_client(&config.http)?, &config.fetch))
    }

    /// Override the byte cap (mostly for tests).
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Download `url`, streaming into memory until the cap is reached.
    pub async fn try_fetch(&self, url: &str) -> PipelineResult<FetchedImage> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::network("Image download", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::status("Image download", status));
        }

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes {
                return Err(PipelineError::validation(format!(
                    "Declared size {len} bytes exceeds cap of {} bytes",
                    self.max_bytes
                )));
            }
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::network("Image download body", e))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(PipelineError::validation(format!(
                    "Download exceeds cap of {} bytes",
                    self.max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!("Fetched {} bytes from {url}", bytes.len());
        Ok(FetchedImage::new(url, bytes, content_type))
    }

    /// Download, logging and swallowing any failure.
    pub async fn fetch(&self, url: &str) -> Option<FetchedImage> {
        match self.try_fetch(url).await {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!("Download failed for {url}: {e}");
                None
            }
        }
    }

    /// Download and run the validator.
    pub async fn try_fetch_verified(&self, url: &str) -> PipelineResult<FetchedImage> {
        let image = self.try_fetch(url).await?;
        let validator = self.validator;

        tokio::task::spawn_blocking(move || {
            validator
                .validate(&image.bytes, image.content_type.as_deref())
                .map(|()| image)
        })
        .await
        .map_err(|e| PipelineError::validation(format!("Validation task failed: {e}")))?
    }

    /// Download and validate, logging and swallowing any failure.
    pub async fn fetch_verified(&self, url: &str) -> Option<FetchedImage> {
        match self.try_fetch_verified(url).await {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!("Skipping {url}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl FetchImage for ImageFetcher {
    async fn fetch_image(&self, url: &str) -> Option<FetchedImage> {
        if self.verify {
            self.fetch_verified(url).await
        } else {
            self.fetch(url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validate::fixtures;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> ImageFetcher {
        ImageFetcher::new(reqwest::Client::new(), &FetchConfig::default())
    }

    #[tokio::test]
    async fn test_fetch_returns_bytes_and_content_type() {
        let server = MockServer::start().await;
        let body = fixtures::jpeg(4, 4);
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(body.clone()),
            )
            .mount(&server)
            .await;

        let image = fetcher()
            .try_fetch(&format!("{}/a", server.uri()))
            .await
            .unwrap();
        assert_eq!(image.bytes, body);
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
        assert_eq!(image.extension, ".png");
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher().try_fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert!(fetcher().fetch(&server.uri()).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_enforces_size_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;

        let err = fetcher()
            .with_max_bytes(1024)
            .try_fetch(&server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_fetch_verified_rejects_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>blocked</html>"),
            )
            .mount(&server)
            .await;

        assert!(fetcher().fetch_verified(&server.uri()).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_image_verifies_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(fixtures::jpeg(6, 6)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(b"not really a jpeg".to_vec()),
            )
            .mount(&server)
            .await;

        let f = fetcher();
        assert!(f.fetch_image(&format!("{}/ok.jpg", server.uri())).await.is_some());
        assert!(f.fetch_image(&format!("{}/bad.jpg", server.uri())).await.is_none());
    }
}
