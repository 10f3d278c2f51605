//! Catbox upload API.
//!
//! Anonymous uploads need no credentials; a userhash attaches uploads to an
//! account. Success is a plain URL in the body, errors are free text.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::backend::UploadBackend;
use super::retry::{send_with_retry, RetryPolicy};
use crate::config::{resolve_env_var, CatboxConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{safe_name, Normalizer};
use crate::types::{FetchedImage, HostKind};

/// Catbox backend.
pub struct CatboxUploader {
    client: reqwest::Client,
    endpoint: String,
    userhash: Option<String>,
    timeout: Duration,
    normalizer: Normalizer,
    policy: RetryPolicy,
}

impl CatboxUploader {
    pub fn new(
        client: reqwest::Client,
        config: &CatboxConfig,
        jpeg_quality: u8,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            userhash: resolve_env_var(&config.userhash),
            timeout: Duration::from_secs(config.timeout_secs),
            normalizer: Normalizer::with_max_mb(config.max_mb, jpeg_quality),
            policy,
        }
    }

    async fn read_url(resp: reqwest::Response) -> PipelineResult<String> {
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::network("Catbox response body", e))?;
        parse_response(&body)
    }
}

#[async_trait]
impl UploadBackend for CatboxUploader {
    fn name(&self) -> &str {
        "Catbox"
    }

    fn kind(&self) -> HostKind {
        HostKind::Catbox
    }

    async fn upload(&self, image: FetchedImage, display_name: &str) -> PipelineResult<String> {
        let image = self
            .normalizer
            .normalize_async(image.bytes, image.content_type, image.url)
            .await?;

        let filename = format!("{}{}", safe_name(display_name, "file"), image.extension);

        let resp = send_with_retry(
            || {
                let part = Part::bytes(image.bytes.clone())
                    .file_name(filename.clone())
                    .mime_str(&image.mime_type)
                    .map_err(|e| PipelineError::network("Catbox multipart", e))?;
                let mut form = Form::new().text("reqtype", "fileupload");
                if let Some(hash) = &self.userhash {
                    form = form.text("userhash", hash.clone());
                }
                Ok(self
                    .client
                    .post(&self.endpoint)
                    .timeout(self.timeout)
                    .multipart(form.part("fileToUpload", part)))
            },
            self.policy,
            "Catbox upload",
        )
        .await?;

        Self::read_url(resp).await
    }

    async fn upload_url(&self, source_url: &str) -> PipelineResult<String> {
        let mut params = vec![("reqtype", "urlupload"), ("url", source_url)];
        if let Some(hash) = &self.userhash {
            params.push(("userhash", hash.as_str()));
        }

        let resp = send_with_retry(
            || {
                Ok(self
                    .client
                    .post(&self.endpoint)
                    .timeout(self.timeout)
                    .form(&params))
            },
            self.policy,
            "Catbox URL upload",
        )
        .await?;

        Self::read_url(resp).await
    }
}

/// A trimmed body starting with "http" is the hosted URL.
fn parse_response(body: &str) -> PipelineResult<String> {
    let text = body.trim();
    if text.starts_with("http") {
        Ok(text.to_string())
    } else {
        Err(PipelineError::Upload {
            message: format!("Catbox rejected upload: {text}"),
            status_code: None,
        })
    }
}
