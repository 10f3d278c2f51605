//! ImgBB upload API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use super::backend::UploadBackend;
use super::retry::{send_with_retry, RetryPolicy};
use crate::config::{resolve_env_var, ImgbbConfig};
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::pipeline::{safe_name, Normalizer};
use crate::types::{FetchedImage, HostKind};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    display_url: Option<String>,
    url: Option<String>,
}

/// ImgBB backend. Requires an API key.
pub struct ImgbbUploader {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
    normalizer: Normalizer,
    policy: RetryPolicy,
}

impl ImgbbUploader {
    pub fn new(
        client: reqwest::Client,
        config: &ImgbbConfig,
        jpeg_quality: u8,
        policy: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        let api_key =
            resolve_env_var(&config.api_key).ok_or_else(|| ConfigError::MissingCredential {
                service: "imgbb".to_string(),
                hint: "set upload.imgbb.api_key or IMGBB_API_KEY".to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
            normalizer: Normalizer::with_max_mb(config.max_mb, jpeg_quality),
            policy,
        })
    }

    async fn post(&self, build_form: impl Fn() -> PipelineResult<Form>) -> PipelineResult<String> {
        let resp = send_with_retry(
            || {
                Ok(self
                    .client
                    .post(&self.endpoint)
                    .query(&[("key", self.api_key.as_str())])
                    .timeout(self.timeout)
                    .multipart(build_form()?))
            },
            self.policy,
            "ImgBB upload",
        )
        .await?;

        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::network("ImgBB response body", e))?;
        parse_response(&body)
    }
}

#[async_trait]
impl UploadBackend for ImgbbUploader {
    fn name(&self) -> &str {
        "ImgBB"
    }

    fn kind(&self) -> HostKind {
        HostKind::Imgbb
    }

    async fn upload(&self, image: FetchedImage, display_name: &str) -> PipelineResult<String> {
        let image = self
            .normalizer
            .normalize_async(image.bytes, image.content_type, image.url)
            .await?;

        let name = safe_name(display_name, "image");
        let filename = format!("{name}{}", image.extension);

        self.post(|| {
            let part = Part::bytes(image.bytes.clone())
                .file_name(filename.clone())
                .mime_str(&image.mime_type)
                .map_err(|e| PipelineError::network("ImgBB multipart", e))?;
            Ok(Form::new().part("image", part).text("name", name.clone()))
        })
        .await
    }

    async fn upload_url(&self, source_url: &str) -> PipelineResult<String> {
        self.post(|| Ok(Form::new().text("image", source_url.to_string())))
            .await
    }
}

/// Pull the hosted URL out of an ImgBB response body.
fn parse_response(body: &str) -> PipelineResult<String> {
    let payload: UploadResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::parse(format!("ImgBB response: {e}")))?;

    if !payload.success {
        let detail = payload
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "success=false".to_string());
        return Err(PipelineError::Upload {
            message: format!("ImgBB rejected upload: {detail}"),
            status_code: None,
        });
    }

    payload
        .data
        .and_then(|d| d.display_url.or(d.url))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| PipelineError::parse("ImgBB response has no display_url"))
}
