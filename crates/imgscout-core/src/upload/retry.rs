//! Retry loop shared by upload backends.
//!
//! Uploads get a small fixed number of extra attempts. Transient HTTP
//! statuses and transport failures are retried with different fixed delays;
//! anything else fails immediately.

use crate::config::UploadConfig;
use crate::error::{PipelineError, PipelineResult};
use std::time::Duration;

/// Statuses that earn another upload attempt.
pub const TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// How many times, and how long to wait, when an upload fails.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first
    pub extra_attempts: u32,
    /// Delay after a transient status
    pub status_delay: Duration,
    /// Delay after a transport error
    pub transport_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            extra_attempts: config.retry_attempts,
            status_delay: Duration::from_millis(config.retry_delay_ms),
            transport_delay: Duration::from_millis(config.transport_retry_delay_ms),
        }
    }

    /// No waiting between attempts.
    pub fn immediate(extra_attempts: u32) -> Self {
        Self {
            extra_attempts,
            status_delay: Duration::ZERO,
            transport_delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

/// Send the request produced by `build` under `policy`.
///
/// `build` is called once per attempt because multipart bodies are consumed
/// on send. Returns the first 2xx response. A non-transient error status is
/// returned as [`PipelineError::Upload`] together with the start of the body.
pub async fn send_with_retry<F>(
    build: F,
    policy: RetryPolicy,
    context: &str,
) -> PipelineResult<reqwest::Response>
where
    F: Fn() -> PipelineResult<reqwest::RequestBuilder>,
{
    let mut attempt = 0;
    loop {
        let last_attempt = attempt >= policy.extra_attempts;

        match build()?.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => {
                let status = resp.status();
                if TRANSIENT_STATUSES.contains(&status.as_u16()) && !last_attempt {
                    tracing::debug!(
                        "{context}: HTTP {status}, attempt {}/{}",
                        attempt + 1,
                        policy.extra_attempts + 1
                    );
                    tokio::time::sleep(policy.status_delay).await;
                } else {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(PipelineError::Upload {
                        message: format!("{context} HTTP {status}: {}", truncate(&body, 200)),
                        status_code: Some(status.as_u16()),
                    });
                }
            }
            Err(e) => {
                if last_attempt {
                    return Err(PipelineError::network(context, e));
                }
                tracing::debug!(
                    "{context}: transport error, attempt {}/{}: {e}",
                    attempt + 1,
                    policy.extra_attempts + 1
                );
                tokio::time::sleep(policy.transport_delay).await;
            }
        }
        attempt += 1;
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
