//! Single-retry helper for search requests.
//!
//! Search providers retry exactly once, after a fixed delay, and only when
//! the first response carries a status from the provider's allowlist.
//! Transport errors are not retried here.

use crate::error::{PipelineError, PipelineResult};
use std::time::Duration;

/// Statuses worth one retry for most providers.
pub const TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// DuckDuckGo also answers 403 when it is throttling.
pub const DUCKDUCKGO_TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504, 403];

/// Whether `status` is in `allowlist`.
pub fn is_transient(status: u16, allowlist: &[u16]) -> bool {
    allowlist.contains(&status)
}

/// Send the request built by `build`, retrying once on a transient status.
///
/// Returns the successful response, or an error for transport failures and
/// for any non-success status left after the retry.
pub async fn send_with_single_retry<F>(
    build: F,
    allowlist: &[u16],
    delay: Duration,
    context: &str,
) -> PipelineResult<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut resp = build()
        .send()
        .await
        .map_err(|e| PipelineError::network(context, e))?;

    if is_transient(resp.status().as_u16(), allowlist) {
        tracing::debug!(
            "{context}: transient HTTP {}, retrying once after {delay:?}",
            resp.status()
        );
        tokio::time::sleep(delay).await;
        resp = build()
            .send()
            .await
            .map_err(|e| PipelineError::network(context, e))?;
    }

    let status = resp.status();
    if !status.is_success() {
        return Err(PipelineError::status(context, status));
    }
    Ok(resp)
}
