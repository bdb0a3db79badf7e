//! HTTP helpers shared by the remote adapters.

use famlog_core::{defaults, Error, Result};

/// Pass a successful response through; turn any other status into `RemoteError`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    api: &str,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::RemoteError(format!(
        "{} API returned {}: {}",
        api,
        status,
        preview(&body)
    )))
}

/// Map a transport failure to `NetworkFailure`.
pub(crate) fn network_failure(api: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::NetworkFailure(format!("{} request timed out: {}", api, e))
    } else {
        Error::NetworkFailure(format!("{} request failed: {}", api, e))
    }
}

/// Map an undecodable body to `RemoteError`.
pub(crate) fn malformed_body(api: &str, e: reqwest::Error) -> Error {
    Error::RemoteError(format!("Failed to parse {} response: {}", api, e))
}

/// Truncate a response body for inclusion in an error reason.
pub(crate) fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= defaults::ERROR_BODY_PREVIEW {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(defaults::ERROR_BODY_PREVIEW).collect();
    out.push('…');
    out
}
