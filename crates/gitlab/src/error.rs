//! Classification of HTTP outcomes into [`RepoError`].

use std::time::Duration;

use repo_ops::RepoError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;

/// Error body returned by GitLab.
///
/// `message` is usually a string (`"404 Branch Not Found"`) but is an object
/// of field → messages for validation failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Extracts the human-readable message from an error body, falling back to the
/// raw body when it is not GitLab's JSON shape.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let message = parsed.and_then(|b| match (b.message, b.error) {
        (Some(serde_json::Value::String(s)), _) => Some(s),
        (Some(other), _) => Some(other.to_string()),
        (None, Some(e)) => Some(e),
        (None, None) => None,
    });
    message.unwrap_or_else(|| body.trim().to_string())
}

/// Classify a non-success status and its body into a typed error.
///
/// `resource` names what was addressed (e.g. `"branch feature"`) and is used
/// for not-found errors.
pub fn from_status(
    status: StatusCode,
    body: &str,
    resource: &str,
    retry_after: Option<Duration>,
) -> RepoError {
    let message = error_message(body);
    match status {
        StatusCode::NOT_FOUND => RepoError::not_found(format!("{resource} ({message})")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepoError::Unauthorized {
            message: format!("{status}: {message}"),
        },
        StatusCode::TOO_MANY_REQUESTS => RepoError::RateLimited { retry_after },
        _ => RepoError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Convert a `reqwest` failure that produced no usable response.
pub fn from_transport(err: reqwest::Error) -> RepoError {
    if err.is_decode() {
        RepoError::decode(err.to_string())
    } else {
        RepoError::Transport {
            message: err.to_string(),
        }
    }
}

/// Parses a delta-seconds `Retry-After` header.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
