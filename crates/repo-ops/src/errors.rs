//! Error and retry-policy types for repository operations.
//!
//! [`RepoError`] is the single error type returned by every operation and by
//! every [`crate::RepositoryHost`] implementation. Adapters classify transport
//! outcomes into these variants; the operations themselves only ever branch on
//! [`RepoError::is_not_found`].
//!
//! [`RetryPolicy`] is informational. No operation retries on its own; callers
//! that want retries can consult [`RepoError::retry_policy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport failures, rate-limit responses, 5xx.
/// - `NonRetryable` errors: configuration problems, not-found, auth failures,
///   rejected payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without changing its inputs.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Operation errors
// ---------------------------------------------------------------------------

/// Errors produced by repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Local configuration is unusable (missing credential, bad base URL,
    /// empty configured branch).
    ///
    /// Produced before any request is sent.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The remote reported that the addressed resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was addressed (e.g. `"branch feature-x"`).
        resource: String,
    },

    /// The credential was rejected or lacks permission (401/403).
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Message returned by the remote.
        message: String,
    },

    /// The remote is throttling requests (429).
    #[error("Rate limited")]
    RateLimited {
        /// Delay requested by the remote's `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// Any other non-success response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message returned by the remote, or the raw body.
        message: String,
    },

    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("Transport error: {message}")]
    Transport {
        /// Underlying transport error text.
        message: String,
    },

    /// A response body or file content could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// A merge request was requested for a project that is not a fork.
    ///
    /// Raised before any merge-request call is made.
    #[error("Project '{project}' has no fork parent")]
    MissingForkParent {
        /// Project identifier from the request descriptor.
        project: String,
    },
}

impl RepoError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns `true` if the remote reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classifies this error for retry decisions.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Api { status, .. } if *status >= 500 => RetryPolicy::Retryable { after: None },
            _ => RetryPolicy::NonRetryable,
        }
    }
}
