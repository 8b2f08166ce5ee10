//! Error types for triage-github

use thiserror::Error;
use triage_core::HostError;

/// Errors that can occur while talking to the GitHub REST API
#[derive(Error, Debug)]
pub enum GithubError {
    /// Repository slug is not `owner/name`
    #[error("invalid repository slug: {0:?} (expected owner/name)")]
    InvalidRepository(String),

    /// Merge method is not one of merge, squash, rebase
    #[error("invalid merge method: {0:?}")]
    InvalidMergeMethod(String),

    /// Request URL could not be built
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// GitHub answered with a non-success status
    #[error("GitHub returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limit still exhausted after all retries
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Response body did not have the expected shape
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response was well-formed JSON but semantically unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        GithubError::Http(err.to_string())
    }
}

impl GithubError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GithubError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<GithubError> for HostError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Api { status: 404, message } => HostError::NotFound(message),
            GithubError::Api { status, message } => HostError::Api { status, message },
            GithubError::RateLimited { retry_after_secs } => {
                HostError::RateLimited { retry_after_secs }
            }
            GithubError::Timeout { timeout_ms } => HostError::Timeout { timeout_ms },
            GithubError::Json(e) => HostError::InvalidResponse(e.to_string()),
            GithubError::InvalidResponse(msg) => HostError::InvalidResponse(msg),
            other => HostError::Transport(other.to_string()),
        }
    }
}

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, GithubError>;
