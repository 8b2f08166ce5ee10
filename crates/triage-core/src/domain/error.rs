//! Error taxonomy for the triage core.
//!
//! Policy outcomes (structural violations, unknown authorship, failed author
//! lookups, empty changes) are decisions, not errors. The types here cover
//! only what the engine cannot turn into a decision: malformed inputs and
//! transport faults at the boundary.

/// Errors raised while building a [`ChangeSet`](super::ChangeSet).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeSetError {
    #[error("duplicate path in change set: {path}")]
    DuplicatePath { path: String },
}

/// Faults reported by the repository service boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl From<ChangeSetError> for HostError {
    fn from(err: ChangeSetError) -> Self {
        HostError::InvalidResponse(err.to_string())
    }
}

/// Failure while applying a decision's action plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action {action} failed after {completed} of {planned} actions: {source}")]
pub struct ApplyError {
    /// Name of the action that failed.
    pub action: String,
    pub completed: usize,
    pub planned: usize,
    #[source]
    pub source: HostError,
}

/// Per-change failure surfaced by the cycle runner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriageError {
    #[error("failed to list changed files: {0}")]
    ListFiles(#[source] HostError),

    #[error("failed to resolve submitter identity: {0}")]
    Submitter(#[source] HostError),

    #[error("failed to apply decision: {0}")]
    Apply(#[from] ApplyError),
}

/// Result type for boundary operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_error_display() {
        let err = HostError::Api {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "service returned 502: bad gateway");

        let err = HostError::RateLimited {
            retry_after_secs: 60,
        };
        assert!(err.to_string().contains("retry after 60s"));
    }

    #[test]
    fn apply_error_names_progress() {
        let err = ApplyError {
            action: "merge".into(),
            completed: 1,
            planned: 2,
            source: HostError::Api {
                status: 405,
                message: "not mergeable".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("merge"));
        assert!(msg.contains("1 of 2"));
        assert!(msg.contains("not mergeable"));
    }

    #[test]
    fn change_set_error_converts_to_invalid_response() {
        let err: HostError = ChangeSetError::DuplicatePath { path: "a".into() }.into();
        assert!(matches!(err, HostError::InvalidResponse(_)));
    }
}
