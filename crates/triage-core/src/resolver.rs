//! Original author resolution.
//!
//! The original author of a path is the author of the oldest commit that
//! touched it. Resolution is a point-in-time snapshot and is never cached:
//! every call re-reads the history.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{AuthorResolution, HostError, HostResult, PathCommit};
use crate::obs;

/// Default bound on a single history query.
pub const DEFAULT_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Read access to a repository's commit history.
#[async_trait]
pub trait CommitHistory: Send + Sync {
    /// Every commit that touched `path`, ordered oldest first.
    ///
    /// An empty vector means the path has no history. Transport problems are
    /// reported as `Err`.
    async fn commits_for_path(&self, path: &str) -> HostResult<Vec<PathCommit>>;
}

#[async_trait]
impl<T: CommitHistory + ?Sized> CommitHistory for Arc<T> {
    async fn commits_for_path(&self, path: &str) -> HostResult<Vec<PathCommit>> {
        (**self).commits_for_path(path).await
    }
}

/// Anything the policy engine can ask for a path's original author.
#[async_trait]
pub trait ResolveAuthor: Send + Sync {
    async fn resolve(&self, path: &str) -> AuthorResolution;
}

/// [`ResolveAuthor`] backed by a [`CommitHistory`] with a bounded query time.
#[derive(Debug, Clone)]
pub struct HistoryResolver<H> {
    history: H,
    timeout: Duration,
}

impl<H: CommitHistory> HistoryResolver<H> {
    pub fn new(history: H) -> Self {
        Self {
            history,
            timeout: DEFAULT_RESOLUTION_TIMEOUT,
        }
    }

    /// Override the history query timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<H: CommitHistory> ResolveAuthor for HistoryResolver<H> {
    async fn resolve(&self, path: &str) -> AuthorResolution {
        let queried = tokio::time::timeout(self.timeout, self.history.commits_for_path(path)).await;

        let commits = match queried {
            Ok(Ok(commits)) => commits,
            Ok(Err(err)) => {
                obs::emit_resolution_failed(path, &err);
                return AuthorResolution::failed(err.to_string());
            }
            Err(_) => {
                let err = HostError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                obs::emit_resolution_failed(path, &err);
                return AuthorResolution::failed(err.to_string());
            }
        };

        earliest_author(path, &commits)
    }
}

/// Pick the author of the oldest commit in an oldest-first history.
pub fn earliest_author(path: &str, commits: &[PathCommit]) -> AuthorResolution {
    let Some(oldest) = commits.first() else {
        debug!(path = %path, "no commit history for path");
        return AuthorResolution::Unknown;
    };

    match &oldest.author {
        Some(author) => {
            debug!(
                path = %path,
                sha = %oldest.sha,
                author = %author,
                commits = commits.len(),
                "resolved original author"
            );
            AuthorResolution::Known {
                author: author.clone(),
            }
        }
        None => {
            debug!(path = %path, sha = %oldest.sha, "oldest commit has no attributable author");
            AuthorResolution::Unknown
        }
    }
}
