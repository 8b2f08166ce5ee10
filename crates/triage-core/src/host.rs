//! Boundary traits for the repository hosting service.
//!
//! These traits define what the triage core needs from the outside world:
//! - `ChangeHost`: read pending changes and the files they touch
//! - `ChangeActions`: write side used by the action executor
//!
//! Both are async and backend-agnostic. In-memory fakes are provided for
//! testing via the `fakes` module.

use async_trait::async_trait;

use crate::domain::{AuthorIdentity, ChangeSet, HostResult, PendingChange};

/// Read access to pending changes.
#[async_trait]
pub trait ChangeHost: Send + Sync {
    /// All currently open pending changes.
    async fn list_pending(&self) -> HostResult<Vec<PendingChange>>;

    /// The files touched by `change`, reflecting its current state.
    async fn list_changed_files(&self, change: &PendingChange) -> HostResult<ChangeSet>;

    /// Identity of whoever opened `change`.
    ///
    /// Defaults to the submitter recorded when the change was listed.
    async fn submitter_identity(&self, change: &PendingChange) -> HostResult<AuthorIdentity> {
        Ok(change.submitter.clone())
    }
}

/// Side effects the action executor can perform on a pending change.
#[async_trait]
pub trait ChangeActions: Send + Sync {
    async fn comment(&self, change: &PendingChange, body: &str) -> HostResult<()>;

    async fn merge(&self, change: &PendingChange) -> HostResult<()>;

    async fn close(&self, change: &PendingChange) -> HostResult<()>;

    async fn request_reviewer(
        &self,
        change: &PendingChange,
        reviewer: &AuthorIdentity,
    ) -> HostResult<()>;

    /// Open a follow-up issue, returning its number.
    async fn open_issue(&self, title: &str, body: &str) -> HostResult<u64>;
}
