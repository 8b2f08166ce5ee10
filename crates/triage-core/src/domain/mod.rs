//! Domain models for pull request triage.
//!
//! Canonical definitions for the core entities:
//! - `ChangeSet`: Files touched by a pending change, tagged by status
//! - `AuthorResolution`: Outcome of an original-author lookup
//! - `Decision`: Terminal output of the policy engine

pub mod author;
pub mod change;
pub mod decision;
pub mod error;

// Re-export main types and errors
pub use author::{AuthorIdentity, AuthorResolution, PathCommit};
pub use change::{ChangeSet, ChangeStatus, FileChange, PendingChange};
pub use decision::{Decision, DecisionTag, Directive, PolicyRule};
pub use error::{ApplyError, ChangeSetError, HostError, HostResult, TriageError};
