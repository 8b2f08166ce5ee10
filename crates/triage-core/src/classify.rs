//! File change classifier.
//!
//! Partitions a [`ChangeSet`] into added / modified / removed buckets. The
//! buckets are disjoint, keep the change set's order, and together hold every
//! file exactly once.

use serde::Serialize;

use crate::domain::{ChangeSet, ChangeStatus, FileChange};

/// A change set split by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification<'a> {
    pub added: Vec<&'a FileChange>,
    pub modified: Vec<&'a FileChange>,
    pub removed: Vec<&'a FileChange>,
}

impl Classification<'_> {
    /// Total number of classified files.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify every file in `changes` by its status.
pub fn classify(changes: &ChangeSet) -> Classification<'_> {
    let mut out = Classification::default();
    for file in changes.files() {
        match file.status {
            ChangeStatus::Added => out.added.push(file),
            ChangeStatus::Modified => out.modified.push(file),
            ChangeStatus::Removed => out.removed.push(file),
        }
    }
    out
}
