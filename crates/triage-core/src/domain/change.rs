//! Pending changes and the files they touch.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::author::AuthorIdentity;
use super::error::ChangeSetError;

/// How a single file was touched by a pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// One file touched by a pending change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status: ChangeStatus,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self::new(path, ChangeStatus::Added)
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self::new(path, ChangeStatus::Modified)
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self::new(path, ChangeStatus::Removed)
    }
}

/// The complete, ordered file list of one pending change.
///
/// # Invariants
///
/// Every path appears at most once. The field is private so the only way to
/// obtain a `ChangeSet` is through [`ChangeSet::new`], which enforces this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    files: Vec<FileChange>,
}

impl ChangeSet {
    /// Build a change set, rejecting duplicate paths.
    pub fn new(files: Vec<FileChange>) -> Result<Self, ChangeSetError> {
        let mut seen = HashSet::with_capacity(files.len());
        for file in &files {
            if !seen.insert(file.path.as_str()) {
                return Err(ChangeSetError::DuplicatePath {
                    path: file.path.clone(),
                });
            }
        }
        Ok(Self { files })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[FileChange] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl TryFrom<Vec<FileChange>> for ChangeSet {
    type Error = ChangeSetError;

    fn try_from(files: Vec<FileChange>) -> Result<Self, Self::Error> {
        Self::new(files)
    }
}

impl<'de> Deserialize<'de> for ChangeSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            files: Vec<FileChange>,
        }

        let raw = Raw::deserialize(deserializer)?;
        ChangeSet::new(raw.files).map_err(serde::de::Error::custom)
    }
}

/// A pull request awaiting a triage decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Pull request number.
    pub number: u64,
    pub title: String,
    /// Identity of whoever opened the change.
    pub submitter: AuthorIdentity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingChange {
    /// A change nobody (including this bot) has touched since it was opened.
    pub fn is_newly_opened(&self) -> bool {
        self.created_at == self.updated_at
    }
}

impl fmt::Display for PendingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.number)
    }
}
