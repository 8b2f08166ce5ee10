//! In-memory fakes for the boundary traits (testing only)
//!
//! Provides `MemoryHost`, which satisfies `ChangeHost`, `ChangeActions` and
//! `CommitHistory` without any network, and `StaticResolver`, a
//! `ResolveAuthor` with canned answers that counts how often it is asked.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AuthorIdentity, AuthorResolution, ChangeSet, HostError, HostResult, PathCommit, PendingChange,
};
use crate::host::{ChangeActions, ChangeHost};
use crate::resolver::{CommitHistory, ResolveAuthor};

// ---------------------------------------------------------------------------
// MemoryHost
// ---------------------------------------------------------------------------

/// A side effect recorded by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    Comment { change: u64, body: String },
    Merge { change: u64 },
    Close { change: u64 },
    RequestReviewer { change: u64, reviewer: AuthorIdentity },
    OpenIssue { number: u64, title: String, body: String },
}

#[derive(Debug, Default)]
struct HostState {
    changes: Vec<PendingChange>,
    files: HashMap<u64, ChangeSet>,
    history: HashMap<String, Vec<PathCommit>>,
    broken_listings: HashSet<u64>,
    broken_history: HashSet<String>,
    broken_actions: HashSet<&'static str>,
    actions: Vec<RecordedAction>,
    next_issue: u64,
}

/// In-memory repository service.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open change and its files.
    pub fn add_change(&self, change: PendingChange, files: ChangeSet) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(change.number, files);
        state.changes.push(change);
    }

    /// Set the oldest-first history of `path`.
    pub fn set_history(&self, path: &str, commits: Vec<PathCommit>) {
        let mut state = self.state.lock().unwrap();
        state.history.insert(path.to_string(), commits);
    }

    /// Make listing the files of `change` fail.
    pub fn break_listing(&self, change: u64) {
        self.state.lock().unwrap().broken_listings.insert(change);
    }

    /// Make the history query for `path` fail.
    pub fn break_history(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .broken_history
            .insert(path.to_string());
    }

    /// Make every action named `action` fail (see `Action::name`).
    pub fn break_action(&self, action: &'static str) {
        self.state.lock().unwrap().broken_actions.insert(action);
    }

    /// All side effects performed so far, in order.
    pub fn actions(&self) -> Vec<RecordedAction> {
        self.state.lock().unwrap().actions.clone()
    }

    /// Side effects performed on one change.
    pub fn actions_for(&self, change: u64) -> Vec<RecordedAction> {
        self.actions()
            .into_iter()
            .filter(|a| match a {
                RecordedAction::Comment { change: c, .. }
                | RecordedAction::Merge { change: c }
                | RecordedAction::Close { change: c }
                | RecordedAction::RequestReviewer { change: c, .. } => *c == change,
                RecordedAction::OpenIssue { .. } => false,
            })
            .collect()
    }

    fn record(&self, name: &'static str, action: RecordedAction) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.broken_actions.contains(name) {
            return Err(HostError::Api {
                status: 500,
                message: format!("{name} unavailable"),
            });
        }
        state.actions.push(action);
        Ok(())
    }
}

#[async_trait]
impl ChangeHost for MemoryHost {
    async fn list_pending(&self) -> HostResult<Vec<PendingChange>> {
        Ok(self.state.lock().unwrap().changes.clone())
    }

    async fn list_changed_files(&self, change: &PendingChange) -> HostResult<ChangeSet> {
        let state = self.state.lock().unwrap();
        if state.broken_listings.contains(&change.number) {
            return Err(HostError::Transport("connection reset".into()));
        }
        state
            .files
            .get(&change.number)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("pull request {change}")))
    }
}

#[async_trait]
impl ChangeActions for MemoryHost {
    async fn comment(&self, change: &PendingChange, body: &str) -> HostResult<()> {
        self.record(
            "comment",
            RecordedAction::Comment {
                change: change.number,
                body: body.to_string(),
            },
        )
    }

    async fn merge(&self, change: &PendingChange) -> HostResult<()> {
        self.record(
            "merge",
            RecordedAction::Merge {
                change: change.number,
            },
        )
    }

    async fn close(&self, change: &PendingChange) -> HostResult<()> {
        self.record(
            "close",
            RecordedAction::Close {
                change: change.number,
            },
        )
    }

    async fn request_reviewer(
        &self,
        change: &PendingChange,
        reviewer: &AuthorIdentity,
    ) -> HostResult<()> {
        self.record(
            "request_reviewer",
            RecordedAction::RequestReviewer {
                change: change.number,
                reviewer: reviewer.clone(),
            },
        )
    }

    async fn open_issue(&self, title: &str, body: &str) -> HostResult<u64> {
        let number = {
            let mut state = self.state.lock().unwrap();
            state.next_issue += 1;
            1000 + state.next_issue
        };
        self.record(
            "open_issue",
            RecordedAction::OpenIssue {
                number,
                title: title.to_string(),
                body: body.to_string(),
            },
        )?;
        Ok(number)
    }
}

#[async_trait]
impl CommitHistory for MemoryHost {
    async fn commits_for_path(&self, path: &str) -> HostResult<Vec<PathCommit>> {
        let state = self.state.lock().unwrap();
        if state.broken_history.contains(path) {
            return Err(HostError::Api {
                status: 502,
                message: "bad gateway".into(),
            });
        }
        Ok(state.history.get(path).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// StaticResolver
// ---------------------------------------------------------------------------

/// Resolver with fixed answers per path; unlisted paths resolve to `Unknown`.
#[derive(Debug, Default)]
pub struct StaticResolver {
    answers: HashMap<String, AuthorResolution>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, resolution: AuthorResolution) -> Self {
        self.answers.insert(path.to_string(), resolution);
        self
    }

    /// Number of `resolve` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResolveAuthor for StaticResolver {
    async fn resolve(&self, path: &str) -> AuthorResolution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(path)
            .cloned()
            .unwrap_or(AuthorResolution::Unknown)
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A newly opened change submitted by `submitter`.
pub fn pending_change(number: u64, submitter: &str) -> PendingChange {
    let opened = opened_at();
    PendingChange {
        number,
        title: format!("Change {number}"),
        submitter: AuthorIdentity::new(submitter),
        created_at: opened,
        updated_at: opened,
    }
}

/// A commit by `author` at a fixed offset (in hours) after a base time.
pub fn commit(sha: &str, author: Option<&str>, hours: i64) -> PathCommit {
    PathCommit {
        sha: sha.to_string(),
        author: author.map(AuthorIdentity::new),
        committed_at: opened_at() - chrono::Duration::days(30) + chrono::Duration::hours(hours),
    }
}

fn opened_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}
