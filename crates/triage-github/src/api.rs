//! GitHub REST payloads and their mapping onto triage domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use triage_core::{AuthorIdentity, ChangeSet, FileChange, PathCommit, PendingChange};

use crate::error::{GithubError, Result};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct User {
    pub login: String,
}

/// Entry of `GET /repos/{owner}/{repo}/pulls`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PullRequest {
    pub fn into_pending(self) -> Result<PendingChange> {
        let login = self.user.map(|u| u.login).filter(|l| !l.is_empty());
        let Some(login) = login else {
            return Err(GithubError::InvalidResponse(format!(
                "pull request #{} has no author",
                self.number
            )));
        };
        Ok(PendingChange {
            number: self.number,
            title: self.title,
            submitter: AuthorIdentity::new(login),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Entry of `GET /repos/{owner}/{repo}/pulls/{number}/files`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PullFile {
    pub filename: String,
    pub status: String,
    pub previous_filename: Option<String>,
}

/// Map GitHub file statuses onto the three change kinds.
///
/// A rename counts as removing the old path and adding the new one.
pub(crate) fn change_set(files: Vec<PullFile>) -> Result<ChangeSet> {
    let mut out = Vec::with_capacity(files.len());
    for file in files {
        match file.status.as_str() {
            "added" | "copied" => out.push(FileChange::added(file.filename)),
            "modified" | "changed" => out.push(FileChange::modified(file.filename)),
            "removed" => out.push(FileChange::removed(file.filename)),
            "renamed" => {
                if let Some(previous) = file.previous_filename {
                    out.push(FileChange::removed(previous));
                }
                out.push(FileChange::added(file.filename));
            }
            "unchanged" => {}
            other => {
                debug!(path = %file.filename, status = other, "Unrecognised file status");
                out.push(FileChange::modified(file.filename));
            }
        }
    }
    ChangeSet::new(out).map_err(|e| GithubError::InvalidResponse(e.to_string()))
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitSignature {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitCommit {
    pub author: Option<GitSignature>,
    pub committer: Option<GitSignature>,
}

/// Entry of `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Commit {
    pub sha: String,
    pub author: Option<User>,
    pub commit: GitCommit,
}

impl Commit {
    /// The linked account login, else the git author name.
    pub fn into_path_commit(self) -> PathCommit {
        let name = self.commit.author.as_ref().and_then(|a| a.name.clone());
        let author = self
            .author
            .map(|u| u.login)
            .or(name)
            .filter(|s| !s.is_empty())
            .map(AuthorIdentity::new);
        let committed_at = self
            .commit
            .author
            .as_ref()
            .and_then(|a| a.date)
            .or_else(|| self.commit.committer.as_ref().and_then(|c| c.date))
            .unwrap_or_default();
        PathCommit {
            sha: self.sha,
            author,
            committed_at,
        }
    }
}

/// Body of `POST /repos/{owner}/{repo}/issues/{number}/comments`
#[derive(Debug, Serialize)]
pub(crate) struct NewComment<'a> {
    pub body: &'a str,
}

/// Body of `POST /repos/{owner}/{repo}/issues`
#[derive(Debug, Serialize)]
pub(crate) struct NewIssue<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedIssue {
    pub number: u64,
}

/// Body of `PUT /repos/{owner}/{repo}/pulls/{number}/merge`
#[derive(Debug, Serialize)]
pub(crate) struct MergeRequest<'a> {
    pub merge_method: &'a str,
}

/// Body of `PATCH /repos/{owner}/{repo}/pulls/{number}`
#[derive(Debug, Serialize)]
pub(crate) struct StateUpdate<'a> {
    pub state: &'a str,
}

/// Body of `POST /repos/{owner}/{repo}/pulls/{number}/requested_reviewers`
#[derive(Debug, Serialize)]
pub(crate) struct ReviewerRequest<'a> {
    pub reviewers: Vec<&'a str>,
}

/// Error body GitHub attaches to non-2xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// Extract the `rel="next"` target from a `Link` header.
pub(crate) fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
