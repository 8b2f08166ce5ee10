//! Contributor identities and original-author resolution outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque contributor identity (a login or a commit author name).
///
/// Equality is exact and case-sensitive; identities are never normalized or
/// aliased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorIdentity(String);

impl AuthorIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AuthorIdentity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AuthorIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A single commit that touched a path, as reported by the history backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCommit {
    pub sha: String,
    /// `None` when the backend could not attribute the commit to anyone.
    pub author: Option<AuthorIdentity>,
    pub committed_at: DateTime<Utc>,
}

/// Outcome of resolving the original author of a path.
///
/// `Unknown` and `Failed` are deliberately separate: the first means the
/// history was read and holds nothing attributable, the second means the
/// history could not be read at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthorResolution {
    Known { author: AuthorIdentity },
    Unknown,
    Failed { reason: String },
}

impl AuthorResolution {
    pub fn known(author: impl Into<AuthorIdentity>) -> Self {
        Self::Known {
            author: author.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// The resolved author, if any.
    pub fn author(&self) -> Option<&AuthorIdentity> {
        match self {
            Self::Known { author } => Some(author),
            Self::Unknown | Self::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_case_sensitive() {
        assert_ne!(AuthorIdentity::new("Alice"), AuthorIdentity::new("alice"));
        assert_eq!(AuthorIdentity::new("alice"), AuthorIdentity::from("alice"));
    }

    #[test]
    fn only_known_resolution_has_author() {
        assert_eq!(
            AuthorResolution::known("alice").author(),
            Some(&AuthorIdentity::new("alice"))
        );
        assert_eq!(AuthorResolution::Unknown.author(), None);
        assert_eq!(AuthorResolution::failed("timeout").author(), None);
    }

    #[test]
    fn resolution_serializes_with_outcome_tag() {
        let json = serde_json::to_value(AuthorResolution::known("alice")).unwrap();
        assert_eq!(json["outcome"], "known");
        assert_eq!(json["author"], "alice");
    }
}
