//! Terminal triage decisions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::author::AuthorIdentity;

/// The terminal action chosen for a pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionTag {
    Accept,
    Reject,
    Hold,
    RequestInfo,
}

impl fmt::Display for DecisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionTag::Accept => "accept",
            DecisionTag::Reject => "reject",
            DecisionTag::Hold => "hold",
            DecisionTag::RequestInfo => "request_info",
        };
        f.write_str(s)
    }
}

/// Row of the decision table that produced a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRule {
    RemovedFiles,
    MultipleAdded,
    MultipleModified,
    SingleAdded,
    SingleModified,
    NoActionableChanges,
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyRule::RemovedFiles => "removed_files",
            PolicyRule::MultipleAdded => "multiple_added",
            PolicyRule::MultipleModified => "multiple_modified",
            PolicyRule::SingleAdded => "single_added",
            PolicyRule::SingleModified => "single_modified",
            PolicyRule::NoActionableChanges => "no_actionable_changes",
        };
        f.write_str(s)
    }
}

/// Extra side effect attached to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    AssignReviewer { reviewer: AuthorIdentity },
    OpenIssue { title: String, body: String },
}

/// Output of the policy engine for one pending change.
///
/// Fields are private and there is no `Deserialize`: only the policy engine
/// builds a decision, and it is fixed once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    tag: DecisionTag,
    rule: PolicyRule,
    message: String,
    directive: Option<Directive>,
}

impl Decision {
    pub(crate) fn new(tag: DecisionTag, rule: PolicyRule, message: impl Into<String>) -> Self {
        Self {
            tag,
            rule,
            message: message.into(),
            directive: None,
        }
    }

    pub(crate) fn with_directive(mut self, directive: Option<Directive>) -> Self {
        self.directive = directive;
        self
    }

    pub fn tag(&self) -> DecisionTag {
        self.tag
    }

    pub fn rule(&self) -> PolicyRule {
        self.rule
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn directive(&self) -> Option<&Directive> {
        self.directive.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_json_shape() {
        let decision = Decision::new(DecisionTag::Hold, PolicyRule::RemovedFiles, "held")
            .with_directive(Some(Directive::AssignReviewer {
                reviewer: AuthorIdentity::new("maintainer"),
            }));
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["tag"], "hold");
        assert_eq!(json["rule"], "removed_files");
        assert_eq!(json["directive"]["type"], "assign_reviewer");
        assert_eq!(json["directive"]["reviewer"], "maintainer");
    }

    #[test]
    fn decision_cannot_be_read_back_from_json() {
        use std::marker::PhantomData;

        struct Check<T>(PhantomData<T>);
        trait Readable {
            fn readable(&self) -> bool {
                true
            }
        }
        impl<T: serde::de::DeserializeOwned> Readable for Check<T> {}
        trait NotReadable {
            fn readable(&self) -> bool {
                false
            }
        }
        impl<T> NotReadable for &Check<T> {}

        assert!(!(&Check::<Decision>(PhantomData)).readable());
        assert!((&Check::<Directive>(PhantomData)).readable());
    }

    #[test]
    fn tag_display_matches_serde() {
        for tag in [
            DecisionTag::Accept,
            DecisionTag::Reject,
            DecisionTag::Hold,
            DecisionTag::RequestInfo,
        ] {
            let json = serde_json::to_value(tag).unwrap();
            assert_eq!(json, tag.to_string());
        }
    }
}
