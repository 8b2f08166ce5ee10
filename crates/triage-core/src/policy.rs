//! Triage policy engine.
//!
//! Maps a [`Classification`] to a single [`Decision`] through an ordered
//! decision table; the first matching row wins:
//!
//! | Row | Condition                      | Decision                        |
//! |-----|--------------------------------|---------------------------------|
//! | 1   | any removed file               | Hold, surfaced to a reviewer    |
//! | 2   | more than one added file       | Reject                          |
//! | 3   | more than one modified file    | Reject                          |
//! | 4   | exactly one added, no modified | Accept                          |
//! | 5   | exactly one modified, no added | depends on the original author  |
//! | 6   | anything else                  | Hold                            |
//!
//! Removal is checked before the multiplicity rows, and the multiplicity rows
//! before the authorship row. Only row 5 consults the resolver.

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::domain::{
    AuthorIdentity, AuthorResolution, Decision, DecisionTag, Directive, FileChange, PolicyRule,
};
use crate::resolver::ResolveAuthor;

/// Identities and switches the policy needs to build decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Reviewer mentioned and assigned when a change deletes files.
    pub reviewer: Option<AuthorIdentity>,
    /// Open a follow-up issue when a change has no actionable files.
    pub follow_up_issues: bool,
}

impl PolicyConfig {
    pub fn with_reviewer(mut self, reviewer: impl Into<AuthorIdentity>) -> Self {
        self.reviewer = Some(reviewer.into());
        self
    }

    pub fn with_follow_up_issues(mut self, enabled: bool) -> Self {
        self.follow_up_issues = enabled;
        self
    }
}

/// Select the decision-table row for a classification.
pub fn select_rule(classification: &Classification<'_>) -> PolicyRule {
    let added = classification.added.len();
    let modified = classification.modified.len();
    let removed = classification.removed.len();

    if removed > 0 {
        PolicyRule::RemovedFiles
    } else if added > 1 {
        PolicyRule::MultipleAdded
    } else if modified > 1 {
        PolicyRule::MultipleModified
    } else if added == 1 && modified == 0 {
        PolicyRule::SingleAdded
    } else if modified == 1 && added == 0 {
        PolicyRule::SingleModified
    } else {
        PolicyRule::NoActionableChanges
    }
}

/// Evaluate the policy for one pending change.
///
/// Never fails: every outcome, including an unreadable history, is expressed
/// as a [`Decision`].
pub async fn evaluate(
    classification: &Classification<'_>,
    submitter: &AuthorIdentity,
    resolver: &dyn ResolveAuthor,
    config: &PolicyConfig,
) -> Decision {
    match select_rule(classification) {
        PolicyRule::RemovedFiles => hold_for_removal(classification, config),
        PolicyRule::MultipleAdded => Decision::new(
            DecisionTag::Reject,
            PolicyRule::MultipleAdded,
            format!(
                "Pull request adds {} files. Submissions that create files must add exactly one file per pull request; please split this change.",
                classification.added.len()
            ),
        ),
        PolicyRule::MultipleModified => Decision::new(
            DecisionTag::Reject,
            PolicyRule::MultipleModified,
            format!(
                "Pull request edits {} files. Submissions that edit files must touch exactly one file per pull request; please split this change.",
                classification.modified.len()
            ),
        ),
        PolicyRule::SingleAdded => Decision::new(
            DecisionTag::Accept,
            PolicyRule::SingleAdded,
            "New file added. Pull request accepted.",
        ),
        PolicyRule::SingleModified => {
            let file = classification.modified[0];
            let resolution = resolver.resolve(&file.path).await;
            decide_authorship(file, submitter, &resolution)
        }
        PolicyRule::NoActionableChanges => hold_no_actionable(classification, config),
    }
}

fn hold_for_removal(classification: &Classification<'_>, config: &PolicyConfig) -> Decision {
    let removed = join_paths(&classification.removed);
    let message = match &config.reviewer {
        Some(reviewer) => format!(
            "File deleted. Pull request put on hold. @{reviewer} please review.\n\nRemoved: {removed}"
        ),
        None => format!(
            "File deleted. Pull request put on hold for manual review.\n\nRemoved: {removed}"
        ),
    };
    let directive = config
        .reviewer
        .clone()
        .map(|reviewer| Directive::AssignReviewer { reviewer });
    Decision::new(DecisionTag::Hold, PolicyRule::RemovedFiles, message).with_directive(directive)
}

fn hold_no_actionable(classification: &Classification<'_>, config: &PolicyConfig) -> Decision {
    let directive = config.follow_up_issues.then(|| Directive::OpenIssue {
        title: "Pull request needs manual triage".to_string(),
        body: format!(
            "A pull request touched {} file(s) in a combination the triage policy does not handle automatically. Please review it manually.",
            classification.len()
        ),
    });
    Decision::new(
        DecisionTag::Hold,
        PolicyRule::NoActionableChanges,
        "No actionable file changes detected. Pull request held for manual review.",
    )
    .with_directive(directive)
}

fn decide_authorship(
    file: &FileChange,
    submitter: &AuthorIdentity,
    resolution: &AuthorResolution,
) -> Decision {
    let rule = PolicyRule::SingleModified;
    match resolution {
        AuthorResolution::Known { author } if author == submitter => Decision::new(
            DecisionTag::Accept,
            rule,
            "File edited by original author. Pull request accepted.",
        ),
        AuthorResolution::Known { author } => Decision::new(
            DecisionTag::RequestInfo,
            rule,
            format!(
                "File edited by different user. More info needed. `{}` was originally authored by @{author}, but this pull request was opened by @{submitter}.",
                file.path
            ),
        ),
        AuthorResolution::Unknown => Decision::new(
            DecisionTag::RequestInfo,
            rule,
            format!(
                "Could not verify the original author of `{}`: no commit history was found. More info needed.",
                file.path
            ),
        ),
        AuthorResolution::Failed { .. } => Decision::new(
            DecisionTag::RequestInfo,
            rule,
            format!(
                "Could not verify the original author of `{}`: the history lookup did not complete. More info needed.",
                file.path
            ),
        ),
    }
}

fn join_paths(files: &[&FileChange]) -> String {
    files
        .iter()
        .map(|f| format!("`{}`", f.path))
        .collect::<Vec<_>>()
        .join(", ")
}
