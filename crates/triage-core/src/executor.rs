//! Action executor: turns a [`Decision`] into calls against the hosting service.
//!
//! Execution is build-then-apply. [`plan_actions`] derives the ordered list of
//! [`Action`]s implied by a decision without touching the network, and
//! [`apply_decision`] runs that plan against a [`ChangeActions`] backend,
//! stopping at the first failure.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{
    ApplyError, AuthorIdentity, Decision, DecisionTag, Directive, PendingChange,
};
use crate::host::ChangeActions;
use crate::obs;

/// A single side effect against the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Comment { body: String },
    Merge,
    Close,
    RequestReviewer { reviewer: AuthorIdentity },
    OpenIssue { title: String, body: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Comment { .. } => "comment",
            Action::Merge => "merge",
            Action::Close => "close",
            Action::RequestReviewer { .. } => "request_reviewer",
            Action::OpenIssue { .. } => "open_issue",
        }
    }
}

/// What was done for one change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub actions: Vec<Action>,
    /// Number of the follow-up issue, when one was opened.
    pub opened_issue: Option<u64>,
}

/// Derive the ordered action plan for a decision.
///
/// Accept merges before commenting, so an unmergeable change is left
/// untouched and without an "accepted" comment. Every other decision
/// comments first: Reject then closes, and Hold / RequestInfo leave the
/// change open. The directive, if any, runs last.
pub fn plan_actions(change: &PendingChange, decision: &Decision) -> Vec<Action> {
    let comment = Action::Comment {
        body: decision.message().to_string(),
    };
    let mut plan = match decision.tag() {
        DecisionTag::Accept => vec![Action::Merge, comment],
        DecisionTag::Reject => vec![comment, Action::Close],
        DecisionTag::Hold | DecisionTag::RequestInfo => vec![comment],
    };

    match decision.directive() {
        Some(Directive::AssignReviewer { reviewer }) => plan.push(Action::RequestReviewer {
            reviewer: reviewer.clone(),
        }),
        Some(Directive::OpenIssue { title, body }) => plan.push(Action::OpenIssue {
            title: format!("{title} ({change})"),
            body: format!("{body}\n\nPending change: {change} \"{}\"", change.title),
        }),
        None => {}
    }

    plan
}

/// Apply a decision to `change`.
///
/// # Errors
///
/// Returns [`ApplyError`] naming the failed action and how many actions had
/// already completed. Earlier side effects are not rolled back.
#[instrument(
    skip(backend, change, decision),
    fields(change = change.number, tag = %decision.tag())
)]
pub async fn apply_decision(
    backend: &dyn ChangeActions,
    change: &PendingChange,
    decision: &Decision,
) -> Result<ApplyReport, ApplyError> {
    let plan = plan_actions(change, decision);
    let planned = plan.len();
    let mut opened_issue = None;

    for (completed, action) in plan.iter().enumerate() {
        let outcome = match action {
            Action::Comment { body } => backend.comment(change, body).await,
            Action::Merge => backend.merge(change).await,
            Action::Close => backend.close(change).await,
            Action::RequestReviewer { reviewer } => {
                backend.request_reviewer(change, reviewer).await
            }
            Action::OpenIssue { title, body } => backend
                .open_issue(title, body)
                .await
                .map(|number| opened_issue = Some(number)),
        };

        if let Err(source) = outcome {
            return Err(ApplyError {
                action: action.name().to_string(),
                completed,
                planned,
                source,
            });
        }
        obs::emit_action_applied(change.number, action.name());
    }

    Ok(ApplyReport {
        actions: plan,
        opened_issue,
    })
}
