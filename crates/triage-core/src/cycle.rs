//! One triage pass over the open pending changes.
//!
//! A cycle lists the open changes, keeps the ones selected for triage, runs
//! classify → evaluate for each of them concurrently (bounded by
//! `max_concurrent`), and applies the resulting decisions unless running dry.
//! Changes are independent: a transport failure on one is recorded in its
//! [`ChangeReport`] and the others carry on.
//!
//! The cycle knows nothing about scheduling; callers decide when to run the
//! next one.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize, Serializer};
use tracing::Instrument;

use crate::classify::classify;
use crate::domain::{Decision, DecisionTag, HostResult, PendingChange, TriageError};
use crate::executor::{apply_decision, ApplyReport};
use crate::host::{ChangeActions, ChangeHost};
use crate::obs;
use crate::policy::{evaluate, PolicyConfig};
use crate::resolver::ResolveAuthor;

/// Which open changes a cycle triages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSelection {
    /// Only changes untouched since they were opened.
    #[default]
    NewlyOpened,
    /// Every open change.
    AllOpen,
}

impl ChangeSelection {
    pub fn includes(&self, change: &PendingChange) -> bool {
        match self {
            ChangeSelection::NewlyOpened => change.is_newly_opened(),
            ChangeSelection::AllOpen => true,
        }
    }
}

/// Knobs for a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOptions {
    pub selection: ChangeSelection,
    /// Maximum number of changes evaluated at once.
    pub max_concurrent: usize,
    /// Decide without applying anything.
    pub dry_run: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            selection: ChangeSelection::default(),
            max_concurrent: 4,
            dry_run: false,
        }
    }
}

/// Outcome for one pending change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub number: u64,
    pub title: String,
    pub decision: Option<Decision>,
    pub applied: Option<ApplyReport>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<TriageError>,
}

fn serialize_error<S: Serializer>(err: &Option<TriageError>, s: S) -> Result<S::Ok, S::Error> {
    match err {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

/// Summary of a whole cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Open changes seen.
    pub examined: usize,
    /// Open changes left out by the selection.
    pub skipped: usize,
    /// Per-change outcomes, ordered by change number.
    pub changes: Vec<ChangeReport>,
}

impl CycleReport {
    /// Number of changes that received a decision with `tag`.
    pub fn count(&self, tag: DecisionTag) -> usize {
        self.changes
            .iter()
            .filter(|c| c.decision.as_ref().map(Decision::tag) == Some(tag))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChangeReport> {
        self.changes.iter().filter(|c| c.error.is_some())
    }
}

/// Decide a single change: list its files, classify them, evaluate the policy.
///
/// Only boundary faults (listing files, looking up the submitter) are errors;
/// every policy outcome is a [`Decision`].
pub async fn triage_change(
    host: &dyn ChangeHost,
    resolver: &dyn ResolveAuthor,
    policy: &PolicyConfig,
    change: &PendingChange,
) -> Result<Decision, TriageError> {
    let changes = host
        .list_changed_files(change)
        .await
        .map_err(TriageError::ListFiles)?;
    let submitter = host
        .submitter_identity(change)
        .await
        .map_err(TriageError::Submitter)?;

    let classification = classify(&changes);
    let decision = evaluate(&classification, &submitter, resolver, policy).await;
    obs::emit_change_evaluated(change.number, &decision, changes.len());
    Ok(decision)
}

/// Run one triage pass.
///
/// # Errors
///
/// Fails only when the list of open changes cannot be fetched.
pub async fn run_cycle(
    host: &dyn ChangeHost,
    actions: &dyn ChangeActions,
    resolver: &dyn ResolveAuthor,
    policy: &PolicyConfig,
    options: &CycleOptions,
) -> HostResult<CycleReport> {
    let open = host.list_pending().await?;
    let examined = open.len();
    let selected: Vec<PendingChange> = open
        .into_iter()
        .filter(|c| options.selection.includes(c))
        .collect();
    let skipped = examined - selected.len();

    let mut changes: Vec<ChangeReport> = stream::iter(selected)
        .map(|change| {
            let span = obs::change_span(change.number);
            async move { process_change(host, actions, resolver, policy, options, change).await }
                .instrument(span)
        })
        .buffer_unordered(options.max_concurrent.max(1))
        .collect()
        .await;
    changes.sort_by_key(|c| c.number);

    let report = CycleReport {
        examined,
        skipped,
        changes,
    };
    obs::emit_cycle_finished(&report);
    Ok(report)
}

async fn process_change(
    host: &dyn ChangeHost,
    actions: &dyn ChangeActions,
    resolver: &dyn ResolveAuthor,
    policy: &PolicyConfig,
    options: &CycleOptions,
    change: PendingChange,
) -> ChangeReport {
    let mut report = ChangeReport {
        number: change.number,
        title: change.title.clone(),
        decision: None,
        applied: None,
        error: None,
    };

    let decision = match triage_change(host, resolver, policy, &change).await {
        Ok(decision) => decision,
        Err(err) => {
            obs::emit_change_failed(change.number, &err);
            report.error = Some(err);
            return report;
        }
    };

    if !options.dry_run {
        match apply_decision(actions, &change, &decision).await {
            Ok(applied) => report.applied = Some(applied),
            Err(err) => {
                let err = TriageError::from(err);
                obs::emit_change_failed(change.number, &err);
                report.error = Some(err);
            }
        }
    }

    report.decision = Some(decision);
    report
}
