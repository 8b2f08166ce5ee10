//! Structured observability hooks for triage lifecycle events.
//!
//! This module provides:
//! - Change-scoped tracing spans via [`change_span`]
//! - Emission functions for key lifecycle events: evaluation, author lookup
//!   failure, applied action, per-change failure, cycle completion
//!
//! Events are emitted at `info!` level unless noted. For JSON output, pass
//! `json = true` to [`crate::init_tracing`].

use tracing::{info, warn};

use crate::cycle::CycleReport;
use crate::domain::{Decision, DecisionTag, HostError, TriageError};

/// Span tagging all work done for one pending change.
///
/// Attach it to the change's future with `tracing::Instrument` rather than
/// entering it, since evaluation awaits across the network.
pub fn change_span(number: u64) -> tracing::Span {
    tracing::info_span!("triage.change", change = number)
}

/// Emit event: a change was evaluated to a decision.
pub fn emit_change_evaluated(number: u64, decision: &Decision, files: usize) {
    info!(
        event = "change.evaluated",
        change = number,
        tag = %decision.tag(),
        rule = %decision.rule(),
        files = files,
    );
}

/// Emit event: the history lookup for a path failed (warning level).
pub fn emit_resolution_failed(path: &str, error: &HostError) {
    warn!(event = "author.resolution_failed", path = %path, error = %error);
}

/// Emit event: one action of a decision's plan succeeded.
pub fn emit_action_applied(number: u64, action: &str) {
    info!(event = "action.applied", change = number, action = %action);
}

/// Emit event: a change could not be triaged or its decision not applied
/// (warning level).
pub fn emit_change_failed(number: u64, error: &TriageError) {
    warn!(event = "change.failed", change = number, error = %error);
}

/// Emit event: a cycle finished, with per-tag totals.
pub fn emit_cycle_finished(report: &CycleReport) {
    info!(
        event = "cycle.finished",
        examined = report.examined,
        skipped = report.skipped,
        accepted = report.count(DecisionTag::Accept),
        rejected = report.count(DecisionTag::Reject),
        held = report.count(DecisionTag::Hold),
        info_requested = report.count(DecisionTag::RequestInfo),
        failed = report.failures().count(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_span_create() {
        let _span = change_span(12).entered();
    }
}
