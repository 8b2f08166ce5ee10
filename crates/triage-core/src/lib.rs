//! PR Triage Core Library
//!
//! The triage decision engine: classifies the files a pull request touches,
//! resolves the original author of an edited file, and maps both to a single
//! [`Decision`]. The hosting service is reached only through the traits in
//! [`host`] and [`resolver`], so everything here runs against in-memory
//! [`fakes`] in tests.

pub mod classify;
pub mod cycle;
pub mod domain;
pub mod executor;
pub mod fakes;
pub mod host;
pub mod obs;
pub mod policy;
pub mod resolver;
pub mod telemetry;

pub use classify::{classify, Classification};
pub use cycle::{
    run_cycle, triage_change, ChangeReport, ChangeSelection, CycleOptions, CycleReport,
};
pub use domain::{
    ApplyError, AuthorIdentity, AuthorResolution, ChangeSet, ChangeSetError, ChangeStatus,
    Decision, DecisionTag, Directive, FileChange, HostError, HostResult, PathCommit,
    PendingChange, PolicyRule, TriageError,
};
pub use executor::{apply_decision, plan_actions, Action, ApplyReport};
pub use host::{ChangeActions, ChangeHost};
pub use obs::{
    change_span, emit_action_applied, emit_change_evaluated, emit_change_failed,
    emit_cycle_finished, emit_resolution_failed,
};
pub use policy::{evaluate, select_rule, PolicyConfig};
pub use resolver::{
    earliest_author, CommitHistory, HistoryResolver, ResolveAuthor, DEFAULT_RESOLUTION_TIMEOUT,
};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
