//! GitHub transport for pull request triage
//!
//! Implements the `ChangeHost`, `ChangeActions` and `CommitHistory`
//! boundaries from `triage-core` over the GitHub REST API.

pub mod api;
pub mod client;
pub mod config;
pub mod error;

pub use client::GithubClient;
pub use config::{GithubConfig, MergeMethod, DEFAULT_API_URL};
pub use error::{GithubError, Result};
