//! Connection settings for the GitHub transport

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{GithubError, Result};

/// Public GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// How accepted pull requests are merged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMethod {
    #[default]
    Merge,
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMethod {
    type Err = GithubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeMethod::Merge),
            "squash" => Ok(MergeMethod::Squash),
            "rebase" => Ok(MergeMethod::Rebase),
            _ => Err(GithubError::InvalidMergeMethod(s.to_string())),
        }
    }
}

/// Configuration for [`GithubClient`](crate::GithubClient)
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// REST API root, without trailing slash
    pub api_base_url: String,
    pub owner: String,
    pub repo: String,
    /// Bearer token; anonymous requests when `None`
    pub token: Option<String>,
    /// Branch whose history is searched for original authors.
    /// The repository default branch when `None`.
    pub base_branch: Option<String>,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Retries after a rate-limited or 5xx response
    pub max_retries: u32,
    /// Upper bound on a single wait between retries
    pub max_backoff: Duration,
    pub merge_method: MergeMethod,
}

impl GithubConfig {
    /// Settings for the repository named by an `owner/name` slug.
    pub fn new(slug: &str) -> Result<Self> {
        let (owner, repo) = parse_slug(slug)?;
        Ok(Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            owner,
            repo,
            token: None,
            base_branch: None,
            user_agent: format!("pr-triage/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_backoff: Duration::from_secs(60),
            merge_method: MergeMethod::default(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = Some(branch.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn with_merge_method(mut self, method: MergeMethod) -> Self {
        self.merge_method = method;
        self
    }

    /// `owner/name`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// `{api}/repos/{owner}/{repo}{path}`
    pub(crate) fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base_url, self.owner, self.repo, path
        )
    }
}

fn parse_slug(slug: &str) -> Result<(String, String)> {
    let mut parts = slug.trim().split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GithubError::InvalidRepository(slug.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_split_into_owner_and_repo() {
        let config = GithubConfig::new("octo/poems").unwrap();
        assert_eq!(config.owner, "octo");
        assert_eq!(config.repo, "poems");
        assert_eq!(config.slug(), "octo/poems");
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn malformed_slugs_are_rejected() {
        for slug in ["", "octo", "octo/", "/poems", "a/b/c"] {
            assert!(
                matches!(
                    GithubConfig::new(slug),
                    Err(GithubError::InvalidRepository(_))
                ),
                "{slug:?} should be rejected"
            );
        }
    }

    #[test]
    fn repo_url_joins_without_double_slash() {
        let config = GithubConfig::new("octo/poems")
            .unwrap()
            .with_api_base_url("http://localhost:9000/");
        assert_eq!(
            config.repo_url("/pulls"),
            "http://localhost:9000/repos/octo/poems/pulls"
        );
    }

    #[test]
    fn merge_method_parses_case_insensitively() {
        assert_eq!("Squash".parse::<MergeMethod>().unwrap(), MergeMethod::Squash);
        assert_eq!("rebase".parse::<MergeMethod>().unwrap(), MergeMethod::Rebase);
        assert!("fast-forward".parse::<MergeMethod>().is_err());
    }
}
