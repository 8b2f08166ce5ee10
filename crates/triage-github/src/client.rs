//! HTTP client for the GitHub REST API
//!
//! Wraps `reqwest` with authentication, `Link`-header pagination and
//! backoff on rate-limited or 5xx responses, and implements the triage
//! boundary traits on top of it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use triage_core::{
    AuthorIdentity, ChangeActions, ChangeHost, ChangeSet, CommitHistory, HostResult, PathCommit,
    PendingChange,
};

use crate::api::{
    self, Commit, CreatedIssue, ErrorBody, MergeRequest, NewComment, NewIssue, PullFile,
    PullRequest, ReviewerRequest, StateUpdate,
};
use crate::config::GithubConfig;
use crate::error::{GithubError, Result};

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: &str = "100";
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// GitHub repository client
#[derive(Debug, Clone)]
pub struct GithubClient {
    config: GithubConfig,
    http: reqwest::Client,
}

impl GithubClient {
    /// Create a client for the configured repository.
    pub fn new(config: GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| GithubError::InvalidUrl(format!("user agent: {e}")))?,
        );
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GithubError::Http("token contains invalid characters".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Fetch a single pull request, open or not.
    pub async fn pull_request(&self, number: u64) -> Result<PendingChange> {
        let url = self.config.repo_url(&format!("/pulls/{number}"));
        let pr: PullRequest = self.get_json(&url).await?;
        pr.into_pending()
    }

    /// Open pull requests, oldest first.
    pub async fn open_pull_requests(&self) -> Result<Vec<PendingChange>> {
        let url = self.url_with_query(
            &self.config.repo_url("/pulls"),
            &[
                ("state", "open"),
                ("sort", "created"),
                ("direction", "asc"),
                ("per_page", PAGE_SIZE),
            ],
        )?;
        let pulls: Vec<PullRequest> = self.get_paginated(url).await?;
        pulls.into_iter().map(PullRequest::into_pending).collect()
    }

    /// Files touched by a pull request.
    pub async fn pull_request_files(&self, number: u64) -> Result<ChangeSet> {
        let url = self.url_with_query(
            &self.config.repo_url(&format!("/pulls/{number}/files")),
            &[("per_page", PAGE_SIZE)],
        )?;
        let files: Vec<PullFile> = self.get_paginated(url).await?;
        api::change_set(files)
    }

    /// Commits touching `path` on the base branch, oldest first.
    pub async fn path_history(&self, path: &str) -> Result<Vec<PathCommit>> {
        let mut query = vec![("path", path), ("per_page", PAGE_SIZE)];
        if let Some(branch) = &self.config.base_branch {
            query.push(("sha", branch.as_str()));
        }
        let url = self.url_with_query(&self.config.repo_url("/commits"), &query)?;
        let commits: Vec<Commit> = self.get_paginated(url).await?;
        // GitHub lists newest first
        Ok(commits
            .into_iter()
            .rev()
            .map(Commit::into_path_commit)
            .collect())
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    fn url_with_query(&self, base: &str, query: &[(&str, &str)]) -> Result<String> {
        reqwest::Url::parse_with_params(base, query)
            .map(String::from)
            .map_err(|e| GithubError::InvalidUrl(format!("{base}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(Method::GET, url, None::<&()>).await?;
        Ok(response.json().await?)
    }

    /// Follow `rel="next"` links until the last page.
    async fn get_paginated<T: DeserializeOwned>(&self, first: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0usize;
        while let Some(url) = next.take() {
            let response = self.send(Method::GET, &url, None::<&()>).await?;
            next = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(api::next_link);
            let page: Vec<T> = response.json().await?;
            items.extend(page);
            pages += 1;
        }
        debug!(pages, items = items.len(), "Fetched paginated listing");
        Ok(items)
    }

    /// Send a request, retrying rate-limited responses for any method and 5xx
    /// responses for idempotent methods only.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            let mut request: RequestBuilder = self.http.request(method.clone(), url);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| self.transport_error(e))?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            match retry_delay(&method, &response, attempt) {
                Some(wait) if attempt < self.config.max_retries => {
                    let wait = wait.min(self.config.max_backoff);
                    attempt += 1;
                    warn!(
                        %method,
                        url,
                        status = status.as_u16(),
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Retrying GitHub request"
                    );
                    tokio::time::sleep(wait).await;
                }
                Some(wait) if is_rate_limited(&response) => {
                    return Err(GithubError::RateLimited {
                        retry_after_secs: wait.as_secs(),
                    });
                }
                _ => return Err(api_error(response).await),
            }
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> GithubError {
        if err.is_timeout() {
            GithubError::Timeout {
                timeout_ms: self.config.request_timeout.as_millis() as u64,
            }
        } else {
            GithubError::from(err)
        }
    }
}

fn is_rate_limited(response: &Response) -> bool {
    let status = response.status();
    let headers = response.headers();
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (exhausted || headers.contains_key(reqwest::header::RETRY_AFTER)))
}

/// Whether a 5xx may be retried. A POST can fail at the gateway after
/// GitHub already created the comment or issue.
fn retries_server_errors(method: &Method) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ]
    .contains(method)
}

/// How long to wait before retrying, or `None` if the response is final.
fn retry_delay(method: &Method, response: &Response, attempt: u32) -> Option<Duration> {
    let headers = response.headers();
    let delay = if is_rate_limited(response) {
        let retry_after = headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let reset = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|epoch| Duration::from_secs((epoch - Utc::now().timestamp()).max(0) as u64));
        retry_after
            .or(reset)
            .unwrap_or_else(|| exponential(attempt))
    } else if response.status().is_server_error() && retries_server_errors(method) {
        exponential(attempt)
    } else {
        return None;
    };
    Some(delay)
}

fn exponential(attempt: u32) -> Duration {
    BASE_BACKOFF.saturating_mul(1u32 << attempt.min(6))
}

async fn api_error(response: Response) -> GithubError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);
    GithubError::Api { status, message }
}

// ----------------------------------------------------------------------
// Boundary traits
// ----------------------------------------------------------------------

#[async_trait]
impl ChangeHost for GithubClient {
    #[instrument(skip(self), fields(repo = %self.config.slug()))]
    async fn list_pending(&self) -> HostResult<Vec<PendingChange>> {
        let pulls = self.open_pull_requests().await?;
        info!(count = pulls.len(), "Listed open pull requests");
        Ok(pulls)
    }

    async fn list_changed_files(&self, change: &PendingChange) -> HostResult<ChangeSet> {
        Ok(self.pull_request_files(change.number).await?)
    }
}

#[async_trait]
impl CommitHistory for GithubClient {
    async fn commits_for_path(&self, path: &str) -> HostResult<Vec<PathCommit>> {
        Ok(self.path_history(path).await?)
    }
}

#[async_trait]
impl ChangeActions for GithubClient {
    async fn comment(&self, change: &PendingChange, body: &str) -> HostResult<()> {
        let url = self
            .config
            .repo_url(&format!("/issues/{}/comments", change.number));
        self.send(Method::POST, &url, Some(&NewComment { body }))
            .await?;
        Ok(())
    }

    async fn merge(&self, change: &PendingChange) -> HostResult<()> {
        let url = self
            .config
            .repo_url(&format!("/pulls/{}/merge", change.number));
        let body = MergeRequest {
            merge_method: self.config.merge_method.as_str(),
        };
        self.send(Method::PUT, &url, Some(&body)).await?;
        Ok(())
    }

    async fn close(&self, change: &PendingChange) -> HostResult<()> {
        let url = self.config.repo_url(&format!("/pulls/{}", change.number));
        self.send(Method::PATCH, &url, Some(&StateUpdate { state: "closed" }))
            .await?;
        Ok(())
    }

    async fn request_reviewer(
        &self,
        change: &PendingChange,
        reviewer: &AuthorIdentity,
    ) -> HostResult<()> {
        let url = self
            .config
            .repo_url(&format!("/pulls/{}/requested_reviewers", change.number));
        let body = ReviewerRequest {
            reviewers: vec![reviewer.as_str()],
        };
        self.send(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    async fn open_issue(&self, title: &str, body: &str) -> HostResult<u64> {
        let url = self.config.repo_url("/issues");
        let response = self
            .send(Method::POST, &url, Some(&NewIssue { title, body }))
            .await?;
        let created: CreatedIssue = response.json().await.map_err(GithubError::from)?;
        Ok(created.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_and_saturates() {
        assert_eq!(exponential(0), Duration::from_millis(500));
        assert_eq!(exponential(1), Duration::from_millis(1000));
        assert_eq!(exponential(3), Duration::from_millis(4000));
        assert_eq!(exponential(40), exponential(6));
    }

    #[test]
    fn only_idempotent_methods_retry_server_errors() {
        assert!(retries_server_errors(&Method::GET));
        assert!(retries_server_errors(&Method::PUT));
        assert!(retries_server_errors(&Method::PATCH));
        assert!(!retries_server_errors(&Method::POST));
    }

    #[test]
    fn client_builds_with_token() {
        let config = GithubConfig::new("octo/poems")
            .unwrap()
            .with_token("ghp_secret");
        let client = GithubClient::new(config).unwrap();
        assert_eq!(client.config().slug(), "octo/poems");
    }

    #[test]
    fn query_parameters_are_encoded() {
        let client = GithubClient::new(GithubConfig::new("octo/poems").unwrap()).unwrap();
        let url = client
            .url_with_query(
                "https://api.github.com/repos/octo/poems/commits",
                &[("path", "poems/a b.md")],
            )
            .unwrap();
        assert_eq!(
            url,
            "https://api.github.com/repos/octo/poems/commits?path=poems%2Fa+b.md"
        );
    }
}
