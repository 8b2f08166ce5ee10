//! GitHub transport against a mock REST server.

use std::time::Duration;

use serde_json::json;
use triage_core::{
    AuthorIdentity, ChangeActions, ChangeHost, ChangeStatus, CommitHistory, HostError,
    PendingChange,
};
use triage_github::{GithubClient, GithubConfig, GithubError, MergeMethod};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "/repos/octo/poems";

fn client(server: &MockServer) -> GithubClient {
    let config = GithubConfig::new("octo/poems")
        .unwrap()
        .with_api_base_url(server.uri())
        .with_token("test-token")
        .with_max_retries(2)
        .with_max_backoff(Duration::from_millis(5));
    GithubClient::new(config).unwrap()
}

fn pull(number: u64, login: &str) -> serde_json::Value {
    json!({
        "number": number,
        "title": format!("Poem {number}"),
        "user": { "login": login },
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

fn change(number: u64) -> PendingChange {
    let at = chrono::DateTime::from_timestamp(1_704_067_200, 0).unwrap();
    PendingChange {
        number,
        title: "Poem".into(),
        submitter: AuthorIdentity::new("bob"),
        created_at: at,
        updated_at: at,
    }
}

#[tokio::test]
async fn lists_open_pull_requests_across_pages() {
    let server = MockServer::start().await;
    let next = format!("<{}{REPO}/pulls?state=open&page=2>; rel=\"next\"", server.uri());

    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls")))
        .and(query_param("state", "open"))
        .and(query_param_is_missing("page"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([pull(1, "alice")]))
                .insert_header("link", next.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pull(2, "bob")])))
        .expect(1)
        .mount(&server)
        .await;

    let pending = client(&server).list_pending().await.unwrap();
    let numbers: Vec<u64> = pending.iter().map(|p| p.number).collect();
    assert_eq!(numbers, [1, 2]);
    assert_eq!(pending[1].submitter, AuthorIdentity::new("bob"));
    assert!(pending[0].is_newly_opened());
}

#[tokio::test]
async fn changed_files_map_renames_to_removal_and_addition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/7/files")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "filename": "poems/new.md", "status": "renamed", "previous_filename": "poems/old.md" },
            { "filename": "poems/rain.md", "status": "modified" }
        ])))
        .mount(&server)
        .await;

    let set = client(&server).list_changed_files(&change(7)).await.unwrap();
    let statuses: Vec<(&str, ChangeStatus)> = set
        .files()
        .iter()
        .map(|f| (f.path.as_str(), f.status))
        .collect();
    assert_eq!(
        statuses,
        [
            ("poems/old.md", ChangeStatus::Removed),
            ("poems/new.md", ChangeStatus::Added),
            ("poems/rain.md", ChangeStatus::Modified),
        ]
    );
}

#[tokio::test]
async fn history_is_returned_oldest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/commits")))
        .and(query_param("path", "poems/rain.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "sha": "c3",
                "author": { "login": "carol" },
                "commit": { "author": { "name": "Carol", "date": "2024-03-01T00:00:00Z" } }
            },
            {
                "sha": "c1",
                "author": { "login": "alice" },
                "commit": { "author": { "name": "Alice", "date": "2024-01-01T00:00:00Z" } }
            }
        ])))
        .mount(&server)
        .await;

    let commits = client(&server)
        .commits_for_path("poems/rain.md")
        .await
        .unwrap();
    assert_eq!(commits[0].sha, "c1");
    assert_eq!(commits[0].author, Some(AuthorIdentity::new("alice")));
    assert_eq!(commits[1].sha, "c3");
}

#[tokio::test]
async fn history_query_uses_configured_base_branch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/commits")))
        .and(query_param("sha", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = GithubConfig::new("octo/poems")
        .unwrap()
        .with_api_base_url(server.uri())
        .with_base_branch("main");
    let commits = GithubClient::new(config)
        .unwrap()
        .commits_for_path("x.md")
        .await
        .unwrap();
    assert!(commits.is_empty());
}

#[tokio::test]
async fn actions_hit_the_expected_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues/3/comments")))
        .and(body_json(json!({ "body": "hello" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{REPO}/pulls/3/merge")))
        .and(body_json(json!({ "merge_method": "squash" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "merged": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{REPO}/pulls/3")))
        .and(body_json(json!({ "state": "closed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "number": 3 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/pulls/3/requested_reviewers")))
        .and(body_json(json!({ "reviewers": ["maintainer"] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 3 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues")))
        .and(body_json(json!({ "title": "Follow up", "body": "details" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let config = GithubConfig::new("octo/poems")
        .unwrap()
        .with_api_base_url(server.uri())
        .with_merge_method(MergeMethod::Squash);
    let github = GithubClient::new(config).unwrap();
    let pr = change(3);

    github.comment(&pr, "hello").await.unwrap();
    github.merge(&pr).await.unwrap();
    github.close(&pr).await.unwrap();
    github
        .request_reviewer(&pr, &AuthorIdentity::new("maintainer"))
        .await
        .unwrap();
    assert_eq!(github.open_issue("Follow up", "details").await.unwrap(), 42);
}

#[tokio::test]
async fn unmergeable_pull_request_surfaces_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{REPO}/pulls/3/merge")))
        .respond_with(
            ResponseTemplate::new(405)
                .set_body_json(json!({ "message": "Pull Request is not mergeable" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).merge(&change(3)).await.unwrap_err();
    assert_eq!(
        err,
        HostError::Api {
            status: 405,
            message: "Pull Request is not mergeable".into()
        }
    );
}

#[tokio::test]
async fn missing_pull_request_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/99/files")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let err = client(&server)
        .list_changed_files(&change(99))
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::NotFound(_)));
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/5")))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/5")))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull(5, "alice")))
        .expect(1)
        .mount(&server)
        .await;

    let pr = client(&server).pull_request(5).await.unwrap();
    assert_eq!(pr.number, 5);
}

#[tokio::test]
async fn exhausted_rate_limit_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/5")))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("retry-after", "30"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).pull_request(5).await.unwrap_err();
    assert!(matches!(
        err,
        GithubError::RateLimited {
            retry_after_secs: 30
        }
    ));
}

#[tokio::test]
async fn plain_forbidden_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues/3/comments")))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "Resource not accessible by integration" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).comment(&change(3), "hi").await.unwrap_err();
    assert!(matches!(err, HostError::Api { status: 403, .. }));
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/pulls/8/files")))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .list_changed_files(&change(8))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HostError::Api {
            status: 502,
            message: "bad gateway".into()
        }
    );
}

#[tokio::test]
async fn gateway_error_on_issue_creation_is_not_resent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues")))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 7 })))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .open_issue("Follow up", "details")
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Api { status: 502, .. }));

    let posts = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .count();
    assert_eq!(posts, 1);
}

#[tokio::test]
async fn gateway_error_on_comment_is_not_resent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues/3/comments")))
        .respond_with(ResponseTemplate::new(504))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).comment(&change(3), "hi").await.unwrap_err();
    assert!(matches!(err, HostError::Api { status: 504, .. }));
}

#[tokio::test]
async fn rate_limited_comment_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues/3/comments")))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/issues/3/comments")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).comment(&change(3), "hi").await.unwrap();
}
