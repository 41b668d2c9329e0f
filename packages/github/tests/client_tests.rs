// ABOUTME: HTTP-level tests for the GitHub client and service against a wiremock server
// ABOUTME: Verifies request shapes, base64 handling, repo name resolution and error mapping

use pretty_assertions::assert_eq;
use sandcraft_github::{
    GitHubClient, GitHubError, GitHubService, InMemoryCredentials, GITHUB_PROVIDER,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn repo_json(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "full_name": format!("octocat/{}", name),
        "private": false,
        "html_url": format!("https://github.com/octocat/{}", name),
        "clone_url": format!("https://github.com/octocat/{}.git", name),
        "description": null,
        "stargazers_count": 3
    })
}

async fn service_for(server: &MockServer) -> GitHubService {
    let credentials = Arc::new(InMemoryCredentials::new());
    credentials.connect("42", GITHUB_PROVIDER, "ghp_test").await;
    GitHubService::new(credentials, server.uri())
}

#[tokio::test]
async fn test_create_repo_sends_bearer_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(body_json(json!({"name": "demo", "private": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(repo_json("demo")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), "ghp_test").unwrap();
    let repo = client.create_repo("demo", true).await.unwrap();

    assert_eq!(repo.full_name, "octocat/demo");
    assert_eq!(repo.html_url, "https://github.com/octocat/demo");
}

#[tokio::test]
async fn test_api_error_carries_upstream_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Repository creation failed.",
            "errors": [{"message": "name already exists on this account"}]
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), "t").unwrap();
    let err = client.create_repo("demo", false).await.unwrap_err();

    assert!(err.is_unprocessable());
    match err {
        GitHubError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Repository creation failed.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_file_content_decodes_base64() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/demo/contents/src/main.rs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "main.rs",
            "path": "src/main.rs",
            "sha": "abc123",
            "size": 13,
            "html_url": "https://github.com/octocat/demo/blob/main/src/main.rs",
            "encoding": "base64",
            "content": "Zm4gbWFpbigp\nIHt9Cg==\n"
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), "t").unwrap();
    let file = client
        .get_file_content("octocat", "demo", "src/main.rs")
        .await
        .unwrap();

    assert_eq!(file.content, "fn main() {}\n");
    assert_eq!(file.sha, "abc123");
}

#[tokio::test]
async fn test_create_file_base64_encodes_content() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/repos/octocat/demo/contents/README.md"))
        .and(body_json(json!({
            "message": "Add README.md",
            "content": "IyBEZW1vCg=="
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "content": {"name": "README.md", "path": "README.md", "sha": "f00"},
            "commit": {"sha": "c0ffee", "html_url": "https://github.com/octocat/demo/commit/c0ffee"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), "t").unwrap();
    let created = client
        .create_file("octocat", "demo", "README.md", "# Demo\n", "Add README.md")
        .await
        .unwrap();

    assert_eq!(created.commit.sha, "c0ffee");
}

#[tokio::test]
async fn test_service_resolves_bare_repo_name_via_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"login": "octocat", "id": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/demo/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 1, "title": "Bug", "state": "open", "html_url": "https://github.com/octocat/demo/issues/1"}
        ])))
        .mount(&server)
        .await;

    let service = service_for(&server).await;
    let issues = service.list_issues("42", "demo").await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "Bug");
}

#[tokio::test]
async fn test_service_uses_explicit_owner_without_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/rust-lang/rust/issues"))
        .and(body_json(json!({"title": "t", "body": "b"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 7, "title": "t", "state": "open",
            "html_url": "https://github.com/rust-lang/rust/issues/7"
        })))
        .mount(&server)
        .await;

    let service = service_for(&server).await;
    let issue = service
        .create_issue("42", "rust-lang/rust", "t", "b")
        .await
        .unwrap();

    assert_eq!(issue.number, 7);
}

#[tokio::test]
async fn test_service_without_connection_is_not_connected() {
    let server = MockServer::start().await;
    let service = service_for(&server).await;

    let err = service.list_repos("someone-else").await.unwrap_err();

    assert_eq!(err.to_string(), "No connection found for github");
}
