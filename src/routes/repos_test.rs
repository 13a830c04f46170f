use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::Query;
use axum::http::{HeaderMap, Request, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::*;
use crate::services::github::GitHubApi;
use crate::services::session::SESSION_COOKIE;
use crate::state::test_helpers::{session_token, test_app_state, test_identity};

// =============================================================================
// mock GitHub
// =============================================================================

#[derive(Clone, Default)]
struct MockGitHub {
    existing_sha: Option<&'static str>,
    puts: Arc<Mutex<Vec<Value>>>,
    list_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn repo_json(name: &str) -> Value {
    json!({
        "id": 42,
        "name": name,
        "full_name": format!("octocat/{name}"),
        "description": null,
        "html_url": format!("https://github.com/octocat/{name}"),
        "updated_at": "2024-05-01T10:00:00Z",
        "stargazers_count": 3,
        "private": true
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some("Bearer gho_test_token")
}

/// Answers like GitHub without `affiliation`: owned, org and collaborator
/// repositories together.
async fn mock_list(
    State(mock): State<MockGitHub>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Bad credentials"}))).into_response();
    }
    mock.list_queries.lock().unwrap().push(query);
    let mut org_repo = repo_json("notes");
    org_repo["full_name"] = json!("some-org/notes");
    org_repo["html_url"] = json!("https://github.com/some-org/notes");
    Json(json!([repo_json("journal"), org_repo])).into_response()
}

async fn mock_create(Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default();
    if name == "taken" {
        let error = json!({
            "message": "Repository creation failed.",
            "errors": [{"resource": "Repository", "field": "name", "message": "name already exists on this account"}]
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(error)).into_response();
    }
    let mut repo = repo_json(name);
    repo["description"] = body["description"].clone();
    (StatusCode::CREATED, Json(repo)).into_response()
}

async fn mock_contents(State(mock): State<MockGitHub>) -> Response {
    match mock.existing_sha {
        Some(sha) => Json(json!({"sha": sha, "path": "entries/x.md"})).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response(),
    }
}

async fn mock_put(
    State(mock): State<MockGitHub>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    mock.puts.lock().unwrap().push(body);
    Json(json!({
        "content": {
            "path": path,
            "sha": "blob-new",
            "html_url": format!("https://github.com/{owner}/{repo}/blob/main/{path}")
        },
        "commit": {"sha": "c0ffee"}
    }))
}

async fn spawn_github(mock: MockGitHub) -> String {
    let app = Router::new()
        .route("/user/repos", get(mock_list).post(mock_create))
        .route("/repos/{owner}/{repo}/contents/{*path}", get(mock_contents).put(mock_put))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn app_with_github(mock: MockGitHub) -> (Router, AppState) {
    let mut state = test_app_state();
    state.github = GitHubApi::new(reqwest::Client::new(), spawn_github(mock).await);
    (crate::routes::app(state.clone()), state)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(header::HOST, "host");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn today() -> String {
    entry::format_date(time::OffsetDateTime::now_utc().date())
}

// =============================================================================
// status mapping
// =============================================================================

#[test]
fn github_error_to_status_maps_variants() {
    assert_eq!(github_error_to_status(&GitHubError::Unauthorized), StatusCode::UNAUTHORIZED);
    assert_eq!(github_error_to_status(&GitHubError::NotFound("/x".into())), StatusCode::NOT_FOUND);
    assert_eq!(
        github_error_to_status(&GitHubError::Validation("taken".into())),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    let upstream = GitHubError::Status { status: StatusCode::INTERNAL_SERVER_ERROR, body: String::new() };
    assert_eq!(github_error_to_status(&upstream), StatusCode::BAD_GATEWAY);
}

#[test]
fn repo_name_validation() {
    assert_eq!(repo_name(Some("  journal ")), Ok("journal"));
    assert_eq!(repo_name(Some("")), Err(StatusCode::BAD_REQUEST));
    assert_eq!(repo_name(None), Err(StatusCode::BAD_REQUEST));
    assert_eq!(repo_name(Some("my notes")), Err(StatusCode::BAD_REQUEST));
    assert_eq!(repo_name(Some("..")), Err(StatusCode::BAD_REQUEST));
}

// =============================================================================
// list / create
// =============================================================================

#[tokio::test]
async fn list_repos_without_session_redirects_to_login() {
    let (app, _) = app_with_github(MockGitHub::default()).await;
    let resp = app.oneshot(request("GET", "/api/repos", None, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn list_repos_returns_camel_case_json() {
    let (app, state) = app_with_github(MockGitHub::default()).await;
    let token = session_token(&state);
    let resp = app.oneshot(request("GET", "/api/repos", Some(&token), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body[0]["fullName"], "octocat/journal");
    assert_eq!(body[0]["stargazersCount"], 3);
}

#[tokio::test]
async fn list_repos_keeps_only_repos_owned_by_user() {
    let mock = MockGitHub::default();
    let (app, state) = app_with_github(mock.clone()).await;
    let token = session_token(&state);
    let resp = app.oneshot(request("GET", "/api/repos", Some(&token), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|r| r["fullName"].as_str().unwrap()).collect();
    assert_eq!(names, ["octocat/journal"]);
    assert_eq!(mock.list_queries.lock().unwrap()[0].get("affiliation").map(String::as_str), Some("owner"));
}

#[tokio::test]
async fn home_page_links_only_owned_repos_to_editor() {
    let (app, state) = app_with_github(MockGitHub::default()).await;
    let token = session_token(&state);
    let resp = app.oneshot(request("GET", "/", Some(&token), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains(r#"<a href="/editor/journal">Write</a>"#));
    assert!(!html.contains("/editor/notes"));
    assert!(!html.contains("some-org"));
}

#[tokio::test]
async fn list_repos_with_revoked_token_is_unauthorized() {
    let (app, state) = app_with_github(MockGitHub::default()).await;
    let token = state.sessions.as_ref().unwrap().issue(&test_identity(), "gho_revoked").unwrap();
    let resp = app.oneshot(request("GET", "/api/repos", Some(&token), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_repo_returns_created() {
    let (app, state) = app_with_github(MockGitHub::default()).await;
    let token = session_token(&state);
    let resp = app
        .oneshot(request("POST", "/api/repos", Some(&token), Some(json!({"name": "journal"}))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["name"], "journal");
    assert_eq!(body["description"], github::DEFAULT_REPO_DESCRIPTION);
}

#[tokio::test]
async fn create_repo_name_taken_is_unprocessable() {
    let (app, state) = app_with_github(MockGitHub::default()).await;
    let token = session_token(&state);
    let resp = app
        .oneshot(request("POST", "/api/repos", Some(&token), Some(json!({"name": "taken"}))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn create_repo_empty_name_is_bad_request() {
    let (app, state) = app_with_github(MockGitHub::default()).await;
    let token = session_token(&state);
    let resp = app
        .oneshot(request("POST", "/api/repos", Some(&token), Some(json!({"name": "  "}))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// commit_entry
// =============================================================================

fn entry_doc() -> Value {
    json!({
        "time": 1_714_557_600_000_i64,
        "blocks": [{"id": "a", "type": "paragraph", "data": {"text": "Shipped the <b>guard</b>."}}],
        "version": "2.29.1"
    })
}

#[tokio::test]
async fn commit_entry_creates_new_file() {
    let mock = MockGitHub::default();
    let (app, state) = app_with_github(mock.clone()).await;
    let token = session_token(&state);
    let resp = app
        .oneshot(request("POST", "/api/repos/journal/entries", Some(&token), Some(entry_doc())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let date = today();
    let body = json_body(resp).await;
    assert_eq!(body["path"], format!("entries/{date}.md"));
    assert_eq!(body["commitSha"], "c0ffee");
    assert_eq!(body["htmlUrl"], format!("https://github.com/octocat/journal/blob/main/entries/{date}.md"));

    let puts = mock.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0]["message"], format!("Daily entry {date}"));
    assert!(puts[0].get("sha").is_none());
    let content = BASE64.decode(puts[0]["content"].as_str().unwrap()).unwrap();
    assert_eq!(
        String::from_utf8(content).unwrap(),
        format!("# Daily entry {date}\n\nShipped the **guard**.\n")
    );
}

#[tokio::test]
async fn commit_entry_updates_existing_file() {
    let mock = MockGitHub { existing_sha: Some("blob-old"), ..MockGitHub::default() };
    let (app, state) = app_with_github(mock.clone()).await;
    let token = session_token(&state);
    let resp = app
        .oneshot(request("POST", "/api/repos/journal/entries", Some(&token), Some(entry_doc())))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(mock.puts.lock().unwrap()[0]["sha"], "blob-old");
}

#[tokio::test]
async fn commit_entry_empty_document_is_bad_request() {
    let mock = MockGitHub::default();
    let (app, state) = app_with_github(mock.clone()).await;
    let token = session_token(&state);
    let resp = app
        .oneshot(request("POST", "/api/repos/journal/entries", Some(&token), Some(json!({"blocks": []}))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(mock.puts.lock().unwrap().is_empty());
}
