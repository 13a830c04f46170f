use axum::body::{Body, to_bytes};
use axum::http::Request;
use tower::ServiceExt;

use super::*;
use crate::services::session::SESSION_COOKIE;
use crate::state::test_helpers::{session_token, test_app_state};
use crate::ui::theme::Theme;

fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri).header(header::HOST, "host");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    builder
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// =============================================================================
// back_path
// =============================================================================

#[test]
fn back_path_keeps_same_origin_referer() {
    let public = Url::parse("https://host").unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, "host".parse().unwrap());
    headers.insert(header::REFERER, "https://host/editor/journal?draft=1".parse().unwrap());
    let uri: Uri = "/theme/toggle".parse().unwrap();
    assert_eq!(back_path(&public, &headers, &uri), "/editor/journal?draft=1");
}

#[test]
fn back_path_rejects_foreign_referer() {
    let public = Url::parse("https://host").unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, "host".parse().unwrap());
    headers.insert(header::REFERER, "https://evil.example/phish".parse().unwrap());
    let uri: Uri = "/theme/toggle".parse().unwrap();
    assert_eq!(back_path(&public, &headers, &uri), "/");
}

#[test]
fn back_path_without_referer_is_root() {
    let public = Url::parse("https://host").unwrap();
    let uri: Uri = "/theme/toggle".parse().unwrap();
    assert_eq!(back_path(&public, &HeaderMap::new(), &uri), "/");
}

// =============================================================================
// routes
// =============================================================================

#[tokio::test]
async fn login_page_carries_callback_and_error() {
    let app = crate::routes::app(test_app_state());
    let resp = app
        .oneshot(
            request("GET", "/login?callbackUrl=https%3A%2F%2Fhost%2Feditor%2Fjournal&error=access_denied", None)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("github?callbackUrl=https%3A%2F%2Fhost%2Feditor%2Fjournal"));
    assert!(html.contains("access_denied"));
}

#[tokio::test]
async fn home_shows_fetch_error_when_github_unreachable() {
    let state = test_app_state();
    let token = session_token(&state);
    let resp = crate::routes::app(state)
        .oneshot(request("GET", "/", Some(&token)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains(REPOS_FETCH_ERROR));
    assert!(html.contains("The Octocat"));
}

#[tokio::test]
async fn editor_page_renders_for_valid_repo() {
    let state = test_app_state();
    let token = session_token(&state);
    let resp = crate::routes::app(state)
        .oneshot(request("GET", "/editor/my-notes", Some(&token)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(r#"data-repo="my-notes""#));
}

#[tokio::test]
async fn editor_page_rejects_invalid_repo_name() {
    let state = test_app_state();
    let token = session_token(&state);
    let resp = crate::routes::app(state)
        .oneshot(request("GET", "/editor/..", Some(&token)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn theme_toggle_flips_state_and_returns_to_referer() {
    let state = test_app_state();
    let token = session_token(&state);
    let app = crate::routes::app(state.clone());
    assert_eq!(state.theme.current(), Theme::Light);

    let resp = app
        .oneshot(
            request("POST", "/theme/toggle", Some(&token))
                .header(header::REFERER, "https://host/editor/journal")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/editor/journal");
    assert_eq!(state.theme.current(), Theme::Dark);
}

#[tokio::test]
async fn create_repo_form_rejects_bad_name() {
    let state = test_app_state();
    let token = session_token(&state);
    let resp = crate::routes::app(state)
        .oneshot(
            request("POST", "/repos", Some(&token))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("name=my+notes"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.contains("Repository names may only use"));
}
