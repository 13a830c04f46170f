//! HTML page routes and the theme toggle.

use axum::Form;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use reqwest::Url;
use serde::Deserialize;

use super::auth::{AuthSession, signin_href};
use super::guard::request_url;
use super::repos::{CreateRepoBody, github_error_to_status, repo_name};
use crate::state::AppState;
use crate::ui::pages;

pub(crate) const REPOS_FETCH_ERROR: &str = "Failed to fetch repositories. Please check your GitHub token.";

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
    error: Option<String>,
}

fn page(rendered: Result<String, minijinja::Error>) -> Result<Html<String>, StatusCode> {
    rendered.map(Html).map_err(|e| {
        tracing::error!(error = %e, "page render failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn page_with_status(status: StatusCode, rendered: Result<String, minijinja::Error>) -> Response {
    match page(rendered) {
        Ok(html) => (status, html).into_response(),
        Err(status) => status.into_response(),
    }
}

/// `GET /login`
pub async fn login(State(state): State<AppState>, Query(params): Query<LoginQuery>) -> Result<Html<String>, StatusCode> {
    let provider_id = state.provider.as_ref().map_or("github", |p| p.id());
    let href = signin_href(&state.config.public_url, provider_id, params.callback_url.as_deref());
    page(pages::login_page(state.theme.current(), &href, params.error.as_deref()))
}

/// `GET /`: repository list. A GitHub failure renders the error in place of
/// the list rather than failing the page.
pub async fn home(State(state): State<AppState>, AuthSession(session): AuthSession) -> Result<Html<String>, StatusCode> {
    let repos = state.github.list_repos(&session.access_token, &session.identity.login).await;
    let listing = match &repos {
        Ok(repos) => Ok(repos.as_slice()),
        Err(e) => {
            tracing::warn!(login = %session.identity.login, error = %e, "repository listing failed");
            Err(REPOS_FETCH_ERROR)
        }
    };
    page(pages::home_page(state.theme.current(), &session.identity, listing))
}

/// `GET /editor/{repo}`
pub async fn editor(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(repo): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let repo = repo_name(Some(repo.as_str()))?;
    page(pages::editor_page(state.theme.current(), &session.identity, repo))
}

/// `POST /repos`: form variant of repository creation.
pub async fn create_repo_form(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Form(body): Form<CreateRepoBody>,
) -> Response {
    let theme = state.theme.current();
    let Ok(name) = repo_name(body.name.as_deref()) else {
        let rendered = pages::home_page(theme, &session.identity, Err("Repository names may only use letters, digits, '.', '-' and '_'."));
        return page_with_status(StatusCode::BAD_REQUEST, rendered);
    };
    let description = body.description.as_deref().map(str::trim).filter(|d| !d.is_empty());

    match state.github.create_repo(&session.access_token, name, description).await {
        Ok(repo) => {
            tracing::info!(login = %session.identity.login, repo = %repo.full_name, "repository created");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            tracing::warn!(login = %session.identity.login, error = %e, "repository creation failed");
            let message = format!("Failed to create repository: {e}");
            let rendered = pages::home_page(theme, &session.identity, Err(message.as_str()));
            page_with_status(github_error_to_status(&e), rendered)
        }
    }
}

/// Path and query of a same-origin `Referer`, else `/`.
pub(crate) fn back_path(public_url: &Url, headers: &HeaderMap, uri: &Uri) -> String {
    let origin = request_url(public_url, headers, uri).origin();
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| Url::parse(referer).ok())
        .filter(|referer| referer.origin() == origin)
        .map_or_else(
            || "/".to_owned(),
            |referer| match referer.query() {
                Some(query) => format!("{}?{query}", referer.path()),
                None => referer.path().to_owned(),
            },
        )
}

/// `POST /theme/toggle`
pub async fn toggle_theme(State(state): State<AppState>, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> Redirect {
    state.theme.toggle();
    Redirect::to(&back_path(&state.config.public_url, &headers, &uri))
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
