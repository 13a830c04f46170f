//! Repository routes: list, create, and commit a daily entry.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use super::auth::AuthSession;
use crate::services::entry::{self, EditorDocument};
use crate::services::github::{self, CommittedFile, FileWrite, GitHubError, Repository};
use crate::state::AppState;

pub(crate) fn github_error_to_status(err: &GitHubError) -> StatusCode {
    match err {
        GitHubError::Unauthorized => StatusCode::UNAUTHORIZED,
        GitHubError::NotFound(_) => StatusCode::NOT_FOUND,
        GitHubError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GitHubError::Status { .. } | GitHubError::Http(_) => StatusCode::BAD_GATEWAY,
    }
}

fn log_github_error(err: GitHubError, login: &str) -> StatusCode {
    let status = github_error_to_status(&err);
    tracing::warn!(%login, error = %err, %status, "github request failed");
    status
}

/// `GET /api/repos`: repositories owned by the signed-in user.
pub async fn list_repos(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<Repository>>, StatusCode> {
    let repos = state
        .github
        .list_repos(&session.access_token, &session.identity.login)
        .await
        .map_err(|e| log_github_error(e, &session.identity.login))?;
    Ok(Json(repos))
}

#[derive(Debug, Deserialize)]
pub struct CreateRepoBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Validated repository name from user input.
pub(crate) fn repo_name(raw: Option<&str>) -> Result<&str, StatusCode> {
    let name = raw.map(str::trim).unwrap_or_default();
    if github::is_valid_repo_name(name) {
        Ok(name)
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}

/// `POST /api/repos`: create a private repository.
pub async fn create_repo(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<CreateRepoBody>,
) -> Result<(StatusCode, Json<Repository>), StatusCode> {
    let name = repo_name(body.name.as_deref())?;
    let description = body.description.as_deref().map(str::trim).filter(|d| !d.is_empty());

    let repo = state
        .github
        .create_repo(&session.access_token, name, description)
        .await
        .map_err(|e| log_github_error(e, &session.identity.login))?;
    tracing::info!(login = %session.identity.login, repo = %repo.full_name, "repository created");
    Ok((StatusCode::CREATED, Json(repo)))
}

/// `POST /api/repos/{name}/entries`: commit today's entry, replacing any
/// earlier save from the same day.
pub async fn commit_entry(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(repo): Path<String>,
    Json(doc): Json<EditorDocument>,
) -> Result<Json<CommittedFile>, StatusCode> {
    let repo = repo_name(Some(repo.as_str()))?;
    let date = entry::format_date(time::OffsetDateTime::now_utc().date());
    let content = entry::render_entry(&date, &doc).map_err(|_| StatusCode::BAD_REQUEST)?;

    let token = session.access_token.as_str();
    let owner = session.identity.login.as_str();
    let path = entry::entry_path(&date);
    let message = entry::commit_message(&date);

    let sha = state
        .github
        .file_sha(token, owner, repo, &path)
        .await
        .map_err(|e| log_github_error(e, owner))?;

    let target = FileWrite {
        owner,
        repo,
        path: &path,
        content: &content,
        message: &message,
        sha: sha.as_deref(),
    };
    let committed = state
        .github
        .put_file(token, &target)
        .await
        .map_err(|e| log_github_error(e, owner))?;
    tracing::info!(%owner, %repo, path = %committed.path, updated = sha.is_some(), "entry committed");
    Ok(Json(committed))
}

#[cfg(test)]
#[path = "repos_test.rs"]
mod tests;
