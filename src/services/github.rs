//! GitHub REST client for the repository and editor surfaces.
//!
//! Every call takes the access token from the caller's verified session; the
//! client itself holds no credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = "dailycommit";
const API_VERSION: &str = "2022-11-28";
pub const DEFAULT_REPO_DESCRIPTION: &str = "Created with Daily Notes App";

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("github rejected the access token")]
    Unauthorized,
    #[error("github resource not found: {0}")]
    NotFound(String),
    #[error("github validation failed: {0}")]
    Validation(String),
    #[error("github returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("github request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub updated_at: String,
    pub stargazers_count: u32,
    pub private: bool,
}

impl Repository {
    /// Whether `full_name` places the repository under `login`.
    #[must_use]
    pub fn is_owned_by(&self, login: &str) -> bool {
        self.full_name
            .split_once('/')
            .is_some_and(|(owner, _)| owner.eq_ignore_ascii_case(login))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedFile {
    pub path: String,
    pub sha: String,
    pub html_url: Option<String>,
    pub commit_sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentMeta {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: PutContent,
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    path: String,
    sha: String,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

/// GitHub repository names: ASCII letters, digits, `.`, `-`, `_`.
#[must_use]
pub fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 100
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

#[derive(Debug, Clone)]
pub struct GitHubApi {
    client: reqwest::Client,
    api_base: String,
}

impl GitHubApi {
    #[must_use]
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self { client, api_base: api_base.into().trim_end_matches('/').to_owned() }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn request(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(access_token)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Repositories owned by `owner`, most recently updated first.
    ///
    /// Entries are committed under `/repos/{owner}/...`, so organization and
    /// collaborator repositories are excluded.
    ///
    /// # Errors
    ///
    /// Returns a [`GitHubError`] on transport failure or a non-2xx status.
    pub async fn list_repos(&self, access_token: &str, owner: &str) -> Result<Vec<Repository>, GitHubError> {
        let resp = self
            .request(Method::GET, "/user/repos", access_token)
            .query(&[("affiliation", "owner"), ("sort", "updated"), ("per_page", "100")])
            .send()
            .await?;
        let mut repos: Vec<Repository> = check(resp, "/user/repos").await?.json().await?;
        repos.retain(|repo| repo.is_owned_by(owner));
        Ok(repos)
    }

    /// Create a private, auto-initialized repository for the user.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::Validation`] if the name is taken or invalid.
    pub async fn create_repo(
        &self,
        access_token: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Repository, GitHubError> {
        let resp = self
            .request(Method::POST, "/user/repos", access_token)
            .json(&serde_json::json!({
                "name": name,
                "description": description.unwrap_or(DEFAULT_REPO_DESCRIPTION),
                "private": true,
                "auto_init": true,
            }))
            .send()
            .await?;
        Ok(check(resp, "/user/repos").await?.json().await?)
    }

    /// Blob sha of an existing file, or `None` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a [`GitHubError`] for failures other than 404.
    pub async fn file_sha(
        &self,
        access_token: &str,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<String>, GitHubError> {
        let api_path = contents_path(owner, repo, path);
        let resp = self.request(Method::GET, &api_path, access_token).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let meta: ContentMeta = check(resp, &api_path).await?.json().await?;
        Ok(Some(meta.sha))
    }

    /// Create or update a file with one commit.
    ///
    /// # Errors
    ///
    /// Returns a [`GitHubError`] on transport failure or a non-2xx status.
    pub async fn put_file(
        &self,
        access_token: &str,
        target: &FileWrite<'_>,
    ) -> Result<CommittedFile, GitHubError> {
        let api_path = contents_path(target.owner, target.repo, target.path);
        let mut body = serde_json::json!({
            "message": target.message,
            "content": BASE64.encode(target.content.as_bytes()),
        });
        if let Some(sha) = target.sha {
            body["sha"] = serde_json::Value::String(sha.to_owned());
        }

        let resp = self
            .request(Method::PUT, &api_path, access_token)
            .json(&body)
            .send()
            .await?;
        let put: PutContentResponse = check(resp, &api_path).await?.json().await?;
        Ok(CommittedFile {
            path: put.content.path,
            sha: put.content.sha,
            html_url: put.content.html_url,
            commit_sha: put.commit.sha,
        })
    }
}

/// One file write through the contents API.
#[derive(Debug, Clone, Copy)]
pub struct FileWrite<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub path: &'a str,
    pub content: &'a str,
    pub message: &'a str,
    /// Current blob sha when updating an existing file.
    pub sha: Option<&'a str>,
}

pub(crate) fn contents_path(owner: &str, repo: &str, path: &str) -> String {
    format!("/repos/{owner}/{repo}/contents/{}", path.trim_start_matches('/'))
}

async fn check(resp: Response, what: &str) -> Result<Response, GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, what, body))
}

pub(crate) fn status_error(status: StatusCode, what: &str, body: String) -> GitHubError {
    match status {
        StatusCode::UNAUTHORIZED => GitHubError::Unauthorized,
        StatusCode::NOT_FOUND => GitHubError::NotFound(what.to_owned()),
        StatusCode::UNPROCESSABLE_ENTITY => GitHubError::Validation(validation_message(&body)),
        _ => GitHubError::Status { status, body },
    }
}

/// Pull the human-readable reason out of a 422 body.
fn validation_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ValidationBody {
        message: Option<String>,
        #[serde(default)]
        errors: Vec<serde_json::Value>,
    }

    let Ok(parsed) = serde_json::from_str::<ValidationBody>(body) else {
        return body.to_owned();
    };
    let detail = parsed
        .errors
        .iter()
        .find_map(|e| e.get("message").and_then(serde_json::Value::as_str))
        .map(str::to_owned);
    match (parsed.message, detail) {
        (Some(message), Some(detail)) => format!("{message}: {detail}"),
        (Some(message), None) => message,
        (None, Some(detail)) => detail,
        (None, None) => body.to_owned(),
    }
}

#[cfg(test)]
#[path = "github_test.rs"]
mod tests;
