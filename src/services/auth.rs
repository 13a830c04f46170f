//! Identity-provider abstraction and the GitHub OAuth implementation.
//!
//! `AuthProvider` is the only sign-in entry point. The GitHub provider turns
//! an authorization code into an access token exactly once per sign-in and
//! fetches the profile that gets merged into the session.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::session::Identity;
use crate::config::AppConfig;

pub const GITHUB_SCOPES: &str = "read:user user:email repo";
const USER_AGENT: &str = "dailycommit";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("github token exchange failed: {0}")]
    TokenExchange(String),
    #[error("github api error: {0}")]
    GitHubApi(String),
}

/// Result of a successful grant exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderGrant {
    pub identity: Identity,
    pub access_token: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Short provider id used in route paths (`/api/auth/signin/{id}`).
    fn id(&self) -> &'static str;

    /// Build the provider authorization URL carrying the CSRF `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for an access token and profile.
    async fn exchange(&self, code: &str) -> Result<ProviderGrant, AuthError>;
}

// =============================================================================
// GITHUB
// =============================================================================

/// GitHub OAuth configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub oauth_base: String,
    pub api_base: String,
}

impl GitHubConfig {
    /// Returns `None` if the client id or secret is missing (sign-in disabled).
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let client_id = config.github_client_id.clone()?;
        let client_secret = config.github_client_secret.clone()?;
        let redirect_uri = config
            .public_url
            .join("/api/auth/callback/github")
            .ok()?
            .to_string();
        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
            oauth_base: config.github_oauth_base.clone(),
            api_base: config.github_api_base.clone(),
        })
    }

    /// Build the GitHub authorization URL.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        let base = format!("{}/login/oauth/authorize", self.oauth_base);
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", GITHUB_SCOPES),
            ("state", state),
        ];
        match Url::parse_with_params(&base, &params) {
            Ok(url) => url.to_string(),
            Err(_) => base,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    pub primary: bool,
    pub verified: bool,
}

impl GitHubUser {
    /// Merge the profile into a session identity. The display name falls back
    /// to the login handle.
    #[must_use]
    pub fn into_identity(self, fallback_email: Option<String>) -> Identity {
        Identity {
            id: self.id.to_string(),
            name: self.name.or_else(|| Some(self.login.clone())),
            login: self.login,
            email: self.email.or(fallback_email),
            avatar_url: self.avatar_url,
        }
    }
}

/// Pick the primary verified address from `/user/emails`.
#[must_use]
pub fn primary_email(emails: &[GitHubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email.clone())
}

pub struct GitHubProvider {
    config: GitHubConfig,
    client: reqwest::Client,
}

impl GitHubProvider {
    #[must_use]
    pub fn new(config: GitHubConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Exchange an OAuth code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let resp = self
            .client
            .post(format!("{}/login/oauth/access_token", self.config.oauth_base))
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "code": code,
                "redirect_uri": self.config.redirect_uri,
            }))
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let body = resp
            .text()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;
        parse_token_response(&body)
    }

    /// Fetch the authenticated GitHub user's profile.
    async fn fetch_github_user(&self, access_token: &str) -> Result<GitHubUser, AuthError> {
        let resp = self
            .client
            .get(format!("{}/user", self.config.api_base))
            .header("Authorization", format!("Bearer {access_token}"))
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| AuthError::GitHubApi(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::GitHubApi(format!("{status}: {body}")));
        }

        resp.json::<GitHubUser>()
            .await
            .map_err(|e| AuthError::GitHubApi(e.to_string()))
    }

    /// Fetch the primary verified email for users who keep theirs private.
    async fn fetch_primary_email(&self, access_token: &str) -> Result<Option<String>, AuthError> {
        let resp = self
            .client
            .get(format!("{}/user/emails", self.config.api_base))
            .header("Authorization", format!("Bearer {access_token}"))
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| AuthError::GitHubApi(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::GitHubApi(format!("{}: email lookup", resp.status())));
        }

        let emails = resp
            .json::<Vec<GitHubEmail>>()
            .await
            .map_err(|e| AuthError::GitHubApi(e.to_string()))?;
        Ok(primary_email(&emails))
    }
}

#[async_trait]
impl AuthProvider for GitHubProvider {
    fn id(&self) -> &'static str {
        "github"
    }

    fn authorize_url(&self, state: &str) -> String {
        self.config.authorize_url(state)
    }

    async fn exchange(&self, code: &str) -> Result<ProviderGrant, AuthError> {
        let access_token = self.exchange_code(code).await?;
        let user = self.fetch_github_user(&access_token).await?;

        let fallback_email = if user.email.is_none() {
            match self.fetch_primary_email(&access_token).await {
                Ok(email) => email,
                Err(e) => {
                    tracing::warn!(error = %e, login = %user.login, "primary email lookup failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(ProviderGrant { identity: user.into_identity(fallback_email), access_token })
    }
}

fn parse_token_response(body: &str) -> Result<String, AuthError> {
    let resp: TokenResponse =
        serde_json::from_str(body).map_err(|_| AuthError::TokenExchange(format!("unexpected response: {body}")))?;
    match resp {
        TokenResponse { access_token: Some(token), .. } if !token.is_empty() => Ok(token),
        TokenResponse { error: Some(error), error_description, .. } => Err(AuthError::TokenExchange(match error_description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        })),
        _ => Err(AuthError::TokenExchange("response carried no access token".into())),
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
