//! Application configuration parsed from environment variables.
//!
//! Secrets are optional: a missing OAuth client or session-signing secret
//! disables login instead of aborting startup, so the route guard keeps
//! working (every protected request redirects to the login page).

use std::path::PathBuf;

use reqwest::Url;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;
/// Upper bound for session lifetime (400 days, the browser cookie cap).
pub const MAX_SESSION_MAX_AGE_SECS: u64 = 400 * 24 * 60 * 60;
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_OAUTH_BASE: &str = "https://github.com";
pub const DEFAULT_SIGNOUT_REDIRECT: &str = "/login";
pub const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    Port(String),
    #[error("invalid PUBLIC_URL '{url}': {reason}")]
    PublicUrl { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Canonical origin of the deployment. Used for OAuth redirect URIs and
    /// for validating post-login callback URLs.
    pub public_url: Url,
    pub session_secret: Option<String>,
    pub session_max_age_secs: u64,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub github_api_base: String,
    pub github_oauth_base: String,
    /// Landing path after sign-out.
    pub signout_redirect: String,
    pub cookie_secure: bool,
    pub static_dir: PathBuf,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `PUBLIC_URL`: default `http://localhost:<PORT>`
    /// - `SESSION_SECRET`: session signing secret (login disabled when absent)
    /// - `SESSION_MAX_AGE_SECS`: default 30 days
    /// - `GITHUB_ID`, `GITHUB_SECRET`: OAuth client (login disabled when absent)
    /// - `GITHUB_API_BASE`, `GITHUB_OAUTH_BASE`: GitHub endpoints
    /// - `SIGNOUT_REDIRECT`: default `/login`
    /// - `COOKIE_SECURE`: inferred from the `PUBLIC_URL` scheme when unset
    /// - `STATIC_DIR`: default `public`
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` or `PUBLIC_URL` is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Port(raw))?,
            None => DEFAULT_PORT,
        };

        let raw_public_url = var("PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{port}"));
        let public_url = parse_public_url(&raw_public_url)?;

        let cookie_secure = var("COOKIE_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(public_url.scheme() == "https");

        let base_url = |key: &str, default: &str| {
            var(key)
                .unwrap_or_else(|| default.to_owned())
                .trim_end_matches('/')
                .to_owned()
        };

        Ok(Self {
            port,
            public_url,
            session_secret: var("SESSION_SECRET"),
            session_max_age_secs: var("SESSION_MAX_AGE_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_MAX_AGE_SECS)
                .min(MAX_SESSION_MAX_AGE_SECS),
            github_client_id: var("GITHUB_ID"),
            github_client_secret: var("GITHUB_SECRET"),
            github_api_base: base_url("GITHUB_API_BASE", DEFAULT_GITHUB_API_BASE),
            github_oauth_base: base_url("GITHUB_OAUTH_BASE", DEFAULT_GITHUB_OAUTH_BASE),
            signout_redirect: var("SIGNOUT_REDIRECT").unwrap_or_else(|| DEFAULT_SIGNOUT_REDIRECT.into()),
            cookie_secure,
            static_dir: var("STATIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from),
        })
    }
}

fn parse_public_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::PublicUrl { url: raw.into(), reason: e.to_string() })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::PublicUrl { url: raw.into(), reason: "expected an http(s) origin".into() });
    }
    Ok(url)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
