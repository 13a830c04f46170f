//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! Everything in it is immutable after startup except the theme, which
//! carries its own change channel. Optional members are `None` when their
//! secrets are not configured; handlers degrade instead of failing startup.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::auth::{AuthProvider, GitHubConfig, GitHubProvider};
use crate::services::github::GitHubApi;
use crate::services::session::SessionKeys;
use crate::ui::theme::ThemeState;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Session signing keys. `None` if `SESSION_SECRET` is not configured.
    pub sessions: Option<SessionKeys>,
    /// Sign-in provider. `None` if the OAuth client is not configured.
    pub provider: Option<Arc<dyn AuthProvider>>,
    pub github: GitHubApi,
    pub theme: ThemeState,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, provider: Option<Arc<dyn AuthProvider>>) -> Self {
        Self::with_client(config, provider, reqwest::Client::new())
    }

    /// Build state with the GitHub OAuth provider when it is configured.
    /// Provider and REST client share one connection pool.
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        let client = reqwest::Client::new();
        let provider = GitHubConfig::from_app_config(&config)
            .map(|gh| Arc::new(GitHubProvider::new(gh, client.clone())) as Arc<dyn AuthProvider>);
        Self::with_client(config, provider, client)
    }

    fn with_client(config: AppConfig, provider: Option<Arc<dyn AuthProvider>>, client: reqwest::Client) -> Self {
        let sessions = config
            .session_secret
            .as_deref()
            .map(|secret| SessionKeys::new(secret, config.session_max_age_secs));
        let github = GitHubApi::new(client, config.github_api_base.clone());
        Self { config: Arc::new(config), sessions, provider, github, theme: ThemeState::default() }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
