//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router carries the auth endpoints, the repository JSON API, the
//! HTML pages and the static asset directory. The route guard wraps all of
//! it; static prefixes and the public allow-list pass straight through.

pub mod auth;
pub mod guard;
pub mod pages;
pub mod repos;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin/{provider}", get(auth::signin))
        .route("/api/auth/callback/{provider}", get(auth::callback))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/signout", post(auth::signout))
        .route("/api/repos", get(repos::list_repos).post(repos::create_repo))
        .route("/api/repos/{name}/entries", post(repos::commit_entry))
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .route("/editor/{repo}", get(pages::editor))
        .route("/repos", post(pages::create_repo_form))
        .route("/theme/toggle", post(pages::toggle_theme))
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .merge(api_routes())
        .merge(page_routes())
        .nest_service("/public", ServeDir::new(&static_dir))
        .nest_service("/images", ServeDir::new(static_dir.join("images")))
        .layer(middleware::from_fn_with_state(state.clone(), guard::require_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
