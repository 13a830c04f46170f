use dailycommit::config::AppConfig;
use dailycommit::routes;
use dailycommit::state::AppState;
use dailycommit::ui::theme;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    if config.session_secret.is_none() {
        tracing::warn!("SESSION_SECRET not set; sign-in disabled and every protected page redirects to /login");
    }
    if config.github_client_id.is_none() || config.github_client_secret.is_none() {
        tracing::warn!("GITHUB_ID / GITHUB_SECRET not set; GitHub sign-in unavailable");
    }

    let state = AppState::from_config(config);

    // Spawn background theme change logger.
    let _theme_logger = theme::spawn_theme_logger(&state.theme);

    tracing::info!(public_url = %state.config.public_url, static_dir = %state.config.static_dir.display(), "configuration loaded");

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "dailycommit listening");
    axum::serve(listener, app).await.expect("server failed");
}
