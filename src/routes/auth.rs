//! Auth routes: OAuth sign-in, callback, session read and sign-out.

use axum::extract::{FromRef, FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use reqwest::Url;
use serde::Deserialize;
use time::Duration;
use time::format_description::well_known::Rfc3339;

use crate::services::auth::AuthProvider;
use crate::services::guard::{CALLBACK_PARAM, LOGIN_PATH};
use crate::services::session::{self, AuthPhase, SESSION_COOKIE, Session};
use crate::state::AppState;

pub(crate) const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub(crate) const CALLBACK_COOKIE: &str = "callback_url";

fn build_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn pending_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = build_cookie(name, value, secure);
    cookie.set_max_age(Duration::minutes(10));
    cookie
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = build_cookie(name, String::new(), secure);
    cookie.set_max_age(Duration::ZERO);
    cookie
}

/// Root of the public URL, used whenever a callback cannot be trusted.
fn public_root(public_url: &Url) -> String {
    let mut root = public_url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root.to_string()
}

/// Sanitize a post-login destination.
///
/// Single-slash paths resolve against the public URL; absolute URLs survive
/// only on the public URL's origin. Everything else becomes the public root.
#[must_use]
pub fn safe_callback(public_url: &Url, raw: Option<&str>) -> String {
    let root = public_root(public_url);
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return root;
    };

    if raw.starts_with('/') {
        if raw.starts_with("//") || raw.starts_with("/\\") {
            return root;
        }
        return public_url.join(raw).map_or(root, |url| url.to_string());
    }

    match Url::parse(raw) {
        Ok(url) if url.origin() == public_url.origin() => url.to_string(),
        _ => root,
    }
}

fn login_error_url(public_url: &Url, code: &str) -> String {
    let mut url = public_url.clone();
    url.set_path(LOGIN_PATH);
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut().append_pair("error", code);
    url.to_string()
}

/// Configured provider whose id matches the route segment.
fn provider_for<'a>(state: &'a AppState, id: &str) -> Result<&'a dyn AuthProvider, Response> {
    let Some(provider) = state.provider.as_deref() else {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "OAuth sign-in not configured").into_response());
    };
    if provider.id() != id {
        return Err((StatusCode::NOT_FOUND, "unknown sign-in provider").into_response());
    }
    Ok(provider)
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Verified session extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let keys = app_state.sessions.as_ref().ok_or(StatusCode::UNAUTHORIZED)?;
        let jar = CookieJar::from_headers(&parts.headers);
        keys.verify(jar.get(SESSION_COOKIE).map(Cookie::value))
            .map(Self)
            .map_err(|e| {
                tracing::debug!(error = %e, "session rejected");
                StatusCode::UNAUTHORIZED
            })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct SigninQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
}

/// `GET /api/auth/signin/{provider}`: remember the destination, redirect to
/// the provider's authorization page.
pub async fn signin(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    Query(params): Query<SigninQuery>,
) -> Response {
    let provider = match provider_for(&state, &provider_id) {
        Ok(provider) => provider,
        Err(resp) => return resp,
    };

    let oauth_state = session::generate_token();
    let callback = safe_callback(&state.config.public_url, params.callback_url.as_deref());
    let secure = state.config.cookie_secure;

    let jar = CookieJar::new()
        .add(pending_cookie(OAUTH_STATE_COOKIE, oauth_state.clone(), secure))
        .add(pending_cookie(CALLBACK_COOKIE, callback, secure));
    (jar, Redirect::temporary(&provider.authorize_url(&oauth_state))).into_response()
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// `GET /api/auth/callback/{provider}`: verify state, exchange the grant
/// once, issue the session cookie and return to the remembered destination.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    jar: CookieJar,
    Query(params): Query<CallbackQuery>,
) -> Response {
    let provider = match provider_for(&state, &provider_id) {
        Ok(provider) => provider,
        Err(resp) => return resp,
    };
    let secure = state.config.cookie_secure;
    let public_url = &state.config.public_url;

    let clear_pending = |jar: CookieJar| {
        jar.add(expired_cookie(OAUTH_STATE_COOKIE, secure))
            .add(expired_cookie(CALLBACK_COOKIE, secure))
    };

    if let Some(error) = params.error.as_deref() {
        tracing::warn!(provider = provider.id(), %error, "provider denied authorization");
        return (clear_pending(jar), Redirect::temporary(&login_error_url(public_url, error))).into_response();
    }

    let Some(keys) = state.sessions.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "session signing not configured").into_response();
    };

    // Verify OAuth CSRF state from cookie.
    let Some(callback_state) = params.state.as_deref() else {
        return (StatusCode::BAD_REQUEST, "missing oauth state").into_response();
    };
    let expected_state = jar.get(OAUTH_STATE_COOKIE).map(Cookie::value).unwrap_or_default();
    if expected_state.is_empty() || expected_state != callback_state {
        return (StatusCode::UNAUTHORIZED, "invalid oauth state").into_response();
    }
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing authorization code").into_response();
    };

    let grant = match provider.exchange(code).await {
        Ok(grant) => grant,
        Err(e) => {
            tracing::error!(provider = provider.id(), error = %e, "oauth code exchange failed");
            return (StatusCode::BAD_GATEWAY, "OAuth code exchange failed").into_response();
        }
    };

    let token = match keys.issue(&grant.identity, &grant.access_token) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session").into_response();
        }
    };

    let destination = safe_callback(public_url, jar.get(CALLBACK_COOKIE).map(Cookie::value));
    tracing::info!(login = %grant.identity.login, "signed in");

    let mut session_cookie = build_cookie(SESSION_COOKIE, token, secure);
    session_cookie.set_max_age(Duration::seconds(i64::try_from(keys.max_age_secs()).unwrap_or(i64::MAX)));

    let jar = clear_pending(jar).add(session_cookie);
    (jar, Redirect::temporary(&destination)).into_response()
}

/// `GET /api/auth/session`: the current session, or `{}` when there is none.
pub async fn session(State(state): State<AppState>, jar: CookieJar) -> Json<serde_json::Value> {
    let phase = AuthPhase::resolve(
        state.sessions.as_ref(),
        jar.get(SESSION_COOKIE).map(Cookie::value),
        jar.get(OAUTH_STATE_COOKIE).map(Cookie::value),
    );
    let Some(session) = phase.session() else {
        return Json(serde_json::json!({}));
    };

    let expires = time::OffsetDateTime::from_unix_timestamp(session.expires_at)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok());
    let identity = &session.identity;
    Json(serde_json::json!({
        "user": {
            "id": identity.id,
            "login": identity.login,
            "name": identity.name,
            "email": identity.email,
            "image": identity.avatar_url,
        },
        "accessToken": session.access_token,
        "expires": expires,
    }))
}

/// `POST /api/auth/signout`: clear the session cookie.
pub async fn signout(State(state): State<AppState>) -> impl IntoResponse {
    let jar = CookieJar::new().add(expired_cookie(SESSION_COOKIE, state.config.cookie_secure));
    (jar, Redirect::to(&state.config.signout_redirect))
}

/// Absolute sign-in URL carrying `callbackUrl`.
#[must_use]
pub fn signin_href(public_url: &Url, provider_id: &str, callback: Option<&str>) -> String {
    let mut url = public_url.clone();
    url.set_path(&format!("/api/auth/signin/{provider_id}"));
    url.set_query(None);
    url.set_fragment(None);
    if let Some(callback) = callback.filter(|c| !c.is_empty()) {
        url.query_pairs_mut().append_pair(CALLBACK_PARAM, callback);
    }
    url.to_string()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
