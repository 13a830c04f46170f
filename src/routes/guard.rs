//! Route guard middleware.
//!
//! Runs ahead of every route. Reconstructs the absolute request URL, reads
//! the session cookie and applies [`guard::decide`]; redirects are 307 so
//! the browser replays the original method after login.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Uri, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use reqwest::Url;

use crate::services::guard::{self, GuardDecision};
use crate::services::session::SESSION_COOKIE;
use crate::state::AppState;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Absolute URL of the incoming request.
///
/// Origin comes from the `Host` header and `X-Forwarded-Proto`, falling back
/// to the public URL's scheme and, without a `Host`, to its origin.
pub(crate) fn request_url(public_url: &Url, headers: &HeaderMap, uri: &Uri) -> Url {
    let mut url = public_url.clone();

    if let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        let scheme = headers
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|proto| matches!(*proto, "http" | "https"))
            .unwrap_or(public_url.scheme());
        match Url::parse(&format!("{scheme}://{host}/")) {
            Ok(origin) => url = origin,
            Err(e) => tracing::debug!(%host, error = %e, "unusable host header"),
        }
    }

    url.set_path(uri.path());
    url.set_query(uri.query());
    url.set_fragment(None);
    url
}

/// Redirect unauthenticated requests for protected paths to the login page.
pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !guard::is_guarded(req.uri().path()) {
        return next.run(req).await;
    }

    let decision = {
        let jar = CookieJar::from_headers(req.headers());
        let token = jar.get(SESSION_COOKIE).map(Cookie::value);
        let url = request_url(&state.config.public_url, req.headers(), req.uri());
        guard::decide(req.uri().path(), &url, state.sessions.as_ref(), token)
    };

    match decision {
        GuardDecision::Forward => next.run(req).await,
        GuardDecision::Redirect { location } => Redirect::temporary(&location).into_response(),
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
