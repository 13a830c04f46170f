//! Route guard decision.
//!
//! DESIGN
//! ======
//! `decide` is a pure function of (path, absolute request URL, session
//! token). It performs no I/O and keeps no state, so identical inputs always
//! produce identical decisions. An absent token and a token that fails
//! verification lead to the same redirect; callers cannot tell them apart.

use reqwest::Url;

use super::session::SessionKeys;

pub const LOGIN_PATH: &str = "/login";
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// Paths reachable without a session, matched exactly or as `prefix/...`.
pub const PUBLIC_PATHS: [&str; 4] = ["/login", "/register", "/forgot-password", "/api/auth"];

/// Asset prefixes the guard never runs for (relative to the leading `/`).
const STATIC_PREFIXES: [&str; 5] = ["_next/static", "_next/image", "favicon.ico", "images/", "public/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Forward,
    Redirect { location: String },
}

/// Whether `path` is on the public allow-list.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| {
        path == *public
            || path
                .strip_prefix(public)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Whether the guard applies to `path` at all. Static assets are skipped.
#[must_use]
pub fn is_guarded(path: &str) -> bool {
    let rest = path.strip_prefix('/').unwrap_or(path);
    !STATIC_PREFIXES.iter().any(|prefix| rest.starts_with(prefix))
}

/// Decide whether a request may proceed.
///
/// `keys` is `None` when no signing secret is configured; every token is then
/// unverifiable and protected paths always redirect.
#[must_use]
pub fn decide(path: &str, request_url: &Url, keys: Option<&SessionKeys>, token: Option<&str>) -> GuardDecision {
    if is_public_path(path) {
        return GuardDecision::Forward;
    }

    let verified = match keys {
        Some(keys) => match keys.verify(token) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(%path, error = %e, "session rejected");
                false
            }
        },
        None => false,
    };

    if verified {
        GuardDecision::Forward
    } else {
        GuardDecision::Redirect { location: login_redirect(request_url) }
    }
}

/// Absolute login URL on the request's origin with the original URL attached
/// as `callbackUrl`.
#[must_use]
pub fn login_redirect(request_url: &Url) -> String {
    let mut login = request_url.clone();
    login.set_path(LOGIN_PATH);
    login.set_query(None);
    login.set_fragment(None);
    login
        .query_pairs_mut()
        .append_pair(CALLBACK_PARAM, request_url.as_str());
    login.to_string()
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
