//! Signed session tokens and OAuth state generation.
//!
//! ARCHITECTURE
//! ============
//! Sessions are stateless: the identity and the GitHub access token live in
//! an HS256-signed JWT carried by an HttpOnly cookie. Nothing else on the
//! server stores the access token. Sign-out clears the cookie; a token is
//! otherwise valid until its `exp` claim passes.
//!
//! TRADE-OFFS
//! ==========
//! Without a server-side session table there is no revocation list. A stolen
//! cookie stays usable until expiry, which is bounded by
//! `SESSION_MAX_AGE_SECS`.

use std::fmt::Write;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "dailycommit.session-token";

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

pub(crate) fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// =============================================================================
// SESSION
// =============================================================================

/// External profile merged into the session at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned user id (GitHub numeric id, stringified).
    pub id: String,
    /// Provider login handle; owner segment for repository paths.
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// A verified session. Identity and access token are always both present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    /// Expiry as a Unix timestamp.
    pub expires_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token absent")]
    TokenAbsent,
    #[error("session token invalid: {0}")]
    TokenInvalid(String),
    #[error("session token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    picture: Option<String>,
    access_token: String,
    iat: i64,
    exp: i64,
}

// =============================================================================
// SESSION KEYS
// =============================================================================

/// Issues and verifies session tokens with one shared secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age_secs: u64,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("max_age_secs", &self.max_age_secs)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    #[must_use]
    pub fn new(secret: &str, max_age_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            max_age_secs,
        }
    }

    #[must_use]
    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    /// Sign a new session token for a freshly exchanged grant.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] if the token cannot be encoded.
    pub fn issue(&self, identity: &Identity, access_token: &str) -> Result<String, SessionError> {
        self.issue_at(identity, access_token, now_unix())
    }

    pub(crate) fn issue_at(&self, identity: &Identity, access_token: &str, issued_at: i64) -> Result<String, SessionError> {
        let max_age = i64::try_from(self.max_age_secs).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            sub: identity.id.clone(),
            login: identity.login.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            picture: identity.avatar_url.clone(),
            access_token: access_token.to_owned(),
            iat: issued_at,
            exp: issued_at.saturating_add(max_age),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Verify a session token and rebuild the session.
    ///
    /// # Errors
    ///
    /// [`SessionError::TokenAbsent`] for a missing or empty token,
    /// [`SessionError::TokenInvalid`] for bad signatures, expiry, malformed
    /// payloads or a partially populated session.
    pub fn verify(&self, token: Option<&str>) -> Result<Session, SessionError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(SessionError::TokenAbsent)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| SessionError::TokenInvalid(e.to_string()))?;
        let claims = data.claims;

        if claims.sub.is_empty() || claims.login.is_empty() || claims.access_token.is_empty() {
            return Err(SessionError::TokenInvalid("incomplete session".into()));
        }

        Ok(Session {
            identity: Identity {
                id: claims.sub,
                login: claims.login,
                name: claims.name,
                email: claims.email,
                avatar_url: claims.picture,
            },
            access_token: claims.access_token,
            expires_at: claims.exp,
        })
    }
}

// =============================================================================
// AUTH PHASE
// =============================================================================

/// Where a browser stands in the sign-in flow, derived from its cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPhase {
    Anonymous,
    /// Redirected to the provider; waiting for the authorization grant.
    PendingExchange,
    Authenticated(Session),
}

impl AuthPhase {
    /// Resolve the phase. A valid session wins over a pending OAuth state;
    /// an unverifiable session token counts as no session at all.
    #[must_use]
    pub fn resolve(keys: Option<&SessionKeys>, session_token: Option<&str>, oauth_state: Option<&str>) -> Self {
        if let Some(session) = keys.and_then(|k| k.verify(session_token).ok()) {
            return Self::Authenticated(session);
        }
        if oauth_state.is_some_and(|s| !s.is_empty()) {
            return Self::PendingExchange;
        }
        Self::Anonymous
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Anonymous | Self::PendingExchange => None,
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
