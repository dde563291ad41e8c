//! Authentication and authorization for stepcast.
//!
//! - Password hashing for stored credentials
//! - Bearer tokens carrying a user identity
//! - Signup/login ([`AuthService`])
//! - The ownership gate applied to every session-scoped operation

mod password;
mod service;
mod token;

pub use password::{hash_password, verify_password};
pub use service::{AuthService, AuthSession, MIN_PASSWORD_LEN};
pub use token::{TokenIssuer, DEFAULT_TOKEN_TTL};

use serde::{Deserialize, Serialize};

use crate::db::{Session, SessionStore};
use crate::error::{Error, Result};

/// Caller identity resolved from a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

/// Resolve an identity from an `Authorization` header value.
///
/// The value must be `Bearer <token>`. A missing header, another scheme, an
/// empty token or a token that fails verification are all `Error::Auth`.
pub fn resolve_bearer(header: Option<&str>, issuer: &TokenIssuer) -> Result<Identity> {
    let header = header.ok_or_else(|| Error::auth("Authorization header missing or invalid"))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::auth("Authorization header missing or invalid"))?;

    issuer.verify(token)
}

/// Load a session on behalf of `user_id`.
///
/// Missing sessions, sessions owned by someone else and sessions without an
/// owner all produce the same `Error::NotFound`.
pub fn require_owned(
    store: &dyn SessionStore,
    session_id: &str,
    user_id: &str,
) -> Result<Session> {
    match store.get_session(session_id)? {
        Some(session) if session.is_owned_by(user_id) => Ok(session),
        _ => Err(Error::session_not_found()),
    }
}
