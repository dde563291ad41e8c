//! Signup and login.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::password::{hash_password, verify_password};
use super::token::TokenIssuer;
use super::{resolve_bearer, Identity};
use crate::db::{PublicUser, UserStore};
use crate::error::{Error, Result};

/// Shortest password accepted at signup
pub const MIN_PASSWORD_LEN: usize = 6;

/// Returned by signup and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: PublicUser,
    pub token: String,
}

/// Credential checks and token issuance
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Resolve a bearer header to an identity whose user still exists.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Identity> {
        let identity = resolve_bearer(header, &self.tokens)?;

        if self.users.get_user(&identity.user_id)?.is_none() {
            return Err(Error::auth("Invalid or expired token"));
        }

        Ok(identity)
    }

    /// Register a new user and issue a token.
    pub async fn signup(&self, email: &str, password: &str) -> Result<AuthSession> {
        if email.trim().is_empty() || password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "email and password (min {} chars) are required",
                MIN_PASSWORD_LEN
            )));
        }

        if self.users.find_user_by_email(email)?.is_some() {
            return Err(Error::conflict("Email already in use"));
        }

        let password = password.to_string();
        let password_hash = blocking(move || hash_password(&password)).await??;
        // The UNIQUE constraint still catches a concurrent signup that won the race.
        let user = self.users.create_user(email, &password_hash)?;
        let token = self.tokens.issue(&user)?;

        info!("Registered user {}", user.id);

        Ok(AuthSession {
            user: PublicUser::from(&user),
            token,
        })
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown emails and wrong passwords produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::validation("email and password are required"));
        }

        let invalid = || Error::auth("Invalid credentials");

        let user = self.users.find_user_by_email(email)?.ok_or_else(invalid)?;

        let password = password.to_string();
        let stored_hash = user.password_hash.clone();
        if !blocking(move || verify_password(&password, &stored_hash)).await? {
            return Err(invalid());
        }

        let token = self.tokens.issue(&user)?;

        Ok(AuthSession {
            user: PublicUser::from(&user),
            token,
        })
    }
}

/// Run CPU-heavy password work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::internal(format!("Password task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn service() -> AuthService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        AuthService::new(db, TokenIssuer::with_default_ttl("test-secret"))
    }

    #[tokio::test]
    async fn test_signup_issues_verifiable_token() {
        let auth = service();
        let session = auth.signup("a@example.com", "secret1").await.unwrap();

        assert_eq!(session.user.email, "a@example.com");
        let identity = auth.tokens().verify(&session.token).unwrap();
        assert_eq!(identity.user_id, session.user.id);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let auth = service();
        assert!(matches!(auth.signup("", "secret1").await, Err(Error::Validation(_))));
        assert!(matches!(auth.signup("a@example.com", "12345").await, Err(Error::Validation(_))));
        assert!(auth.signup("a@example.com", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn test_signup_duplicate_email_conflicts() {
        let auth = service();
        auth.signup("a@example.com", "secret1").await.unwrap();
        let err = auth.signup("a@example.com", "secret2").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_success() {
        let auth = service();
        let signed_up = auth.signup("a@example.com", "secret1").await.unwrap();
        let logged_in = auth.login("a@example.com", "secret1").await.unwrap();
        assert_eq!(logged_in.user, signed_up.user);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = service();
        auth.signup("a@example.com", "secret1").await.unwrap();

        let wrong_password = auth.login("a@example.com", "wrong-pass").await.unwrap_err();
        let unknown_email = auth.login("nobody@example.com", "secret1").await.unwrap_err();

        assert!(matches!(wrong_password, Error::Auth(_)));
        assert!(matches!(unknown_email, Error::Auth(_)));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_requires_fields() {
        let auth = service();
        assert!(matches!(auth.login("", "x").await, Err(Error::Validation(_))));
        assert!(matches!(auth.login("a@example.com", "").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_authenticate_resolves_bearer() {
        let auth = service();
        let session = auth.signup("a@example.com", "secret1").await.unwrap();

        let header = format!("Bearer {}", session.token);
        let identity = auth.authenticate(Some(&header)).unwrap();
        assert_eq!(identity.user_id, session.user.id);

        assert!(matches!(auth.authenticate(None), Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_token_for_unknown_user() {
        // Same secret, different user table
        let issuing = service();
        let session = issuing.signup("a@example.com", "secret1").await.unwrap();

        let auth = service();
        let header = format!("Bearer {}", session.token);
        let err = auth.authenticate(Some(&header)).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
