//! Store traits the services are written against.
//!
//! [`Database`](super::Database) is the production implementation; tests can
//! substitute their own.

use crate::error::Result;
use super::types::{ExtensionEvent, Feedback, NewSession, Session, User};

/// Credential storage used by signup and login.
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with `Error::Conflict` when the email is taken.
    fn create_user(&self, email: &str, password_hash: &str) -> Result<User>;

    /// Exact (case-sensitive) email lookup.
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn get_user(&self, user_id: &str) -> Result<Option<User>>;
}

/// Storage for sessions and the records they own.
pub trait SessionStore: Send + Sync {
    /// Insert a `PENDING` session.
    fn create_session(&self, session: &NewSession) -> Result<Session>;

    /// Insert a session and its first extension event in one transaction.
    fn create_session_with_event(
        &self,
        session: &NewSession,
        url: &str,
        steps: &[serde_json::Value],
    ) -> Result<(Session, ExtensionEvent)>;

    fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Sessions owned by a user, newest first.
    fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>>;

    /// Move a session from `PENDING` to `PROCESSING`.
    ///
    /// Returns `false` when the session is not `PENDING`, in which case
    /// nothing was written.
    fn claim_for_processing(&self, session_id: &str) -> Result<bool>;

    /// Mark a session `READY` with its generated script and audio.
    fn complete_processing(&self, session_id: &str, script: &str, audio_file_name: &str)
        -> Result<()>;

    /// Mark a session `FAILED`.
    fn fail_processing(&self, session_id: &str) -> Result<()>;

    fn create_extension_event(
        &self,
        session_id: &str,
        url: &str,
        steps: &[serde_json::Value],
    ) -> Result<ExtensionEvent>;

    /// Events for a session, newest first.
    fn list_extension_events(&self, session_id: &str) -> Result<Vec<ExtensionEvent>>;

    fn create_feedback(&self, session_id: &str, text: &str) -> Result<Feedback>;

    /// Feedback for a session, newest first.
    fn list_feedback(&self, session_id: &str) -> Result<Vec<Feedback>>;
}
