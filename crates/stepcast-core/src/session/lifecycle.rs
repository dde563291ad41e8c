//! Session lifecycle manager.

use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::require_owned;
use crate::db::{ExtensionEvent, Feedback, NewSession, Session, SessionStatus, SessionStore};
use crate::error::{Error, Result};
use crate::processing::ProcessingClient;

/// Owns every state change of a session.
///
/// Operations that take an `owner_id` go through the ownership gate first;
/// sessions the caller does not own look exactly like missing ones.
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    processor: Arc<dyn ProcessingClient>,
}

impl SessionLifecycle {
    pub fn new(store: Arc<dyn SessionStore>, processor: Arc<dyn ProcessingClient>) -> Self {
        Self { store, processor }
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Create an empty `PENDING` session.
    pub fn create_session(&self, owner_id: &str, name: &str) -> Result<Session> {
        if name.trim().is_empty() {
            return Err(Error::validation("name is required"));
        }

        let session = self.store.create_session(&NewSession {
            user_id: owner_id.to_string(),
            name: name.to_string(),
        })?;

        info!("Created session {} for user {}", session.id, owner_id);
        Ok(session)
    }

    /// Create a session together with the capture that started it.
    ///
    /// The session name is derived from the current time. Both rows are
    /// written in one transaction.
    pub fn create_session_from_capture(
        &self,
        owner_id: &str,
        url: &str,
        steps: Option<Vec<serde_json::Value>>,
    ) -> Result<(Session, ExtensionEvent)> {
        if url.trim().is_empty() {
            return Err(Error::validation("url is required"));
        }

        let now = chrono::Utc::now();
        let name = format!("Recording – {}", now.format("%Y-%m-%d %H:%M:%S UTC"));
        let steps = steps.unwrap_or_default();

        let (session, event) = self.store.create_session_with_event(
            &NewSession {
                user_id: owner_id.to_string(),
                name,
            },
            url,
            &steps,
        )?;

        info!(
            "Created session {} from capture ({} steps). {}",
            session.id,
            event.steps.len(),
            capture_description(url)
        );
        Ok((session, event))
    }

    /// Append a capture to an existing session.
    ///
    /// Does not check ownership; callers gate with [`require_owned`] first.
    pub fn record_extension_event(
        &self,
        session_id: &str,
        url: &str,
        steps: Option<Vec<serde_json::Value>>,
    ) -> Result<ExtensionEvent> {
        if session_id.trim().is_empty() || url.trim().is_empty() {
            return Err(Error::validation("sessionId and url are required"));
        }

        if self.store.get_session(session_id)?.is_none() {
            return Err(Error::session_not_found());
        }

        let steps = steps.unwrap_or_default();
        self.store.create_extension_event(session_id, url, &steps)
    }

    /// Captures for an owned session, newest first.
    pub fn list_extension_events(
        &self,
        session_id: &str,
        owner_id: &str,
    ) -> Result<Vec<ExtensionEvent>> {
        require_owned(self.store(), session_id, owner_id)?;
        self.store.list_extension_events(session_id)
    }

    pub fn get_session(&self, session_id: &str, owner_id: &str) -> Result<Session> {
        require_owned(self.store(), session_id, owner_id)
    }

    /// Sessions owned by `owner_id`, newest first.
    pub fn list_sessions(&self, owner_id: &str) -> Result<Vec<Session>> {
        self.store.list_sessions(owner_id)
    }

    /// Run the AI generation step for a `PENDING` session.
    ///
    /// The `PROCESSING` status is committed before the external call, so
    /// other readers see in-flight work. Only one caller can claim a session;
    /// any other attempt fails with `Error::Conflict` without calling the
    /// service. On a generation failure the session is marked `FAILED` on a
    /// best-effort basis and `Error::Processing` is returned.
    ///
    /// The call and the final write run on a spawned task, so dropping the
    /// returned future does not abandon a claimed session.
    pub async fn process_session(&self, session_id: &str, owner_id: &str) -> Result<Session> {
        let session = require_owned(self.store(), session_id, owner_id)?;

        if session.status != SessionStatus::Pending
            || !self.store.claim_for_processing(&session.id)?
        {
            return Err(Error::conflict(format!(
                "Session {} cannot be processed: already {}",
                session.id,
                self.current_status(&session)
            )));
        }

        info!("Processing session {}", session.id);

        let store = Arc::clone(&self.store);
        let processor = Arc::clone(&self.processor);
        let id = session.id.clone();
        let name = session.name.clone();
        let task = tokio::spawn(async move {
            finish_processing(store.as_ref(), processor.as_ref(), &id, &name).await
        });

        match task.await {
            Ok(outcome) => outcome?,
            Err(join_err) => {
                warn!("Processing task for session {} aborted: {}", session.id, join_err);
                mark_failed(self.store(), &session.id);
                return Err(Error::processing(format!("Processing task aborted: {}", join_err)));
            }
        }

        self.store
            .get_session(&session.id)?
            .ok_or_else(Error::session_not_found)
    }

    /// Add feedback to an owned session.
    pub fn add_feedback(&self, session_id: &str, owner_id: &str, text: &str) -> Result<Feedback> {
        if text.trim().is_empty() {
            return Err(Error::validation("text is required"));
        }

        require_owned(self.store(), session_id, owner_id)?;
        self.store.create_feedback(session_id, text)
    }

    /// Feedback for an owned session, newest first.
    pub fn list_feedback(&self, session_id: &str, owner_id: &str) -> Result<Vec<Feedback>> {
        require_owned(self.store(), session_id, owner_id)?;
        self.store.list_feedback(session_id)
    }

    fn current_status(&self, session: &Session) -> SessionStatus {
        self.store
            .get_session(&session.id)
            .ok()
            .flatten()
            .map(|s| s.status)
            .unwrap_or(session.status)
    }
}

/// Human-readable description of a session started from a capture.
pub fn capture_description(url: &str) -> String {
    format!("Recorded from {}", url)
}

/// Call the AI service and record the outcome on the claimed session.
async fn finish_processing(
    store: &dyn SessionStore,
    processor: &dyn ProcessingClient,
    session_id: &str,
    name: &str,
) -> Result<()> {
    match processor.generate(session_id, name).await {
        Ok(assets) => {
            store.complete_processing(session_id, &assets.script, &assets.audio_file_name)?;
            info!("Session {} is ready ({})", session_id, assets.audio_file_name);
            Ok(())
        }
        Err(err) => {
            warn!("Processing session {} failed: {}", session_id, err);
            mark_failed(store, session_id);
            Err(match err {
                Error::Processing(_) => err,
                other => Error::processing(other.to_string()),
            })
        }
    }
}

/// Best-effort FAILED write. Its own failure is only logged.
fn mark_failed(store: &dyn SessionStore, session_id: &str) {
    if let Err(secondary) = store.fail_processing(session_id) {
        warn!("Could not mark session {} as FAILED: {}", session_id, secondary);
    }
}
