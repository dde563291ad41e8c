//! SQLite storage for stepcast.
//!
//! [`Database`] is the single source of truth for users, sessions,
//! extension events and feedback. There is no in-process cache; every
//! operation reads or writes the database directly.

mod traits;
pub mod types;

pub use traits::{SessionStore, UserStore};
pub use types::*;

use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Schema applied by [`Database::migrate`]
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

const SESSION_COLUMNS: &str =
    "id, user_id, name, status, script_text, audio_file_name, created_at, updated_at";

/// Database connection wrapper.
///
/// Thread-safe via internal Mutex. All database operations acquire the lock.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path` and apply the schema
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(Error::Database)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    /// Open a private in-memory database with the schema applied
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::Database)?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    /// Apply the schema. Safe to run repeatedly.
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!("Database schema applied");
        Ok(())
    }

    /// Check database connectivity
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(Error::Database)
    }

    fn map_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn map_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            status: row.get(3)?,
            script_text: row.get(4)?,
            audio_file_name: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn map_event(row: &rusqlite::Row) -> rusqlite::Result<ExtensionEvent> {
        let raw_steps: String = row.get(3)?;
        Ok(ExtensionEvent {
            id: row.get(0)?,
            session_id: row.get(1)?,
            url: row.get(2)?,
            steps: decode_steps(&raw_steps),
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn map_feedback(row: &rusqlite::Row) -> rusqlite::Result<Feedback> {
        Ok(Feedback {
            id: row.get(0)?,
            session_id: row.get(1)?,
            text: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn insert_session(conn: &Connection, session: &NewSession, now: i64) -> Result<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sessions (id, user_id, name, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, session.user_id, session.name, SessionStatus::Pending, now],
        )?;

        Ok(Session {
            id,
            user_id: Some(session.user_id.clone()),
            name: session.name.clone(),
            status: SessionStatus::Pending,
            script_text: None,
            audio_file_name: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn insert_event(
        conn: &Connection,
        session_id: &str,
        url: &str,
        steps: &[serde_json::Value],
        now: i64,
    ) -> Result<ExtensionEvent> {
        let id = uuid::Uuid::new_v4().to_string();
        let encoded = serde_json::to_string(steps)?;
        conn.execute(
            "INSERT INTO extension_events (id, session_id, url, steps, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, session_id, url, encoded, now],
        )?;

        Ok(ExtensionEvent {
            id,
            session_id: session_id.to_string(),
            url: url.to_string(),
            steps: steps.to_vec(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Stored steps that fail to parse come back as an empty sequence.
fn decode_steps(raw: &str) -> Vec<serde_json::Value> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// User Operations
// ─────────────────────────────────────────────────────────────────────────────

impl UserStore for Database {
    fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_millis();

        conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, email, password_hash, now],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::conflict("Email already in use")
            } else {
                Error::Database(e)
            }
        })?;

        Ok(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
        )?;

        Ok(stmt.query_row(params![email], Self::map_user).optional()?)
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt =
            conn.prepare("SELECT id, email, password_hash, created_at FROM users WHERE id = ?1")?;

        Ok(stmt.query_row(params![user_id], Self::map_user).optional()?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Operations
// ─────────────────────────────────────────────────────────────────────────────

impl SessionStore for Database {
    fn create_session(&self, session: &NewSession) -> Result<Session> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        Self::insert_session(&conn, session, now_millis())
    }

    fn create_session_with_event(
        &self,
        session: &NewSession,
        url: &str,
        steps: &[serde_json::Value],
    ) -> Result<(Session, ExtensionEvent)> {
        let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let now = now_millis();

        // Dropping the transaction without commit rolls both inserts back.
        let tx = conn.transaction()?;
        let created = Self::insert_session(&tx, session, now)?;
        let event = Self::insert_event(&tx, &created.id, url, steps, now)?;
        tx.commit()?;

        Ok((created, event))
    }

    fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE id = ?1",
            SESSION_COLUMNS
        ))?;

        Ok(stmt
            .query_row(params![session_id], Self::map_session)
            .optional()?)
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            SESSION_COLUMNS
        ))?;

        let sessions = stmt
            .query_map(params![user_id], Self::map_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    fn claim_for_processing(&self, session_id: &str) -> Result<bool> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let changed = conn.execute(
            "UPDATE sessions SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![
                SessionStatus::Processing,
                now_millis(),
                session_id,
                SessionStatus::Pending
            ],
        )?;
        Ok(changed == 1)
    }

    fn complete_processing(
        &self,
        session_id: &str,
        script: &str,
        audio_file_name: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        conn.execute(
            "UPDATE sessions
             SET status = ?1, script_text = ?2, audio_file_name = ?3, updated_at = ?4
             WHERE id = ?5",
            params![SessionStatus::Ready, script, audio_file_name, now_millis(), session_id],
        )?;
        Ok(())
    }

    fn fail_processing(&self, session_id: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        conn.execute(
            "UPDATE sessions
             SET status = ?1, script_text = NULL, audio_file_name = NULL, updated_at = ?2
             WHERE id = ?3",
            params![SessionStatus::Failed, now_millis(), session_id],
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Extension Event Operations
    // ─────────────────────────────────────────────────────────────────────────

    fn create_extension_event(
        &self,
        session_id: &str,
        url: &str,
        steps: &[serde_json::Value],
    ) -> Result<ExtensionEvent> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        Self::insert_event(&conn, session_id, url, steps, now_millis())
    }

    fn list_extension_events(&self, session_id: &str) -> Result<Vec<ExtensionEvent>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, url, steps, created_at, updated_at
             FROM extension_events
             WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let events = stmt
            .query_map(params![session_id], Self::map_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Feedback Operations
    // ─────────────────────────────────────────────────────────────────────────

    fn create_feedback(&self, session_id: &str, text: &str) -> Result<Feedback> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_millis();

        conn.execute(
            "INSERT INTO feedbacks (id, session_id, text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, session_id, text, now],
        )?;

        Ok(Feedback {
            id,
            session_id: session_id.to_string(),
            text: text.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn list_feedback(&self, session_id: &str) -> Result<Vec<Feedback>> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, text, created_at, updated_at
             FROM feedbacks
             WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let feedback = stmt
            .query_map(params![session_id], Self::map_feedback)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("owner@example.com", "hash").unwrap();
        (db, user)
    }

    fn new_session(user: &User, name: &str) -> NewSession {
        NewSession {
            user_id: user.id.clone(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
        assert!(db.ping().is_ok());
    }

    #[test]
    fn test_open_path_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepcast.db");
        {
            let db = Database::open_path(&path).unwrap();
            db.create_user("a@example.com", "hash").unwrap();
        }
        let reopened = Database::open_path(&path).unwrap();
        assert!(reopened.find_user_by_email("a@example.com").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let (db, _) = setup();
        let err = db.create_user("owner@example.com", "other").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_email_lookup_is_case_sensitive() {
        let (db, user) = setup();
        assert_eq!(
            db.find_user_by_email("owner@example.com").unwrap().unwrap().id,
            user.id
        );
        assert!(db.find_user_by_email("OWNER@example.com").unwrap().is_none());
        assert!(db.get_user(&user.id).unwrap().is_some());
    }

    #[test]
    fn test_create_and_get_session() {
        let (db, user) = setup();
        let created = db.create_session(&new_session(&user, "Demo")).unwrap();
        assert_eq!(created.status, SessionStatus::Pending);

        let fetched = db.get_session(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(db.get_session("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_sessions_is_owner_scoped_newest_first() {
        let (db, user) = setup();
        let other = db.create_user("other@example.com", "hash").unwrap();

        let first = db.create_session(&new_session(&user, "first")).unwrap();
        let second = db.create_session(&new_session(&user, "second")).unwrap();
        db.create_session(&new_session(&other, "foreign")).unwrap();

        let listed = db.list_sessions(&user.id).unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[test]
    fn test_claim_is_single_flight() {
        let (db, user) = setup();
        let session = db.create_session(&new_session(&user, "Demo")).unwrap();

        assert!(db.claim_for_processing(&session.id).unwrap());
        assert!(!db.claim_for_processing(&session.id).unwrap());
        assert!(!db.claim_for_processing("missing").unwrap());

        let fetched = db.get_session(&session.id).unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::Processing);
    }

    #[test]
    fn test_complete_and_fail_processing() {
        let (db, user) = setup();
        let ok = db.create_session(&new_session(&user, "ok")).unwrap();
        let bad = db.create_session(&new_session(&user, "bad")).unwrap();

        db.complete_processing(&ok.id, "script", "audio.mp3").unwrap();
        db.fail_processing(&bad.id).unwrap();

        let ok = db.get_session(&ok.id).unwrap().unwrap();
        assert_eq!(ok.status, SessionStatus::Ready);
        assert_eq!(ok.script_text.as_deref(), Some("script"));
        assert_eq!(ok.audio_file_name.as_deref(), Some("audio.mp3"));

        let bad = db.get_session(&bad.id).unwrap().unwrap();
        assert_eq!(bad.status, SessionStatus::Failed);
        assert!(bad.script_text.is_none());
        assert!(bad.audio_file_name.is_none());
    }

    #[test]
    fn test_session_with_event_is_atomic() {
        let (db, user) = setup();
        let steps = vec![json!({"a": 1})];
        let (session, event) = db
            .create_session_with_event(&new_session(&user, "Recording"), "http://x.test", &steps)
            .unwrap();

        assert_eq!(event.session_id, session.id);
        let events = db.list_extension_events(&session.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].steps, steps);

        // Nothing is left behind when the unit fails.
        let orphan = NewSession {
            user_id: "no-such-user".into(),
            name: "orphan".into(),
        };
        assert!(db.create_session_with_event(&orphan, "http://x.test", &steps).is_err());
        assert!(db.list_sessions("no-such-user").unwrap().is_empty());
    }

    #[test]
    fn test_extension_event_requires_existing_session() {
        let (db, _) = setup();
        let err = db.create_extension_event("missing", "http://x.test", &[]);
        assert!(err.is_err());
    }

    #[test]
    fn test_unreadable_steps_rehydrate_empty() {
        let (db, user) = setup();
        let session = db.create_session(&new_session(&user, "Demo")).unwrap();
        let event = db
            .create_extension_event(&session.id, "http://x.test", &[json!("click")])
            .unwrap();

        {
            let conn = db.conn.lock().unwrap();
            conn.execute(
                "UPDATE extension_events SET steps = 'not json' WHERE id = ?1",
                params![event.id],
            )
            .unwrap();
        }

        let events = db.list_extension_events(&session.id).unwrap();
        assert!(events[0].steps.is_empty());
    }

    #[test]
    fn test_feedback_newest_first() {
        let (db, user) = setup();
        let session = db.create_session(&new_session(&user, "Demo")).unwrap();
        assert!(db.list_feedback(&session.id).unwrap().is_empty());

        for text in ["one", "two", "three"] {
            db.create_feedback(&session.id, text).unwrap();
        }

        let texts: Vec<_> = db
            .list_feedback(&session.id)
            .unwrap()
            .into_iter()
            .map(|f| f.text)
            .collect();
        assert_eq!(texts, vec!["three", "two", "one"]);
    }
}
