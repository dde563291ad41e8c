//! Error types for stepcast-core.

use thiserror::Error;

/// Result type alias using stepcast-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stepcast operations
#[derive(Error, Debug)]
pub enum Error {
    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    // External AI service errors
    #[error("Processing failed: {0}")]
    Processing(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The single error returned for missing, foreign and ownerless sessions.
    pub fn session_not_found() -> Self {
        Self::NotFound("Session not found".to_string())
    }

    /// Whether this is an infrastructure fault rather than a caller error.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::LockPoisoned
                | Self::Serialization(_)
                | Self::Io(_)
                | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_is_uniform() {
        let a = Error::session_not_found();
        let b = Error::session_not_found();
        assert_eq!(a.to_string(), b.to_string());
        assert!(matches!(a, Error::NotFound(_)));
    }

    #[test]
    fn test_internal_classification() {
        assert!(Error::LockPoisoned.is_internal());
        assert!(Error::internal("boom").is_internal());
        assert!(!Error::validation("bad").is_internal());
        assert!(!Error::processing("upstream 502").is_internal());
        assert!(!Error::conflict("dup").is_internal());
    }

    #[test]
    fn test_processing_message() {
        let err = Error::processing("timed out");
        assert!(err.to_string().contains("timed out"));
    }
}
