//! stepcast-core - Core library for stepcast
//!
//! This crate holds everything the HTTP server delegates to:
//!
//! - **db**: SQLite-backed user and session store
//! - **auth**: Password hashing, bearer tokens, signup/login and the
//!   ownership gate
//! - **session**: Session lifecycle state machine and processing workflow
//! - **processing**: Client for the external AI generation service

pub mod auth;
pub mod db;
pub mod error;
pub mod processing;
pub mod session;

// Re-export commonly used types
pub use auth::{AuthService, Identity, TokenIssuer};
pub use db::{Database, SessionStore, UserStore};
pub use error::{Error, Result};
pub use processing::{GeneratedAssets, HttpProcessingClient, ProcessingClient};
pub use session::SessionLifecycle;
