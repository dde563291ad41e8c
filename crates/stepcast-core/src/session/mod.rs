//! Recording session lifecycle.
//!
//! ```text
//! CreateSession / CreateSessionFromCapture
//!   │
//!   └─► PENDING
//!         │  ProcessSession (claim committed before the AI call)
//!         ▼
//!       PROCESSING
//!         │
//!         ├─► READY   (script + audio stored together)
//!         └─► FAILED  (no script, no audio)
//! ```
//!
//! Extension events and feedback attach to a session in any state and never
//! change its status.

mod lifecycle;

pub use lifecycle::*;
