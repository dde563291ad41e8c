//! Application state.

use std::sync::Arc;
use std::time::Instant;
use stepcast_core::{
    AuthService, Database, HttpProcessingClient, ProcessingClient, SessionLifecycle, TokenIssuer,
};

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Database connection
    pub db: Arc<Database>,
    /// Signup, login and token verification
    pub auth: Arc<AuthService>,
    /// Session lifecycle manager
    pub sessions: Arc<SessionLifecycle>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create application state that talks to the configured AI service
    pub fn new(config: Config, db: Database) -> stepcast_core::Result<Arc<Self>> {
        let processor = HttpProcessingClient::new(config.ai_base_url.clone(), config.ai_timeout)?;
        Ok(Self::with_processor(config, db, Arc::new(processor)))
    }

    /// Create application state with a specific processing client
    pub fn with_processor(
        config: Config,
        db: Database,
        processor: Arc<dyn ProcessingClient>,
    ) -> Arc<Self> {
        let db = Arc::new(db);
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl);

        Arc::new(Self {
            auth: Arc::new(AuthService::new(db.clone(), tokens)),
            sessions: Arc::new(SessionLifecycle::new(db.clone(), processor)),
            config: Arc::new(config),
            db,
            start_time: Instant::now(),
        })
    }
}
