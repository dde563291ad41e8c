//! stepcast-server - stepcast backend server
//!
//! REST API for recording sessions, captures, AI processing and feedback.

use std::sync::Arc;
use stepcast_core::Database;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod error;
mod middleware;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let json_logs = std::env::var("STEPCAST_LOG_JSON").is_ok_and(|v| v == "1");
    tracing_subscriber::registry()
        .with((!json_logs).then(|| fmt::layer()))
        .with(json_logs.then(|| fmt::layer().json()))
        .with(
            EnvFilter::from_default_env()
                .add_directive("stepcast_server=info".parse()?)
                .add_directive("stepcast_core=info".parse()?),
        )
        .init();

    info!("stepcast-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::Config::load()?;
    info!("Config loaded from {:?}", config.config_path);

    if config.uses_default_secret() {
        warn!("JWT_SECRET is not set; using the development signing secret");
    }

    info!("Data directory {:?}", config.data_dir);
    let db = Database::open_path(&config.database_path)?;
    info!("Database opened at {:?}", config.database_path);

    let bind_addr = config.bind_addr;
    info!("AI service at {} (timeout {:?})", config.ai_base_url, config.ai_timeout);

    let state: Arc<state::AppState> = state::AppState::new(config, db)?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
