//! Server configuration.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables
//! 2. Config file (`<data dir>/config.toml`, or `STEPCAST_CONFIG`)
//! 3. Default values

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Signing secret used when none is configured. Only fit for development.
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_AI_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to configuration file
    pub config_path: PathBuf,
    /// Base directory for server data
    pub data_dir: PathBuf,
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// Database path
    pub database_path: PathBuf,
    /// Secret used to sign bearer tokens
    pub jwt_secret: String,
    /// Bearer token validity
    pub token_ttl: Duration,
    /// Base URL of the AI generation service
    pub ai_base_url: String,
    /// Upper bound on a single AI generation call
    pub ai_timeout: Duration,
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    bind: Option<String>,
    database_path: Option<PathBuf>,
    jwt_secret: Option<String>,
    token_ttl_secs: Option<u64>,
    ai: AiFileConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AiFileConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stepcast")
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();

        Self {
            config_path: data_dir.join("config.toml"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            database_path: data_dir.join("stepcast.db"),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            ai_base_url: DEFAULT_AI_BASE_URL.to_string(),
            ai_timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the process environment, config file and
    /// defaults.
    ///
    /// Standard directory structure:
    /// ```text
    /// ~/.stepcast/
    /// ├── config.toml           # Optional configuration
    /// └── stepcast.db           # Database
    /// ```
    pub fn load() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve configuration using `env` for environment lookups.
    fn resolve(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = env("STEPCAST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config_path = env("STEPCAST_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let file = read_file_config(&config_path)?;

        let bind = env("STEPCAST_BIND")
            .or_else(|| env("PORT").map(|port| format!("0.0.0.0:{}", port.trim())))
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", bind))?;

        let database_path = env("STEPCAST_DATABASE_PATH")
            .map(PathBuf::from)
            .or(file.database_path)
            .unwrap_or_else(|| data_dir.join("stepcast.db"));

        let jwt_secret = env("JWT_SECRET")
            .or(file.jwt_secret)
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());

        let token_ttl_secs = match env("STEPCAST_TOKEN_TTL_SECS") {
            Some(raw) => parse_secs("STEPCAST_TOKEN_TTL_SECS", &raw)?,
            None => file.token_ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
        };

        let ai_base_url = env("AI_BASE_URL")
            .or(file.ai.base_url)
            .unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string());

        let ai_timeout_secs = match env("AI_TIMEOUT_SECS") {
            Some(raw) => parse_secs("AI_TIMEOUT_SECS", &raw)?,
            None => file.ai.timeout_secs.unwrap_or(DEFAULT_AI_TIMEOUT_SECS),
        };

        Ok(Self {
            config_path,
            data_dir,
            bind_addr,
            database_path,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            ai_base_url,
            ai_timeout: Duration::from_secs(ai_timeout_secs),
        })
    }

    /// Whether the token signing secret is the built-in development value
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse_secs(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds, got {:?}", name, raw))
}
