//! Client for the external AI generation service.
//!
//! The service turns a session's captured steps into a narration script and
//! an audio file. It is consumed as a black box:
//!
//! ```text
//! POST {base_url}/simple-generate   {"sessionId": "...", "name": "..."}
//!   200 {"script": "...", "processed_audio_filename": "..."}
//! ```
//!
//! Anything else (network failure, timeout, non-2xx status, unexpected
//! body) is reported as `Error::Processing`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default upper bound on a single generation call
pub const DEFAULT_PROCESSING_TIMEOUT: Duration = Duration::from_secs(120);

/// Output of a successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAssets {
    pub script: String,
    pub audio_file_name: String,
}

/// Turns a session into a script and an audio reference.
#[async_trait]
pub trait ProcessingClient: Send + Sync {
    async fn generate(&self, session_id: &str, name: &str) -> Result<GeneratedAssets>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    session_id: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    script: String,
    processed_audio_filename: String,
}

/// HTTP implementation of [`ProcessingClient`]
#[derive(Clone)]
pub struct HttpProcessingClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpProcessingClient {
    /// Create a client; every call is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ProcessingClient for HttpProcessingClient {
    async fn generate(&self, session_id: &str, name: &str) -> Result<GeneratedAssets> {
        let url = format!("{}/simple-generate", self.base_url);
        debug!(%url, %session_id, "Requesting generation");

        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest { session_id, name })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::processing("AI service timed out")
                } else {
                    Error::processing(format!("AI service unreachable: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %session_id, "AI service returned an error: {}", body);
            return Err(Error::processing(format!("AI service returned {}", status)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::processing(format!("Malformed AI service response: {}", e)))?;

        Ok(GeneratedAssets {
            script: body.script,
            audio_file_name: body.processed_audio_filename,
        })
    }
}
