//! Browser capture ingestion.

use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use stepcast_core::auth::require_owned;
use stepcast_core::db::ExtensionEvent;
use stepcast_core::{Error, Identity};

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Create extension event router
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/extension-events", post(create_extension_event))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtensionEventRequest {
    pub session_id: Option<String>,
    pub url: Option<String>,
    pub steps: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct ExtensionEventResponse {
    pub message: String,
    pub event: ExtensionEvent,
}

/// Append a capture to one of the caller's sessions
pub async fn create_extension_event(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<ExtensionEventRequest>,
) -> Result<(StatusCode, Json<ExtensionEventResponse>), ApiError> {
    let session_id = req.session_id.as_deref().unwrap_or_default();
    let url = req.url.as_deref().unwrap_or_default();

    if session_id.trim().is_empty() || url.trim().is_empty() {
        return Err(Error::validation("sessionId and url are required").into());
    }

    require_owned(state.sessions.store(), session_id, &identity.user_id)?;

    let event = state
        .sessions
        .record_extension_event(session_id, url, req.steps)?;

    Ok((
        StatusCode::CREATED,
        Json(ExtensionEventResponse {
            message: "Extension event stored".to_string(),
            event,
        }),
    ))
}
