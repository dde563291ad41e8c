//! Session routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use stepcast_core::db::{ExtensionEvent, Feedback, Session};
use stepcast_core::session::capture_description;
use stepcast_core::Identity;

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Create session router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/from-extension", post(create_from_extension))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/process", post(process_session))
        .route(
            "/sessions/{id}/feedback",
            get(list_feedback).post(add_feedback),
        )
        .route("/sessions/{id}/extension-events", get(list_extension_events))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSessionRequest {
    pub name: Option<String>,
}

/// Create a new session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let name = req.name.as_deref().unwrap_or_default();
    let session = state.sessions.create_session(&identity.user_id, name)?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FromExtensionRequest {
    pub url: Option<String>,
    pub steps: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct FromExtensionResponse {
    pub session: Session,
    pub event: ExtensionEvent,
    pub description: String,
}

/// Create a session from a browser capture
pub async fn create_from_extension(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<FromExtensionRequest>,
) -> Result<(StatusCode, Json<FromExtensionResponse>), ApiError> {
    let url = req.url.as_deref().unwrap_or_default();
    let (session, event) =
        state
            .sessions
            .create_session_from_capture(&identity.user_id, url, req.steps)?;
    Ok((
        StatusCode::CREATED,
        Json(FromExtensionResponse {
            session,
            event,
            description: capture_description(url),
        }),
    ))
}

/// List the caller's sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.sessions.list_sessions(&identity.user_id)?))
}

/// Get a single session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.get_session(&id, &identity.user_id)?))
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    pub session: Session,
}

/// Run AI generation for a pending session
pub async fn process_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let session = state.sessions.process_session(&id, &identity.user_id).await?;
    Ok(Json(ProcessResponse {
        message: "Session processed".to_string(),
        session,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackRequest {
    pub text: Option<String>,
}

/// Attach feedback to a session
pub async fn add_feedback(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    let text = req.text.as_deref().unwrap_or_default();
    let feedback = state.sessions.add_feedback(&id, &identity.user_id, text)?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// List feedback for a session
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    Ok(Json(state.sessions.list_feedback(&id, &identity.user_id)?))
}

/// List captures recorded for a session
pub async fn list_extension_events(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ExtensionEvent>>, ApiError> {
    Ok(Json(
        state
            .sessions
            .list_extension_events(&id, &identity.user_id)?,
    ))
}
