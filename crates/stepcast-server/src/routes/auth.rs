//! Signup and login routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use stepcast_core::auth::AuthSession;

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

/// Create auth router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn parts(&self) -> (&str, &str) {
        (
            self.email.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        )
    }
}

/// Register a new account
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let (email, password) = req.parts();
    let session = state.auth.signup(email, password).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Exchange credentials for a token
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    let (email, password) = req.parts();
    Ok(Json(state.auth.login(email, password).await?))
}
