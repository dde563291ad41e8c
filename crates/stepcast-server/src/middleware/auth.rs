//! Bearer authentication middleware.
//!
//! Every session-scoped route sits behind this layer. A request only reaches
//! its handler with a resolved [`Identity`] of an existing user in its
//! extensions.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use stepcast_core::{Error, Identity};

use crate::error::ApiError;
use crate::state::AppState;

/// Authentication middleware for axum
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| Error::auth("Authorization header missing or invalid"))
        })
        .transpose()?;

    let identity: Identity = state.auth.authenticate(header_value)?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
