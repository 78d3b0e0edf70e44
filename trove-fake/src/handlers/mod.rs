use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

pub mod backups;
pub mod catalog;
pub mod identity;
pub mod instances;
pub mod users;

/// Reject tenant API calls that do not carry the issued token.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get("X-Auth-Token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|t| t == state.config.token);

    if !authorized {
        tracing::debug!("[fake] rejected {} {}", req.method(), req.uri().path());
        return ApiError::unauthorized().into_response();
    }
    next.run(req).await
}
