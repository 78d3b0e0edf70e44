use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Keystone v3 password authentication with project scope. Answers 201
/// with the token in `X-Subject-Token` and a one-service catalog.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let config = &state.config;
    let field = |pointer: &str| body.pointer(pointer).and_then(Value::as_str);

    let username = field("/auth/identity/password/user/name");
    let password = field("/auth/identity/password/user/password");
    let project = field("/auth/scope/project/name");

    if username != Some(config.username.as_str())
        || password != Some(config.password.as_str())
        || project != Some(config.project_name.as_str())
    {
        tracing::debug!("[fake] authentication refused for {:?}", username);
        return Err(ApiError::unauthorized());
    }

    let endpoint = |interface: &str| {
        json!({
            "interface": interface,
            "region": config.region,
            "region_id": config.region,
            "url": state.service_url(),
        })
    };
    let token = json!({
        "token": {
            "methods": ["password"],
            "expires_at": "2099-01-01T00:00:00.000000Z",
            "project": { "id": config.project_id, "name": config.project_name },
            "user": { "name": config.username },
            "catalog": [{
                "type": "database",
                "name": "trove",
                "endpoints": [endpoint("public"), endpoint("internal"), endpoint("admin")]
            }]
        }
    });

    let mut response = (StatusCode::CREATED, Json(token)).into_response();
    let header = HeaderValue::from_str(&config.token)
        .map_err(|_| ApiError::bad_request("Configured token is not a valid header value."))?;
    response.headers_mut().insert("X-Subject-Token", header);
    tracing::info!("[fake] issued token for {}", config.username);
    Ok(response)
}
