use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::store::find_datastore;
use crate::{AppState, API_VERSION};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/datastores", get(list_datastores))
        .route("/datastores/{datastore}", get(show_datastore))
        .route("/datastores/{datastore}/versions", get(list_datastore_versions))
        .route("/flavors", get(list_flavors))
        .route("/flavors/{id}", get(show_flavor))
        .route("/limits", get(list_limits))
}

/// Served at the root, outside the tenant scope and without a token.
pub async fn list_versions(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "versions": [{
            "id": API_VERSION,
            "status": "CURRENT",
            "updated": "2012-08-01T00:00:00Z",
            "links": [{
                "rel": "self",
                "href": format!("{}/{}/", state.public_url, API_VERSION)
            }]
        }]
    }))
}

pub async fn list_datastores(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "datastores": state.config.datastores }))
}

pub async fn show_datastore(
    State(state): State<Arc<AppState>>,
    Path((_tenant, datastore)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let datastore = find_datastore(&state.config.datastores, &datastore)?;
    Ok(Json(json!({ "datastore": datastore })))
}

pub async fn list_datastore_versions(
    State(state): State<Arc<AppState>>,
    Path((_tenant, datastore)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let datastore = find_datastore(&state.config.datastores, &datastore)?;
    Ok(Json(json!({ "versions": datastore.versions })))
}

pub async fn list_flavors(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "flavors": state.config.flavors }))
}

pub async fn show_flavor(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let flavor = state
        .config
        .flavors
        .iter()
        .find(|f| f.id_string() == id)
        .ok_or_else(|| ApiError::not_found(format!("Flavor {} could not be found.", id)))?;
    Ok(Json(json!({ "flavor": flavor })))
}

pub async fn list_limits(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "limits": state.config.limits }))
}
