use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use trove_common::{CreateInstanceRequest, Database};

use crate::error::{ApiError, ApiResult};
use crate::store::{find_datastore, Transition};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/instances", get(list_instances).post(create_instance))
        .route(
            "/instances/{id}",
            get(show_instance).patch(update_instance).delete(delete_instance),
        )
        .route("/instances/{id}/action", post(instance_action))
        .route(
            "/instances/{id}/databases",
            get(list_databases).post(create_databases),
        )
        .route(
            "/instances/{id}/databases/{name}",
            axum::routing::delete(delete_database),
        )
        .route(
            "/instances/{id}/root",
            get(root_show).post(root_enable).delete(root_disable),
        )
        .route("/instances/{id}/backups", get(list_instance_backups))
}

#[derive(Deserialize)]
pub struct InstanceEnvelope<T> {
    pub instance: T,
}

#[derive(Deserialize)]
pub struct DatabasesEnvelope {
    pub databases: Vec<Database>,
}

pub async fn list_instances(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.lock().await;
    let instances: Vec<Value> = store
        .instances
        .values()
        .map(|i| i.to_json(&state.config.instance_ip))
        .collect();
    Json(json!({ "instances": instances }))
}

pub async fn create_instance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InstanceEnvelope<CreateInstanceRequest>>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let instance = store.create_instance(
        body.instance,
        &state.config.flavors,
        &state.config.datastores,
    )?;
    Ok(Json(json!({ "instance": instance.to_json(&state.config.instance_ip) })))
}

pub async fn show_instance(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let instance = store.observe_instance(&id, state.config.settle_polls)?;
    Ok(Json(json!({ "instance": instance.to_json(&state.config.instance_ip) })))
}

/// Rename and/or upgrade the datastore version.
pub async fn update_instance(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
    Json(body): Json<InstanceEnvelope<Map<String, Value>>>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;

    if let Some(version) = body.instance.get("datastore_version").and_then(Value::as_str) {
        if !instance.lifecycle.is_settled() {
            return Err(ApiError::unprocessable(format!(
                "Instance {} is busy (status {}).",
                id,
                instance.lifecycle.status()
            )));
        }
        let datastore = find_datastore(&state.config.datastores, &instance.datastore.kind)?;
        let target = datastore
            .versions
            .iter()
            .find(|v| v.name == version || v.id == version)
            .ok_or_else(|| {
                ApiError::not_found(format!("Datastore version {} could not be found.", version))
            })?;
        tracing::info!("[fake] upgrading instance {} to {}", id, target.name);
        instance.datastore.version = Some(target.name.clone());
        instance
            .lifecycle
            .restart("UPGRADE", [Transition::Status("ACTIVE")]);
    }
    if let Some(name) = body.instance.get("name").and_then(Value::as_str) {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Instance name must not be empty."));
        }
        instance.name = name.to_string();
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn delete_instance(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    tracing::info!("[fake] deleting instance {}", id);
    instance.lifecycle.restart("SHUTDOWN", [Transition::Remove]);
    Ok(StatusCode::ACCEPTED)
}

pub async fn instance_action(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    if instance.lifecycle.status() != "ACTIVE" {
        return Err(ApiError::unprocessable(format!(
            "Instance {} is not ready (status {}).",
            id,
            instance.lifecycle.status()
        )));
    }

    let name = body
        .keys()
        .next()
        .ok_or_else(|| ApiError::bad_request("Missing action."))?;
    match name.as_str() {
        "restart" => {
            instance
                .lifecycle
                .restart("REBOOT", [Transition::Status("ACTIVE")]);
        }
        other => return Err(ApiError::bad_request(format!("Unknown action '{}'.", other))),
    }
    tracing::info!("[fake] instance {} action {}", id, name);
    Ok(StatusCode::ACCEPTED)
}

// --- Databases ---

pub async fn list_databases(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let store = state.store.lock().await;
    let instance = store.instance(&id)?;
    Ok(Json(json!({ "databases": instance.database_list() })))
}

pub async fn create_databases(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
    Json(body): Json<DatabasesEnvelope>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    if let Some(existing) = body
        .databases
        .iter()
        .find(|db| instance.databases.contains(&db.name))
    {
        return Err(ApiError::bad_request(format!(
            "A database with the name \"{}\" already exists.",
            existing.name
        )));
    }
    instance
        .databases
        .extend(body.databases.into_iter().map(|db| db.name));
    Ok(StatusCode::ACCEPTED)
}

pub async fn delete_database(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id, name)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    if !instance.databases.remove(&name) {
        return Err(ApiError::not_found(format!("Database {} could not be found.", name)));
    }
    for user in instance.users.values_mut() {
        user.databases.remove(&name);
    }
    Ok(StatusCode::ACCEPTED)
}

// --- Root ---

pub async fn root_show(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let store = state.store.lock().await;
    let instance = store.instance(&id)?;
    Ok(Json(json!({ "rootEnabled": instance.root_ever_enabled })))
}

pub async fn root_enable(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    instance.root_ever_enabled = true;
    let password = Uuid::new_v4().simple().to_string();
    Ok(Json(json!({ "user": { "name": "root", "password": password } })))
}

/// Disabling root does not reset the "ever enabled" flag.
pub async fn root_disable(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let store = state.store.lock().await;
    let instance = store.instance(&id)?;
    if !instance.root_ever_enabled {
        return Err(ApiError::not_found(format!(
            "The root user is not enabled on instance {}.",
            id
        )));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn list_instance_backups(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let store = state.store.lock().await;
    store.instance(&id)?;
    let backups: Vec<Value> = store
        .backups
        .values()
        .filter(|b| b.instance_id == id)
        .map(|b| b.to_json())
        .collect();
    Ok(Json(json!({ "backups": backups })))
}
