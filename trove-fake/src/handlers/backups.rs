use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use trove_common::CreateBackupRequest;

use crate::error::ApiResult;
use crate::store::Transition;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/backups", get(list_backups).post(create_backup))
        .route("/backups/{id}", get(show_backup).delete(delete_backup))
}

#[derive(Deserialize)]
pub struct BackupEnvelope {
    pub backup: CreateBackupRequest,
}

#[derive(Debug, Default, Deserialize)]
pub struct BackupFilter {
    pub datastore: Option<String>,
    pub instance_id: Option<String>,
}

pub async fn list_backups(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BackupFilter>,
) -> Json<Value> {
    let store = state.store.lock().await;
    let backups: Vec<Value> = store
        .backups
        .values()
        .filter(|b| {
            filter
                .datastore
                .as_deref()
                .map_or(true, |ds| b.datastore.kind.eq_ignore_ascii_case(ds))
        })
        .filter(|b| {
            filter
                .instance_id
                .as_deref()
                .map_or(true, |id| b.instance_id == id)
        })
        .map(|b| b.to_json())
        .collect();
    Json(json!({ "backups": backups }))
}

pub async fn create_backup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BackupEnvelope>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut store = state.store.lock().await;
    let backup = store.create_backup(body.backup)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "backup": backup.to_json() }))))
}

pub async fn show_backup(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let backup = store.observe_backup(&id, state.config.settle_polls)?;
    Ok(Json(json!({ "backup": backup.to_json() })))
}

/// The backup keeps its status until it disappears.
pub async fn delete_backup(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    store.backup(&id)?;
    if let Some(backup) = store.backups.get_mut(&id) {
        tracing::info!("[fake] deleting backup {}", id);
        let status = backup.lifecycle.status().to_string();
        backup.lifecycle.restart(&status, [Transition::Remove]);
    }
    Ok(StatusCode::ACCEPTED)
}
