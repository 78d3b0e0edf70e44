use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use trove_common::{Database, UserSpec};

use crate::error::{ApiError, ApiResult};
use crate::handlers::instances::DatabasesEnvelope;
use crate::store::{FakeInstance, FakeUser};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/instances/{id}/users",
            get(list_users).post(create_users),
        )
        .route(
            "/instances/{id}/users/{name}",
            get(show_user).put(update_user).delete(delete_user),
        )
        .route(
            "/instances/{id}/users/{name}/databases",
            get(show_access).put(grant_access),
        )
        .route(
            "/instances/{id}/users/{name}/databases/{database}",
            axum::routing::delete(revoke_access),
        )
}

#[derive(Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<UserSpec>,
}

#[derive(Deserialize)]
pub struct UserUpdate {
    pub user: UserFields,
}

#[derive(Deserialize)]
pub struct UserFields {
    pub name: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
}

fn user_mut<'a>(instance: &'a mut FakeInstance, name: &str) -> ApiResult<&'a mut FakeUser> {
    instance
        .users
        .get_mut(name)
        .ok_or_else(|| ApiError::not_found(format!("User {} cannot be found on the instance.", name)))
}

fn check_databases(instance: &FakeInstance, databases: &[Database]) -> ApiResult<()> {
    match databases.iter().find(|db| !instance.databases.contains(&db.name)) {
        Some(missing) => Err(ApiError::not_found(format!(
            "Database {} could not be found.",
            missing.name
        ))),
        None => Ok(()),
    }
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let store = state.store.lock().await;
    let instance = store.instance(&id)?;
    Ok(Json(json!({ "users": instance.user_list() })))
}

pub async fn create_users(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id)): Path<(String, String)>,
    Json(body): Json<UsersEnvelope>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    for spec in &body.users {
        if instance.users.contains_key(&spec.name) {
            return Err(ApiError::bad_request(format!(
                "A user with the name \"{}\" already exists.",
                spec.name
            )));
        }
        check_databases(instance, &spec.databases)?;
    }
    for spec in body.users {
        instance.users.insert(
            spec.name,
            FakeUser {
                password: spec.password,
                host: "%".to_string(),
                databases: spec.databases.into_iter().map(|db| db.name).collect(),
            },
        );
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn show_user(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id, name)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    let store = state.store.lock().await;
    let instance = store.instance(&id)?;
    let user = instance
        .user_list()
        .into_iter()
        .find(|u| u.name == name)
        .ok_or_else(|| ApiError::not_found(format!("User {} cannot be found on the instance.", name)))?;
    Ok(Json(json!({ "user": user })))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id, name)): Path<(String, String, String)>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    if let Some(new_name) = &body.user.name {
        if new_name != &name && instance.users.contains_key(new_name) {
            return Err(ApiError::bad_request(format!(
                "A user with the name \"{}\" already exists.",
                new_name
            )));
        }
    }

    let user = user_mut(instance, &name)?;
    if let Some(password) = body.user.password {
        user.password = password;
    }
    if let Some(host) = body.user.host {
        user.host = host;
    }
    if let Some(new_name) = body.user.name {
        if let Some(user) = instance.users.remove(&name) {
            instance.users.insert(new_name, user);
        }
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id, name)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    instance
        .users
        .remove(&name)
        .ok_or_else(|| ApiError::not_found(format!("User {} cannot be found on the instance.", name)))?;
    Ok(StatusCode::ACCEPTED)
}

// --- Access ---

pub async fn show_access(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id, name)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    let user = user_mut(instance, &name)?;
    let databases: Vec<Database> = user.databases.iter().map(Database::named).collect();
    Ok(Json(json!({ "databases": databases })))
}

pub async fn grant_access(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id, name)): Path<(String, String, String)>,
    Json(body): Json<DatabasesEnvelope>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    check_databases(instance, &body.databases)?;
    let granted: BTreeSet<String> = body.databases.into_iter().map(|db| db.name).collect();
    user_mut(instance, &name)?.databases.extend(granted);
    Ok(StatusCode::ACCEPTED)
}

pub async fn revoke_access(
    State(state): State<Arc<AppState>>,
    Path((_tenant, id, name, database)): Path<(String, String, String, String)>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.lock().await;
    let instance = store.instance_mut(&id)?;
    let user = user_mut(instance, &name)?;
    if !user.databases.remove(&database) {
        return Err(ApiError::not_found(format!(
            "User {} has no access to database {}.",
            name, database
        )));
    }
    Ok(StatusCode::ACCEPTED)
}
