//! In-memory stand-in for the database service and the identity API it sits
//! behind. State lives in one mutex-guarded [`store::Store`]; asynchronous
//! provisioning is simulated by advancing a resource's lifecycle each time
//! its status is read.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use trove_common::{Datastore, DatastoreVersion, Flavor, Limit};

pub mod error;
pub mod handlers;
pub mod store;

pub use error::{ApiError, ApiResult};
use store::Store;

pub const API_VERSION: &str = "v1.0";

#[derive(Debug, Clone)]
pub struct FakeConfig {
    pub project_id: String,
    pub project_name: String,
    pub username: String,
    pub password: String,
    pub token: String,
    pub region: String,
    /// Status reads between two lifecycle stages.
    pub settle_polls: u32,
    /// Address reported for ACTIVE instances.
    pub instance_ip: String,
    pub flavors: Vec<Flavor>,
    pub datastores: Vec<Datastore>,
    pub limits: Vec<Limit>,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            project_id: "2f1c0d3e5a6b4c7d8e9f0a1b2c3d4e5f".to_string(),
            project_name: "demo".to_string(),
            username: "demo".to_string(),
            password: "secret".to_string(),
            token: "fake-token".to_string(),
            region: "RegionOne".to_string(),
            settle_polls: 2,
            instance_ip: "127.0.0.1".to_string(),
            flavors: default_flavors(),
            datastores: default_datastores(),
            limits: default_limits(),
        }
    }
}

fn default_flavors() -> Vec<Flavor> {
    [("1", "m1.tiny", 512, 1), ("2", "m1.small", 2048, 1), ("3", "m1.medium", 4096, 2)]
        .into_iter()
        .map(|(id, name, ram, vcpus)| Flavor {
            id: json!(id),
            str_id: Some(id.to_string()),
            name: name.to_string(),
            ram: Some(ram),
            vcpus: Some(vcpus),
        })
        .collect()
}

fn default_datastores() -> Vec<Datastore> {
    let version = |id: &str, name: &str| DatastoreVersion {
        id: id.to_string(),
        name: name.to_string(),
        active: Some(true),
    };
    vec![
        Datastore {
            id: "a1b2c3d4-0000-4000-8000-00000000mysql".to_string(),
            name: "mysql".to_string(),
            default_version: Some("5.7".to_string()),
            versions: vec![
                version("d5b1c2a0-0000-4000-8000-000000000057", "5.7"),
                version("d5b1c2a0-0000-4000-8000-000000000080", "8.0"),
            ],
        },
        Datastore {
            id: "a1b2c3d4-0000-4000-8000-0000postgres".to_string(),
            name: "postgresql".to_string(),
            default_version: Some("12".to_string()),
            versions: vec![version("e6c2d3b1-0000-4000-8000-000000000012", "12")],
        },
    ]
}

fn default_limits() -> Vec<Limit> {
    let limit = |value: serde_json::Value| -> Option<Limit> { serde_json::from_value(value).ok() };
    [
        json!({"verb": "ABSOLUTE", "max_instances": 5, "max_backups": 50, "max_volumes": 20}),
        json!({"verb": "POST", "nextAvailable": "2026-01-01T00:00:00Z", "remaining": 200,
               "unit": "MINUTE", "value": 200, "regex": ".*", "uri": "*"}),
        json!({"verb": "GET", "nextAvailable": "2026-01-01T00:00:00Z", "remaining": 200,
               "unit": "MINUTE", "value": 200, "regex": ".*", "uri": "*"}),
    ]
    .into_iter()
    .filter_map(limit)
    .collect()
}

pub struct AppState {
    pub config: FakeConfig,
    /// `http://host:port`, without a trailing slash.
    pub public_url: String,
    pub store: Mutex<Store>,
}

impl AppState {
    pub fn service_url(&self) -> String {
        format!("{}/{}/{}", self.public_url, API_VERSION, self.config.project_id)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let tenant_api = Router::new()
        .merge(handlers::instances::routes())
        .merge(handlers::users::routes())
        .merge(handlers::backups::routes())
        .merge(handlers::catalog::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_token,
        ));

    Router::new()
        .route("/", get(handlers::catalog::list_versions))
        .route("/v3/auth/tokens", post(handlers::identity::issue_token))
        .nest("/v1.0/{tenant}", tenant_api)
        .with_state(state)
}

/// A running fake service. The server task is aborted on drop.
pub struct FakeTrove {
    pub addr: SocketAddr,
    /// Tenant-scoped database endpoint (`…/v1.0/<project_id>`).
    pub base_url: String,
    /// Identity v3 root (`…/v3`).
    pub auth_url: String,
    pub token: String,
    pub config: FakeConfig,
    server: JoinHandle<()>,
}

impl FakeTrove {
    /// Settings pointing straight at the service, bypassing identity.
    pub fn endpoint_env(&self) -> Vec<(String, String)> {
        vec![
            ("TROVE_ENDPOINT".to_string(), self.base_url.clone()),
            ("TROVE_AUTH_TOKEN".to_string(), self.token.clone()),
        ]
    }

    /// Settings that authenticate through the fake identity API.
    pub fn keystone_env(&self) -> Vec<(String, String)> {
        vec![
            ("OS_AUTH_URL".to_string(), self.auth_url.clone()),
            ("OS_USERNAME".to_string(), self.config.username.clone()),
            ("OS_PASSWORD".to_string(), self.config.password.clone()),
            ("OS_PROJECT_NAME".to_string(), self.config.project_name.clone()),
            ("OS_REGION_NAME".to_string(), self.config.region.clone()),
        ]
    }

    pub fn is_running(&self) -> bool {
        !self.server.is_finished()
    }
}

impl Drop for FakeTrove {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Bind `addr` and serve the fake in a background task.
pub async fn bind(config: FakeConfig, addr: SocketAddr) -> std::io::Result<FakeTrove> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let public_url = format!("http://{}", addr);

    let state = Arc::new(AppState {
        config: config.clone(),
        public_url: public_url.clone(),
        store: Mutex::new(Store::default()),
    });
    let base_url = state.service_url();
    let app = router(state);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("[fake] server stopped: {}", e);
        }
    });
    tracing::info!("[fake] listening on {} (endpoint {})", addr, base_url);

    Ok(FakeTrove {
        addr,
        base_url,
        auth_url: format!("{}/v3", public_url),
        token: config.token.clone(),
        config,
        server,
    })
}

/// Serve on an ephemeral localhost port.
pub async fn spawn(config: FakeConfig) -> std::io::Result<FakeTrove> {
    bind(config, SocketAddr::from(([127, 0, 0, 1], 0))).await
}
