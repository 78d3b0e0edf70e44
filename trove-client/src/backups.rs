use reqwest::StatusCode;
use serde_json::json;

use crate::error::ClientError;
use crate::rest::{ResponseBody, RestClient};
use trove_common::{Backup, CreateBackupRequest};

#[derive(Clone, Debug)]
pub struct BackupsClient {
    rest: RestClient,
}

impl BackupsClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// List all available backups, optionally filtered (e.g. `datastore`).
    pub async fn list_backups(&self, params: &[(String, String)]) -> Result<Vec<Backup>, ClientError> {
        self.rest
            .get_with_query("backups", params, StatusCode::OK)
            .await?
            .field("backups")
    }

    /// Create a full backup, or an incremental one on top of `parent`.
    pub async fn create_backup(
        &self,
        instance_id: &str,
        name: &str,
        description: Option<&str>,
        parent: Option<&str>,
        incremental: bool,
    ) -> Result<Backup, ClientError> {
        let request = CreateBackupRequest {
            instance: instance_id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            parent_id: parent.map(str::to_string),
            incremental: u8::from(incremental),
        };
        tracing::info!(
            "[Trove API] creating backup {} of instance {} (incremental={}, parent={:?})",
            name,
            instance_id,
            incremental,
            parent
        );
        self.rest
            .post("backups", &json!({ "backup": request }), StatusCode::ACCEPTED)
            .await?
            .field("backup")
    }

    pub async fn show_backup(&self, backup_id: &str) -> Result<Backup, ClientError> {
        self.rest
            .get(&format!("backups/{}", backup_id), StatusCode::OK)
            .await?
            .field("backup")
    }

    pub async fn delete_backup(&self, backup_id: &str) -> Result<ResponseBody, ClientError> {
        tracing::info!("[Trove API] deleting backup {}", backup_id);
        self.rest
            .delete(&format!("backups/{}", backup_id), StatusCode::ACCEPTED)
            .await
    }
}
