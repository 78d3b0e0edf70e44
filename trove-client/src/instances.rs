use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::borrow::Cow;

use crate::error::ClientError;
use crate::rest::{ResponseBody, RestClient};
use trove_common::{
    Backup, CreateInstanceRequest, Database, Instance, RootCredentials, RootStatus, User, UserSpec,
};

/// Instance collection of the database API and its nested sub-resources
/// (databases, users, user access, root, per-instance backups).
#[derive(Clone, Debug)]
pub struct InstancesClient {
    rest: RestClient,
}

impl InstancesClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// List all available instances.
    pub async fn list_db_instances(
        &self,
        params: &[(String, String)],
    ) -> Result<Vec<Instance>, ClientError> {
        self.rest
            .get_with_query("instances", params, StatusCode::OK)
            .await?
            .field("instances")
    }

    pub async fn create_db_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Instance, ClientError> {
        tracing::info!(
            "[Trove API] creating instance {} (flavor={}, datastore={})",
            request.name,
            request.flavor_ref,
            request.datastore.kind
        );
        self.rest
            .post("instances", &json!({ "instance": request }), StatusCode::OK)
            .await?
            .field("instance")
    }

    pub async fn show_db_instance(&self, instance_id: &str) -> Result<Instance, ClientError> {
        self.rest
            .get(&format!("instances/{}", instance_id), StatusCode::OK)
            .await?
            .field("instance")
    }

    /// Update mutable instance attributes such as `name`.
    pub async fn update_db_instance(
        &self,
        instance_id: &str,
        fields: Map<String, Value>,
    ) -> Result<ResponseBody, ClientError> {
        self.rest
            .patch(
                &format!("instances/{}", instance_id),
                &json!({ "instance": fields }),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn action(
        &self,
        instance_id: &str,
        action_name: &str,
        args: Map<String, Value>,
    ) -> Result<ResponseBody, ClientError> {
        let mut body = Map::new();
        body.insert(action_name.to_string(), Value::Object(args));
        self.rest
            .post(
                &format!("instances/{}/action", instance_id),
                &Value::Object(body),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn restart_db_instance(&self, instance_id: &str) -> Result<ResponseBody, ClientError> {
        self.action(instance_id, "restart", Map::new()).await
    }

    pub async fn upgrade_db_instance(
        &self,
        instance_id: &str,
        datastore_version: &str,
    ) -> Result<ResponseBody, ClientError> {
        tracing::info!(
            "[Trove API] upgrading instance {} to datastore version {}",
            instance_id,
            datastore_version
        );
        self.rest
            .patch(
                &format!("instances/{}", instance_id),
                &json!({ "instance": { "datastore_version": datastore_version } }),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn delete_db_instance(&self, instance_id: &str) -> Result<ResponseBody, ClientError> {
        tracing::info!("[Trove API] deleting instance {}", instance_id);
        self.rest
            .delete(&format!("instances/{}", instance_id), StatusCode::ACCEPTED)
            .await
    }

    // --- Databases ---

    pub async fn list_databases(&self, instance_id: &str) -> Result<Vec<Database>, ClientError> {
        self.rest
            .get(&format!("instances/{}/databases", instance_id), StatusCode::OK)
            .await?
            .field("databases")
    }

    pub async fn create_database(
        &self,
        instance_id: &str,
        name: &str,
    ) -> Result<ResponseBody, ClientError> {
        self.rest
            .post(
                &format!("instances/{}/databases", instance_id),
                &json!({ "databases": [Database::named(name)] }),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn delete_database(
        &self,
        instance_id: &str,
        name: &str,
    ) -> Result<ResponseBody, ClientError> {
        self.rest
            .delete(
                &format!("instances/{}/databases/{}", instance_id, segment(name)),
                StatusCode::ACCEPTED,
            )
            .await
    }

    // --- Root ---

    /// Whether root has *ever* been enabled on the instance.
    pub async fn root_show(&self, instance_id: &str) -> Result<RootStatus, ClientError> {
        let resp = self
            .rest
            .get(&format!("instances/{}/root", instance_id), StatusCode::OK)
            .await?;
        Ok(serde_json::from_value(resp.into_value())?)
    }

    pub async fn root_enable(&self, instance_id: &str) -> Result<RootCredentials, ClientError> {
        let resp = self
            .rest
            .post(
                &format!("instances/{}/root", instance_id),
                &json!({}),
                StatusCode::OK,
            )
            .await?;
        Ok(serde_json::from_value(resp.into_value())?)
    }

    pub async fn root_disable(&self, instance_id: &str) -> Result<ResponseBody, ClientError> {
        self.rest
            .delete(
                &format!("instances/{}/root", instance_id),
                StatusCode::NO_CONTENT,
            )
            .await
    }

    // --- Users ---

    pub async fn list_users(&self, instance_id: &str) -> Result<Vec<User>, ClientError> {
        self.rest
            .get(&format!("instances/{}/users", instance_id), StatusCode::OK)
            .await?
            .field("users")
    }

    pub async fn show_user(&self, instance_id: &str, name: &str) -> Result<User, ClientError> {
        self.rest
            .get(
                &format!("instances/{}/users/{}", instance_id, segment(name)),
                StatusCode::OK,
            )
            .await?
            .field("user")
    }

    pub async fn create_user(
        &self,
        instance_id: &str,
        name: &str,
        password: &str,
        databases: &[&str],
    ) -> Result<ResponseBody, ClientError> {
        let user = UserSpec {
            name: name.to_string(),
            password: password.to_string(),
            databases: databases.iter().map(|db| Database::named(*db)).collect(),
        };
        self.rest
            .post(
                &format!("instances/{}/users", instance_id),
                &json!({ "users": [user] }),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn update_user(
        &self,
        instance_id: &str,
        name: &str,
        fields: Map<String, Value>,
    ) -> Result<ResponseBody, ClientError> {
        self.rest
            .put(
                &format!("instances/{}/users/{}", instance_id, segment(name)),
                &json!({ "user": fields }),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn delete_user(&self, instance_id: &str, name: &str) -> Result<ResponseBody, ClientError> {
        self.rest
            .delete(
                &format!("instances/{}/users/{}", instance_id, segment(name)),
                StatusCode::ACCEPTED,
            )
            .await
    }

    // --- User access ---

    pub async fn grant_user_access(
        &self,
        instance_id: &str,
        name: &str,
        databases: &[&str],
    ) -> Result<ResponseBody, ClientError> {
        let databases: Vec<Database> = databases.iter().map(|db| Database::named(*db)).collect();
        self.rest
            .put(
                &format!("instances/{}/users/{}/databases", instance_id, segment(name)),
                &json!({ "databases": databases }),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn revoke_user_access(
        &self,
        instance_id: &str,
        name: &str,
        database: &str,
    ) -> Result<ResponseBody, ClientError> {
        self.rest
            .delete(
                &format!(
                    "instances/{}/users/{}/databases/{}",
                    instance_id,
                    segment(name),
                    segment(database)
                ),
                StatusCode::ACCEPTED,
            )
            .await
    }

    pub async fn show_user_access(
        &self,
        instance_id: &str,
        name: &str,
    ) -> Result<Vec<Database>, ClientError> {
        self.rest
            .get(
                &format!("instances/{}/users/{}/databases", instance_id, segment(name)),
                StatusCode::OK,
            )
            .await?
            .field("databases")
    }

    /// Backups taken of this instance.
    pub async fn list_backups(&self, instance_id: &str) -> Result<Vec<Backup>, ClientError> {
        self.rest
            .get(&format!("instances/{}/backups", instance_id), StatusCode::OK)
            .await?
            .field("backups")
    }
}

/// User and database names may contain `@`, `%` or `/`.
fn segment(name: &str) -> Cow<'_, str> {
    urlencoding::encode(name)
}

#[cfg(test)]
mod tests {
    use super::segment;

    #[test]
    fn names_are_encoded_as_single_segments() {
        assert_eq!(segment("app_user"), "app_user");
        assert_eq!(segment("bob@10.0.%"), "bob%4010.0.%25");
        assert_eq!(segment("a/b?c#d"), "a%2Fb%3Fc%23d");
    }
}
