use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod names;
pub mod settings;

pub use settings::{Settings, SettingsError};

/// Status a resource reports once it has been removed by the service.
pub const DELETE_COMPLETE: &str = "DELETE_COMPLETE";
pub const DEFAULT_FAILURE_PATTERN: &str = "^.*_ERROR$";

// --- Resource snapshots ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<DatastoreRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
    // Everything else the service returns (flavor, links, created, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Backup {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatastoreRef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Volume {
    pub size: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Database {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collate: Option<String>,
}

impl Database {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            character_set: None,
            collate: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub databases: Vec<Database>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RootStatus {
    #[serde(rename = "rootEnabled")]
    pub root_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RootCredentials {
    pub user: RootUser,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RootUser {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Datastore {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,
    #[serde(default)]
    pub versions: Vec<DatastoreVersion>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatastoreVersion {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Flavor {
    // Legacy deployments return integer ids; `str_id` is always a string.
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<u32>,
}

impl Flavor {
    pub fn id_string(&self) -> String {
        if let Some(str_id) = &self.str_id {
            return str_id.clone();
        }
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Limit {
    pub verb: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApiVersion {
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

// --- Request payloads ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreateInstanceRequest {
    pub name: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
    pub datastore: DatastoreRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub databases: Vec<Database>,
    #[serde(default)]
    pub users: Vec<UserSpec>,
    #[serde(
        rename = "restorePoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub restore_point: Option<RestorePoint>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RestorePoint {
    #[serde(rename = "backupRef")]
    pub backup_ref: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub databases: Vec<Database>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreateBackupRequest {
    pub instance: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    // The API takes 0/1 rather than a JSON boolean.
    #[serde(default)]
    pub incremental: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn instance_keeps_unknown_fields() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "i-1",
            "name": "db",
            "status": "BUILD",
            "flavor": {"id": "1"},
            "datastore": {"type": "mysql", "version": "5.7"},
            "volume": {"size": 1}
        }))
        .unwrap();

        assert_eq!(instance.datastore.as_ref().unwrap().kind, "mysql");
        assert_eq!(instance.extra["flavor"]["id"], "1");
        assert!(instance.ip.is_empty());
    }

    #[test]
    fn create_instance_request_uses_api_field_names() {
        let req = CreateInstanceRequest {
            name: "inst".to_string(),
            flavor_ref: "1".to_string(),
            volume: Some(Volume { size: 2 }),
            datastore: DatastoreRef {
                kind: "MySQL".to_string(),
                version: None,
            },
            availability_zone: Some("nova".to_string()),
            databases: vec![],
            users: vec![],
            restore_point: Some(RestorePoint {
                backup_ref: "b-1".to_string(),
            }),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["flavorRef"], "1");
        assert_eq!(value["datastore"]["type"], "MySQL");
        assert!(value["datastore"].get("version").is_none());
        assert_eq!(value["restorePoint"]["backupRef"], "b-1");
    }

    #[test]
    fn flavor_id_prefers_str_id() {
        let flavor: Flavor =
            serde_json::from_value(json!({"id": 7, "name": "m1.small"})).unwrap();
        assert_eq!(flavor.id_string(), "7");

        let flavor: Flavor =
            serde_json::from_value(json!({"id": 7, "str_id": "7a", "name": "x"})).unwrap();
        assert_eq!(flavor.id_string(), "7a");
    }
}
