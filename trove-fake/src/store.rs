use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

use trove_common::{
    CreateBackupRequest, CreateInstanceRequest, Database, Datastore, DatastoreRef, Flavor, User,
    Volume,
};

use crate::error::ApiError;

// --- Status lifecycle ---

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Status(&'static str),
    Remove,
}

/// Status plus the transitions still to come. Every stage is applied after
/// `settle` status reads, which is how asynchronous work is simulated.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    status: String,
    stages: VecDeque<Transition>,
    reads: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Present(String),
    Removed,
}

impl Lifecycle {
    pub fn new(status: &str, stages: impl IntoIterator<Item = Transition>) -> Self {
        Self {
            status: status.to_string(),
            stages: stages.into_iter().collect(),
            reads: 0,
        }
    }

    pub fn restart(&mut self, status: &str, stages: impl IntoIterator<Item = Transition>) {
        *self = Self::new(status, stages);
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_settled(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn observe(&mut self, settle: u32) -> Observed {
        if self.stages.is_empty() {
            return Observed::Present(self.status.clone());
        }
        self.reads += 1;
        if self.reads >= settle {
            self.reads = 0;
            match self.stages.pop_front() {
                Some(Transition::Status(next)) => self.status = next.to_string(),
                Some(Transition::Remove) => return Observed::Removed,
                None => {}
            }
        }
        Observed::Present(self.status.clone())
    }
}

// --- Resources ---

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub password: String,
    pub host: String,
    pub databases: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct FakeInstance {
    pub id: String,
    pub name: String,
    pub lifecycle: Lifecycle,
    pub flavor_ref: String,
    pub datastore: DatastoreRef,
    pub volume: Volume,
    pub databases: BTreeSet<String>,
    pub users: BTreeMap<String, FakeUser>,
    pub root_ever_enabled: bool,
    pub restored_from: Option<String>,
}

impl FakeInstance {
    pub fn database_list(&self) -> Vec<Database> {
        self.databases.iter().map(Database::named).collect()
    }

    pub fn user_list(&self) -> Vec<User> {
        self.users
            .iter()
            .map(|(name, user)| User {
                name: name.clone(),
                host: Some(user.host.clone()),
                databases: user.databases.iter().map(Database::named).collect(),
            })
            .collect()
    }

    pub fn to_json(&self, ip: &str) -> Value {
        let mut body = json!({
            "id": self.id,
            "name": self.name,
            "status": self.lifecycle.status(),
            "flavor": { "id": self.flavor_ref },
            "datastore": self.datastore,
            "volume": self.volume,
            "region": "RegionOne",
        });
        if self.lifecycle.status() == "ACTIVE" {
            body["ip"] = json!([ip]);
        }
        body
    }
}

#[derive(Debug, Clone)]
pub struct FakeBackup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub instance_id: String,
    pub parent_id: Option<String>,
    pub lifecycle: Lifecycle,
    pub datastore: DatastoreRef,
    // Creation order; ids are random.
    pub seq: u64,
    // What a restore from this backup brings back.
    pub databases: BTreeSet<String>,
    pub users: BTreeMap<String, FakeUser>,
}

impl FakeBackup {
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "status": self.lifecycle.status(),
            "instance_id": self.instance_id,
            "parent_id": self.parent_id,
            "datastore": self.datastore,
            "size": 0.1,
        })
    }
}

// --- Store ---

#[derive(Debug, Default)]
pub struct Store {
    pub instances: BTreeMap<String, FakeInstance>,
    pub backups: BTreeMap<String, FakeBackup>,
    next_seq: u64,
}

impl Store {
    pub fn instance(&self, id: &str) -> Result<&FakeInstance, ApiError> {
        self.instances
            .get(id)
            .ok_or_else(|| ApiError::not_found(format!("Instance {} could not be found.", id)))
    }

    pub fn instance_mut(&mut self, id: &str) -> Result<&mut FakeInstance, ApiError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("Instance {} could not be found.", id)))
    }

    /// Status read of an instance; advances its lifecycle.
    pub fn observe_instance(&mut self, id: &str, settle: u32) -> Result<&FakeInstance, ApiError> {
        let observed = self.instance_mut(id)?.lifecycle.observe(settle);
        if observed == Observed::Removed {
            self.instances.remove(id);
            tracing::info!("[fake] instance {} removed", id);
        }
        self.instance(id)
    }

    pub fn backup(&self, id: &str) -> Result<&FakeBackup, ApiError> {
        self.backups
            .get(id)
            .ok_or_else(|| ApiError::not_found(format!("Backup {} could not be found.", id)))
    }

    pub fn observe_backup(&mut self, id: &str, settle: u32) -> Result<&FakeBackup, ApiError> {
        let backup = self
            .backups
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("Backup {} could not be found.", id)))?;
        if backup.lifecycle.observe(settle) == Observed::Removed {
            self.backups.remove(id);
            tracing::info!("[fake] backup {} removed", id);
        }
        self.backup(id)
    }

    pub fn create_instance(
        &mut self,
        req: CreateInstanceRequest,
        flavors: &[Flavor],
        datastores: &[Datastore],
    ) -> Result<&FakeInstance, ApiError> {
        if req.name.trim().is_empty() {
            return Err(ApiError::bad_request("Instance name must not be empty."));
        }
        if !flavors.iter().any(|f| f.id_string() == req.flavor_ref) {
            return Err(ApiError::not_found(format!(
                "Flavor {} could not be found.",
                req.flavor_ref
            )));
        }
        let datastore = find_datastore(datastores, &req.datastore.kind)?;
        let version = match &req.datastore.version {
            Some(v) => datastore
                .versions
                .iter()
                .find(|dv| &dv.name == v || &dv.id == v)
                .map(|dv| dv.name.clone())
                .ok_or_else(|| {
                    ApiError::not_found(format!("Datastore version {} could not be found.", v))
                })?,
            None => datastore.default_version.clone().unwrap_or_default(),
        };
        let volume = req.volume.unwrap_or(Volume { size: 1 });
        if volume.size == 0 {
            return Err(ApiError::bad_request("Volume size must be positive."));
        }

        let mut databases: BTreeSet<String> = req.databases.iter().map(|d| d.name.clone()).collect();
        let mut users: BTreeMap<String, FakeUser> = req
            .users
            .iter()
            .map(|u| {
                (
                    u.name.clone(),
                    FakeUser {
                        password: u.password.clone(),
                        host: "%".to_string(),
                        databases: u.databases.iter().map(|d| d.name.clone()).collect(),
                    },
                )
            })
            .collect();

        let restored_from = match &req.restore_point {
            Some(point) => {
                let backup = self.backup(&point.backup_ref)?;
                if backup.lifecycle.status() != "COMPLETED" {
                    return Err(ApiError::bad_request(format!(
                        "Backup {} is not COMPLETED (status {}).",
                        backup.id,
                        backup.lifecycle.status()
                    )));
                }
                databases.extend(backup.databases.iter().cloned());
                users.extend(backup.users.clone());
                Some(backup.id.clone())
            }
            None => None,
        };

        let id = Uuid::new_v4().to_string();
        let instance = FakeInstance {
            id: id.clone(),
            name: req.name,
            lifecycle: Lifecycle::new("BUILD", [Transition::Status("ACTIVE")]),
            flavor_ref: req.flavor_ref,
            datastore: DatastoreRef {
                kind: datastore.name.clone(),
                version: Some(version),
            },
            volume,
            databases,
            users,
            root_ever_enabled: false,
            restored_from,
        };
        tracing::info!("[fake] instance {} ({}) created", id, instance.name);
        self.instances.insert(id.clone(), instance);
        self.instance(&id)
    }

    pub fn create_backup(&mut self, req: CreateBackupRequest) -> Result<&FakeBackup, ApiError> {
        let seq = self.next_seq + 1;
        let instance = self.instance(&req.instance)?;
        if instance.lifecycle.status() != "ACTIVE" {
            return Err(ApiError::unprocessable(format!(
                "Instance {} is not ready (status {}).",
                instance.id,
                instance.lifecycle.status()
            )));
        }
        let parent_id = match (&req.parent_id, req.incremental) {
            (Some(parent), _) => Some(self.backup(parent)?.id.clone()),
            // Incremental without an explicit parent chains onto the newest backup.
            (None, 1) => self
                .backups
                .values()
                .filter(|b| b.instance_id == req.instance)
                .max_by_key(|b| b.seq)
                .map(|b| b.id.clone()),
            (None, _) => None,
        };

        let id = Uuid::new_v4().to_string();
        let backup = FakeBackup {
            id: id.clone(),
            name: req.name,
            description: req.description,
            instance_id: instance.id.clone(),
            parent_id,
            lifecycle: Lifecycle::new(
                "NEW",
                [
                    Transition::Status("BUILDING"),
                    Transition::Status("COMPLETED"),
                ],
            ),
            datastore: instance.datastore.clone(),
            seq,
            databases: instance.databases.clone(),
            users: instance.users.clone(),
        };
        tracing::info!("[fake] backup {} of instance {} created", id, backup.instance_id);
        self.next_seq = seq;
        self.backups.insert(id.clone(), backup);
        self.backup(&id)
    }
}

pub fn find_datastore<'a>(datastores: &'a [Datastore], key: &str) -> Result<&'a Datastore, ApiError> {
    datastores
        .iter()
        .find(|d| d.id == key || d.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| ApiError::not_found(format!("Datastore '{}' cannot be found.", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakeConfig;
    use trove_common::{RestorePoint, UserSpec};

    fn request(name: &str) -> CreateInstanceRequest {
        CreateInstanceRequest {
            name: name.to_string(),
            flavor_ref: "1".to_string(),
            volume: Some(Volume { size: 1 }),
            datastore: DatastoreRef {
                kind: "MySQL".to_string(),
                version: None,
            },
            availability_zone: None,
            databases: vec![Database::named("app")],
            users: vec![UserSpec {
                name: "alice".to_string(),
                password: "pw".to_string(),
                databases: vec![Database::named("app")],
            }],
            restore_point: None,
        }
    }

    #[test]
    fn lifecycle_applies_stages_after_settle_reads() {
        let mut lc = Lifecycle::new("BUILD", [Transition::Status("ACTIVE")]);
        assert_eq!(lc.observe(2), Observed::Present("BUILD".to_string()));
        assert_eq!(lc.observe(2), Observed::Present("ACTIVE".to_string()));
        assert!(lc.is_settled());
        assert_eq!(lc.observe(2), Observed::Present("ACTIVE".to_string()));

        let mut lc = Lifecycle::new("SHUTDOWN", [Transition::Remove]);
        assert_eq!(lc.observe(1), Observed::Removed);
    }

    #[test]
    fn restore_copies_backup_contents() {
        let config = FakeConfig::default();
        let mut store = Store::default();
        let source = store
            .create_instance(request("source"), &config.flavors, &config.datastores)
            .unwrap()
            .id
            .clone();
        store.observe_instance(&source, 1).unwrap();

        let backup = store
            .create_backup(CreateBackupRequest {
                instance: source.clone(),
                name: "b".to_string(),
                description: None,
                parent_id: None,
                incremental: 0,
            })
            .unwrap()
            .id
            .clone();

        let mut restore = request("restored");
        restore.databases.clear();
        restore.users.clear();
        restore.restore_point = Some(RestorePoint {
            backup_ref: backup.clone(),
        });
        // Not COMPLETED yet.
        assert!(store
            .create_instance(restore.clone(), &config.flavors, &config.datastores)
            .is_err());

        store.observe_backup(&backup, 1).unwrap();
        store.observe_backup(&backup, 1).unwrap();
        let restored = store
            .create_instance(restore, &config.flavors, &config.datastores)
            .unwrap();
        assert_eq!(restored.database_list(), vec![Database::named("app")]);
        assert_eq!(restored.user_list()[0].name, "alice");
        assert_eq!(restored.restored_from.as_deref(), Some(backup.as_str()));
    }

    #[test]
    fn unknown_flavor_and_datastore_are_rejected() {
        let config = FakeConfig::default();
        let mut store = Store::default();
        let mut req = request("x");
        req.flavor_ref = "999".to_string();
        let err = store
            .create_instance(req, &config.flavors, &config.datastores)
            .unwrap_err();
        assert_eq!(err.status.as_u16(), 404);

        let mut req = request("x");
        req.datastore.kind = "cassandra".to_string();
        assert!(store
            .create_instance(req, &config.flavors, &config.datastores)
            .is_err());
    }
}
