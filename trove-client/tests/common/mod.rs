// Shared fixtures: every test gets its own fake service, since a server
// spawned on one test runtime dies with it.
#![allow(dead_code)]

use trove_client::{waiters, TroveClients};
use trove_common::{CreateInstanceRequest, DatastoreRef, Instance, Settings, Volume};
use trove_fake::{FakeConfig, FakeTrove};

pub fn settings_for(fake: &FakeTrove, extra: &[(&str, &str)]) -> Settings {
    let mut vars: Vec<(String, String)> = fake.endpoint_env();
    vars.push(("TROVE_BUILD_INTERVAL".to_string(), "0".to_string()));
    vars.push(("TROVE_BUILD_TIMEOUT".to_string(), "10".to_string()));
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Settings::from_lookup(|key| {
        vars.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("valid test settings")
}

/// A fake that moves to the next status on every read.
pub async fn fake() -> FakeTrove {
    trove_fake::spawn(FakeConfig {
        settle_polls: 1,
        ..FakeConfig::default()
    })
    .await
    .expect("fake service starts")
}

pub async fn clients(fake: &FakeTrove) -> TroveClients {
    TroveClients::connect(&settings_for(fake, &[]))
        .await
        .expect("clients connect")
}

pub fn instance_request(name: &str) -> CreateInstanceRequest {
    CreateInstanceRequest {
        name: name.to_string(),
        flavor_ref: "1".to_string(),
        volume: Some(Volume { size: 1 }),
        datastore: DatastoreRef {
            kind: "MySQL".to_string(),
            version: None,
        },
        availability_zone: Some("nova".to_string()),
        databases: vec![],
        users: vec![],
        restore_point: None,
    }
}

/// Create an instance and wait until it is ACTIVE.
pub async fn active_instance(clients: &TroveClients, name: &str) -> Instance {
    let created = clients
        .instances
        .create_db_instance(&instance_request(name))
        .await
        .expect("instance created");
    waiters::wait_for_db_instance_status(&clients.instances, &created.id, "ACTIVE")
        .await
        .expect("instance becomes ACTIVE")
        .expect("instance snapshot")
}
