use anyhow::{ensure, Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use tokio::net::TcpStream;

use trove_client::waiters;
use trove_common::{CreateInstanceRequest, Database, DatastoreRef, UserSpec, Volume};

use crate::harness::{Attr, Case, Fixture, Resource, Suite, SuiteContext};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn suite() -> Suite {
    Suite {
        name: "DatabaseScenarioTest",
        fixture: Fixture::SharedInstance {
            datastore_version: |_| None,
        },
        skip: None,
        cases: vec![
            Case {
                name: "test_list_instances",
                idempotent_id: "91d327ca-f982-4fd9-ae1b-191259f4d60b",
                attrs: &[],
                run: test_list_instances,
            },
            Case {
                name: "test_create_instances",
                idempotent_id: "970e5cb3-4ea6-46d2-b522-bd64721ef16c",
                attrs: &[Attr::Slow],
                run: test_create_instances,
            },
        ],
    }
}

/// Instance with one database and a user that can reach it.
fn db_instance(ctx: &SuiteContext) -> CreateInstanceRequest {
    let db = &ctx.settings.database;
    CreateInstanceRequest {
        name: "tempest-trove-inst".to_string(),
        flavor_ref: db.db_flavor_ref.clone(),
        volume: Some(Volume {
            size: db.volume_size,
        }),
        datastore: DatastoreRef {
            kind: db.datastore_type.clone(),
            version: db.datastore_version.clone(),
        },
        availability_zone: Some(db.availability_zone.clone()),
        databases: vec![Database::named("tempest_test")],
        users: vec![UserSpec {
            name: "tempest_username".to_string(),
            password: "tempest_password".to_string(),
            databases: vec![Database::named("tempest_test")],
        }],
        restore_point: None,
    }
}

/// The datastore port of the instance accepts TCP connections.
pub async fn check_db_connectivity(host: &str, port: u16) -> Result<()> {
    let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .with_context(|| format!("connecting to {}:{} timed out", host, port))?
        .with_context(|| format!("DB connectivity check failed for {}:{}", host, port))?;
    tracing::info!("[scenario] reached {:?}", stream.peer_addr().ok());
    Ok(())
}

fn test_list_instances(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let instances = ctx.clients.instances.list_db_instances(&[]).await?;
        ensure!(!instances.is_empty(), "No available instances found");
        for instance in &instances {
            ensure!(!instance.status.is_empty(), "instance {} has no status", instance.id);
        }
        ensure!(
            instances.iter().any(|i| i.id == id),
            "instance {} missing from the listing",
            id
        );
        Ok(())
    }
    .boxed()
}

fn test_create_instances(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let request = db_instance(ctx);
        let created = ctx.clients.instances.create_db_instance(&request).await?;
        ensure!(!created.id.is_empty(), "create returned no instance id");
        ctx.cleanups.push(Resource::Instance(created.id.clone()));

        let api = &ctx.clients.instances;
        waiters::wait_for_db_instance_status(api, &created.id, "ACTIVE").await?;
        let instance = api.show_db_instance(&created.id).await?;
        let ip = instance
            .ip
            .first()
            .with_context(|| format!("instance {} reports no address", instance.id))?;
        check_db_connectivity(ip, ctx.settings.database.db_port).await?;

        api.delete_db_instance(&created.id).await?;
        waiters::wait_for_db_instance_decommission(api, &created.id)
            .await
            .context("DB instance deletion failed")?;
        Ok(())
    }
    .boxed()
}
