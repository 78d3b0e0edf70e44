use anyhow::{Context, Result};

use trove_client::{waiters, WaitError};
use trove_common::names::rand_name;
use trove_common::{CreateInstanceRequest, DatastoreRef, Instance, RestorePoint, Volume};

use crate::harness::{Resource, SuiteContext};

/// Instance request built from the configured flavor, volume, datastore and
/// availability zone.
pub fn instance_request(
    ctx: &SuiteContext,
    backup_id: Option<&str>,
    datastore_version: Option<&str>,
) -> CreateInstanceRequest {
    let db = &ctx.settings.database;
    CreateInstanceRequest {
        name: rand_name(&format!("{}-instance", ctx.suite)),
        flavor_ref: db.db_flavor_ref.clone(),
        volume: Some(Volume {
            size: db.volume_size,
        }),
        datastore: DatastoreRef {
            kind: db.datastore_type.clone(),
            version: datastore_version
                .map(str::to_string)
                .or_else(|| db.datastore_version.clone()),
        },
        availability_zone: Some(db.availability_zone.clone()),
        databases: vec![],
        users: vec![],
        restore_point: backup_id.map(|id| RestorePoint {
            backup_ref: id.to_string(),
        }),
    }
}

/// Create an instance, register it for suite cleanup and wait for ACTIVE.
pub async fn create_test_instance(
    ctx: &mut SuiteContext,
    backup_id: Option<&str>,
    datastore_version: Option<&str>,
) -> Result<Instance> {
    let request = instance_request(ctx, backup_id, datastore_version);
    let created = ctx
        .clients
        .instances
        .create_db_instance(&request)
        .await
        .with_context(|| format!("create instance {}", request.name))?;
    ctx.cleanups.push(Resource::Instance(created.id.clone()));

    let active = waiters::wait_for_db_instance_status(&ctx.clients.instances, &created.id, "ACTIVE")
        .await?
        .with_context(|| format!("instance {} vanished while building", created.id))?;
    tracing::info!("[fixture] {} instance {} is ACTIVE", ctx.suite, active.id);
    Ok(active)
}

/// Before each case: the shared instance must be ACTIVE again. If it has
/// disappeared, build a replacement.
pub async fn recheck_shared_instance(ctx: &mut SuiteContext) -> Result<()> {
    let Some(id) = ctx.instance_id.clone() else {
        return Ok(());
    };
    match waiters::wait_for_db_instance_status(&ctx.clients.instances, &id, "ACTIVE").await {
        Ok(_) => Ok(()),
        Err(WaitError::NotFound { .. }) => {
            tracing::warn!("[fixture] shared instance {} is gone, rebuilding", id);
            let version = ctx.instance_version.clone();
            let instance = create_test_instance(ctx, None, version.as_deref()).await?;
            ctx.instance_id = Some(instance.id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
