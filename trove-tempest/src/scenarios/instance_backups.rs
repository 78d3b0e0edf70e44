use anyhow::{ensure, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

use trove_client::waiters;
use trove_common::names::rand_name;

use crate::harness::{Case, Fixture, Resource, Suite, SuiteContext};

pub fn suite() -> Suite {
    Suite {
        name: "InstanceBackupsTest",
        fixture: Fixture::SharedInstance {
            datastore_version: |_| None,
        },
        skip: None,
        cases: vec![
            Case {
                name: "test_list_create_delete_backup",
                idempotent_id: "e4c2bf6d-e619-4d9b-a79b-67f5463a8705",
                attrs: &[],
                run: test_list_create_delete_backup,
            },
            Case {
                name: "test_backup_incremental",
                idempotent_id: "2ddab860-b487-481f-b89e-9ad06d5f6286",
                attrs: &[],
                run: test_backup_incremental,
            },
        ],
    }
}

async fn backup_ids(ctx: &SuiteContext) -> Result<Vec<String>> {
    Ok(ctx
        .clients
        .backups
        .list_backups(&[])
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect())
}

fn test_list_create_delete_backup(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let backup = ctx
            .clients
            .backups
            .create_backup(&id, &rand_name(""), None, None, false)
            .await?;
        ctx.cleanups.push(Resource::Backup(backup.id.clone()));

        let backups = &ctx.clients.backups;
        waiters::wait_for_backup_status(backups, &backup.id, "COMPLETED").await?;
        let listed = backup_ids(ctx).await?;
        ensure!(listed.contains(&backup.id), "backup {} not listed", backup.id);

        backups.delete_backup(&backup.id).await?;
        waiters::wait_for_backup_delete(backups, &backup.id).await?;
        let listed = backup_ids(ctx).await?;
        ensure!(!listed.contains(&backup.id), "backup {} still listed", backup.id);
        Ok(())
    }
    .boxed()
}

fn test_backup_incremental(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let name = rand_name("");

        let parent = ctx
            .clients
            .backups
            .create_backup(&id, &name, None, None, false)
            .await?;
        ctx.cleanups.push(Resource::Backup(parent.id.clone()));
        waiters::wait_for_backup_status(&ctx.clients.backups, &parent.id, "COMPLETED").await?;

        let backup = ctx
            .clients
            .backups
            .create_backup(&id, &name, None, Some(&parent.id), true)
            .await?;
        ctx.cleanups.push(Resource::Backup(backup.id.clone()));
        waiters::wait_for_backup_status(&ctx.clients.backups, &backup.id, "COMPLETED").await?;

        let shown = ctx.clients.backups.show_backup(&backup.id).await?;
        ensure!(
            shown.parent_id.as_deref() == Some(parent.id.as_str()),
            "incremental backup {} has parent {:?}, expected {}",
            backup.id,
            shown.parent_id,
            parent.id
        );
        Ok(())
    }
    .boxed()
}
