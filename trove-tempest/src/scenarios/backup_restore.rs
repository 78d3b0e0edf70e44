use anyhow::{ensure, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

use trove_client::waiters;
use trove_common::names::db_rand_name;
use trove_common::{Database, User};

use crate::fixtures;
use crate::harness::{Case, Fixture, Resource, Suite, SuiteContext};

pub fn suite() -> Suite {
    Suite {
        name: "BackupRestoreScenarioTest",
        fixture: Fixture::SharedInstance {
            datastore_version: |_| None,
        },
        skip: None,
        cases: vec![
            Case {
                name: "test_restore_from_backup",
                idempotent_id: "aec0a59a-1f94-4235-ba8c-5bb2b210bc49",
                attrs: &[],
                run: test_restore_from_backup,
            },
            Case {
                name: "test_restore_from_incremental_backup",
                idempotent_id: "ae37347c-9dac-4b4d-bf95-cb64722094dc",
                attrs: &[],
                run: test_restore_from_incremental_backup,
            },
        ],
    }
}

/// Add a database and a user granted on it, so a restore has something to
/// bring back.
pub(crate) async fn seed_user_and_database(ctx: &SuiteContext, instance_id: &str) -> Result<()> {
    let api = &ctx.clients.instances;
    let db_name = db_rand_name();
    let user_name = db_rand_name();
    let password = db_rand_name();
    api.create_database(instance_id, &db_name).await?;
    api.create_user(instance_id, &user_name, &password, &[]).await?;
    api.grant_user_access(instance_id, &user_name, &[db_name.as_str()])
        .await?;
    Ok(())
}

pub(crate) async fn databases_and_users(
    ctx: &SuiteContext,
    instance_id: &str,
) -> Result<(Vec<Database>, Vec<User>)> {
    let api = &ctx.clients.instances;
    Ok((
        api.list_databases(instance_id).await?,
        api.list_users(instance_id).await?,
    ))
}

/// Take a backup of the shared instance, register it for cleanup and wait
/// for COMPLETED.
async fn completed_backup(ctx: &mut SuiteContext, parent: Option<&str>) -> Result<String> {
    let id = ctx.instance_id()?;
    let backup = ctx
        .clients
        .backups
        .create_backup(&id, &db_rand_name(), None, parent, parent.is_some())
        .await?;
    ctx.cleanups.push(Resource::Backup(backup.id.clone()));
    waiters::wait_for_backup_status(&ctx.clients.backups, &backup.id, "COMPLETED").await?;
    Ok(backup.id)
}

async fn assert_restore_matches(
    ctx: &mut SuiteContext,
    backup_id: &str,
    expected: (Vec<Database>, Vec<User>),
) -> Result<()> {
    let version = ctx.instance_version.clone();
    let restored = fixtures::create_test_instance(ctx, Some(backup_id), version.as_deref()).await?;
    let (databases, users) = databases_and_users(ctx, &restored.id).await?;
    ensure!(
        databases == expected.0,
        "restored databases {:?} differ from {:?}",
        databases,
        expected.0
    );
    ensure!(
        users == expected.1,
        "restored users {:?} differ from {:?}",
        users,
        expected.1
    );
    Ok(())
}

fn test_restore_from_backup(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        seed_user_and_database(ctx, &id).await?;
        let expected = databases_and_users(ctx, &id).await?;

        let backup_id = completed_backup(ctx, None).await?;
        assert_restore_matches(ctx, &backup_id, expected).await
    }
    .boxed()
}

fn test_restore_from_incremental_backup(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        seed_user_and_database(ctx, &id).await?;
        let parent = completed_backup(ctx, None).await?;

        // More data after the full backup, captured only by the increment.
        seed_user_and_database(ctx, &id).await?;
        let expected = databases_and_users(ctx, &id).await?;

        let backup_id = completed_backup(ctx, Some(&parent)).await?;
        assert_restore_matches(ctx, &backup_id, expected).await
    }
    .boxed()
}
