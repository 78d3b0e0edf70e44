use anyhow::{ensure, Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

use trove_client::waiters;
use trove_common::Settings;

use crate::harness::{Case, Fixture, Suite, SuiteContext};
use crate::scenarios::backup_restore::{databases_and_users, seed_user_and_database};

pub fn suite() -> Suite {
    Suite {
        name: "UpgradeInstanceScenarioTest",
        fixture: Fixture::SharedInstance {
            datastore_version: |settings| settings.database.previous_datastore_version.clone(),
        },
        skip: Some(skip_unless_versions),
        cases: vec![Case {
            name: "test_upgrade_instance",
            idempotent_id: "7950255c-ddcb-4af0-936f-523e0ee31041",
            attrs: &[],
            run: test_upgrade_instance,
        }],
    }
}

fn skip_unless_versions(settings: &Settings) -> Option<String> {
    let db = &settings.database;
    if db.previous_datastore_version.is_none() {
        return Some("The previous_datastore_version must be specified.".to_string());
    }
    if db.datastore_version.is_none() {
        return Some("The datastore_version to upgrade to must be specified.".to_string());
    }
    None
}

fn test_upgrade_instance(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let target = ctx
            .settings
            .database
            .datastore_version
            .clone()
            .context("datastore_version is not configured")?;

        seed_user_and_database(ctx, &id).await?;
        let (databases, users) = databases_and_users(ctx, &id).await?;

        ctx.clients.instances.upgrade_db_instance(&id, &target).await?;
        waiters::wait_for_db_instance_status(&ctx.clients.instances, &id, "ACTIVE").await?;

        let (databases_upgrade, users_upgrade) = databases_and_users(ctx, &id).await?;
        ensure!(
            databases == databases_upgrade,
            "databases changed across the upgrade: {:?} -> {:?}",
            databases,
            databases_upgrade
        );
        ensure!(
            users == users_upgrade,
            "users changed across the upgrade: {:?} -> {:?}",
            users,
            users_upgrade
        );
        Ok(())
    }
    .boxed()
}
