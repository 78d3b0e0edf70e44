use anyhow::{ensure, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use trove_client::waiters;
use trove_common::names::rand_name;

use crate::harness::{Case, Fixture, Suite, SuiteContext};

pub fn suite() -> Suite {
    Suite {
        name: "InstanceActionsTest",
        fixture: Fixture::SharedInstance {
            datastore_version: |_| None,
        },
        skip: None,
        cases: vec![
            Case {
                name: "test_restart_server",
                idempotent_id: "ace549b3-eee0-4502-bf20-7594d4bf4856",
                attrs: &[],
                run: test_restart_server,
            },
            Case {
                name: "test_update_name",
                idempotent_id: "215fbcbe-40d3-4a8f-9fe1-55ea9e8fb814",
                attrs: &[],
                run: test_update_name,
            },
            Case {
                name: "test_list_create_delete_database",
                idempotent_id: "38b5462a-308e-4cb8-9530-cc6741c95501",
                attrs: &[],
                run: test_list_create_delete_database,
            },
            Case {
                name: "test_enable_disable_root",
                idempotent_id: "bf4840fe-8cf8-46a1-8371-13021e87c690",
                attrs: &[],
                run: test_enable_disable_root,
            },
            Case {
                name: "test_list_create_delete_user",
                idempotent_id: "9f11d15b-9640-4c33-a7db-c78224763014",
                attrs: &[],
                run: test_list_create_delete_user,
            },
            Case {
                name: "test_grant_revoke_list_access",
                idempotent_id: "6f8b8350-f2a9-47b2-a108-8e3653cb9b57",
                attrs: &[],
                run: test_grant_revoke_list_access,
            },
            Case {
                name: "test_list_backups",
                idempotent_id: "b13ff6fb-6214-416b-8aea-23dc3c24d00e",
                attrs: &[],
                run: test_list_backups,
            },
        ],
    }
}

fn test_restart_server(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        ctx.clients.instances.restart_db_instance(&id).await?;
        waiters::wait_for_db_instance_status(&ctx.clients.instances, &id, "ACTIVE").await?;
        Ok(())
    }
    .boxed()
}

fn test_update_name(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let new_name = "new-name";
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::from(new_name));
        ctx.clients.instances.update_db_instance(&id, fields).await?;
        waiters::wait_for_db_instance_status(&ctx.clients.instances, &id, "ACTIVE").await?;

        let instance = ctx.clients.instances.show_db_instance(&id).await?;
        ensure!(
            instance.name == new_name,
            "expected name {:?}, got {:?}",
            new_name,
            instance.name
        );
        Ok(())
    }
    .boxed()
}

fn test_list_create_delete_database(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let api = &ctx.clients.instances;
        let name = rand_name("");

        api.create_database(&id, &name).await?;
        let names = database_names(ctx, &id).await?;
        ensure!(names.contains(&name), "database {} not listed: {:?}", name, names);

        api.delete_database(&id, &name).await?;
        let names = database_names(ctx, &id).await?;
        ensure!(!names.contains(&name), "database {} still listed", name);
        Ok(())
    }
    .boxed()
}

fn test_enable_disable_root(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let api = &ctx.clients.instances;

        ensure!(!api.root_show(&id).await?.root_enabled, "root already enabled");
        let creds = api.root_enable(&id).await?;
        ensure!(!creds.user.password.is_empty(), "root_enable returned no password");
        ensure!(api.root_show(&id).await?.root_enabled, "root not reported as enabled");

        api.root_disable(&id).await?;
        // root_show reports whether root was *ever* enabled.
        ensure!(
            api.root_show(&id).await?.root_enabled,
            "root_show reset after disabling root"
        );
        Ok(())
    }
    .boxed()
}

fn test_list_create_delete_user(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let api = &ctx.clients.instances;
        let name: String = rand_name("").chars().take(16).collect();

        api.create_user(&id, &name, "secret", &[]).await?;
        let users = user_names(ctx, &id).await?;
        ensure!(users.contains(&name), "user {} not listed: {:?}", name, users);

        api.delete_user(&id, &name).await?;
        let users = user_names(ctx, &id).await?;
        ensure!(!users.contains(&name), "user {} still listed", name);
        Ok(())
    }
    .boxed()
}

fn test_grant_revoke_list_access(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let api = &ctx.clients.instances;
        // Some datastores refuse grants to user names containing '-'.
        let user: String = rand_name("")
            .chars()
            .take(16)
            .collect::<String>()
            .replace('-', "_");
        let db = rand_name("");

        api.create_user(&id, &user, "secret", &[]).await?;
        api.create_database(&id, &db).await?;
        let access = api.show_user_access(&id, &user).await?;
        ensure!(access.is_empty(), "new user already has access: {:?}", access);

        api.grant_user_access(&id, &user, &[db.as_str()]).await?;
        let access: Vec<String> = api
            .show_user_access(&id, &user)
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect();
        ensure!(access.contains(&db), "{} not granted on {}", user, db);

        api.revoke_user_access(&id, &user, &db).await?;
        let access: Vec<String> = api
            .show_user_access(&id, &user)
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect();
        ensure!(!access.contains(&db), "{} still has access to {}", user, db);
        Ok(())
    }
    .boxed()
}

fn test_list_backups(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let backups = ctx.clients.instances.list_backups(&id).await?;
        ensure!(
            backups.is_empty(),
            "expected no backups, got {:?}",
            backups.iter().map(|b| &b.id).collect::<Vec<_>>()
        );
        Ok(())
    }
    .boxed()
}

async fn database_names(ctx: &SuiteContext, id: &str) -> Result<Vec<String>> {
    Ok(ctx
        .clients
        .instances
        .list_databases(id)
        .await?
        .into_iter()
        .map(|d| d.name)
        .collect())
}

async fn user_names(ctx: &SuiteContext, id: &str) -> Result<Vec<String>> {
    Ok(ctx
        .clients
        .instances
        .list_users(id)
        .await?
        .into_iter()
        .map(|u| u.name)
        .collect())
}
