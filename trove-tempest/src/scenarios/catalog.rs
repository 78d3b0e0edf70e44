//! Read-only API surfaces: flavors, limits and API versions.

use anyhow::{ensure, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::harness::{Attr, Case, Fixture, Suite, SuiteContext};

pub fn flavors_suite() -> Suite {
    Suite {
        name: "DatabaseFlavorsTest",
        fixture: Fixture::Bare,
        skip: None,
        cases: vec![
            Case {
                name: "test_get_db_flavor",
                idempotent_id: "c94b825e-0132-4686-8049-8a4a2bc09525",
                attrs: &[Attr::Smoke],
                run: test_get_db_flavor,
            },
            Case {
                name: "test_list_db_flavors",
                idempotent_id: "685025d6-0cec-4673-8a8d-995cb8e0d3bb",
                attrs: &[Attr::Smoke],
                run: test_list_db_flavors,
            },
        ],
    }
}

pub fn limits_suite() -> Suite {
    Suite {
        name: "DatabaseLimitsTest",
        fixture: Fixture::Bare,
        skip: None,
        cases: vec![Case {
            name: "test_absolute_limits",
            idempotent_id: "73c19ab7-7b39-4a9e-a0ac-29f0a4c1dc3f",
            attrs: &[Attr::Smoke],
            run: test_absolute_limits,
        }],
    }
}

pub fn versions_suite() -> Suite {
    Suite {
        name: "DatabaseVersionsTest",
        fixture: Fixture::Bare,
        skip: None,
        cases: vec![Case {
            name: "test_list_db_versions",
            idempotent_id: "6952cd77-90cd-4dca-bb60-8e2c797940cf",
            attrs: &[Attr::Smoke],
            run: test_list_db_versions,
        }],
    }
}

fn test_get_db_flavor(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let flavor_ref = &ctx.settings.database.db_flavor_ref;
        let flavor = ctx.clients.flavors.show_db_flavor(flavor_ref).await?;
        ensure!(
            &flavor.id_string() == flavor_ref,
            "flavor id {} does not match {}",
            flavor.id_string(),
            flavor_ref
        );
        ensure!(!flavor.name.is_empty(), "flavor {} has no name", flavor_ref);
        ensure!(flavor.ram.is_some(), "flavor {} has no ram", flavor_ref);
        Ok(())
    }
    .boxed()
}

fn test_list_db_flavors(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let flavor = ctx
            .clients
            .flavors
            .show_db_flavor(&ctx.settings.database.db_flavor_ref)
            .await?;
        let flavors = ctx.clients.flavors.list_db_flavors().await?;
        ensure!(
            flavors.contains(&flavor),
            "flavor {} is missing from the flavor list",
            flavor.id_string()
        );
        Ok(())
    }
    .boxed()
}

fn test_absolute_limits(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let limits = ctx.clients.limits.list_limits().await?;
        let absolute: Vec<_> = limits.iter().filter(|l| l.verb == "ABSOLUTE").collect();
        ensure!(absolute.len() == 1, "One ABSOLUTE limit in verb");
        let missing: Vec<&str> = ["max_backups", "max_volumes", "max_instances"]
            .into_iter()
            .filter(|key| !absolute[0].values.contains_key(*key))
            .collect();
        ensure!(missing.is_empty(), "Missing absolute limits: {:?}", missing);
        Ok(())
    }
    .boxed()
}

fn test_list_db_versions(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let versions = ctx.clients.versions.list_db_versions().await?;
        ensure!(!versions.is_empty(), "No database versions found");
        let current: Vec<&str> = versions
            .iter()
            .filter(|v| v.status == "CURRENT")
            .map(|v| v.id.as_str())
            .collect();
        ensure!(current.len() == 1, "Expected exactly one CURRENT version, found {:?}", current);
        ensure!(
            current.contains(&ctx.settings.database.db_current_version.as_str()),
            "{} is not the CURRENT version (found {:?})",
            ctx.settings.database.db_current_version,
            current
        );
        Ok(())
    }
    .boxed()
}
