mod common;

use anyhow::{ensure, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

use trove_client::{waiters, TroveClients};
use trove_tempest::harness::{Case, CleanupStack, Fixture, Resource, Suite, SuiteContext};
use trove_tempest::{all_suites, run, Attr, Outcome, Selection};

#[tokio::test]
async fn every_suite_passes_against_the_fake() {
    let fake = common::fake().await;
    let settings = common::settings_for(&fake, &[]);

    let report = run(&all_suites(), &settings, &Selection::default()).await;
    println!("{}", report);

    assert_eq!(report.failed(), 0, "{}", report);
    assert!(report.cleanup_errors.is_empty(), "{}", report);
    // Only the upgrade scenario needs extra configuration.
    assert_eq!(report.skipped(), 1);
    assert!(matches!(
        report.outcome_of("UpgradeInstanceScenarioTest.test_upgrade_instance"),
        Some(Outcome::Skipped(_))
    ));
    assert_eq!(report.outcome_of("DatabaseScenarioTest.test_create_instances"), Some(&Outcome::Passed));

    // Teardown removed everything the run created.
    let clients = TroveClients::connect(&settings).await.unwrap();
    assert!(clients.instances.list_db_instances(&[]).await.unwrap().is_empty());
    assert!(clients.backups.list_backups(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn upgrade_runs_when_both_versions_are_set() {
    let fake = common::fake().await;
    let settings = common::settings_for(
        &fake,
        &[
            ("TROVE_PREVIOUS_DATASTORE_VERSION", "5.7"),
            ("TROVE_DATASTORE_VERSION", "8.0"),
        ],
    );
    let selection = Selection {
        filter: Some("UpgradeInstanceScenarioTest".to_string()),
        attr: None,
    };

    let report = run(&all_suites(), &settings, &selection).await;
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.outcome_of("UpgradeInstanceScenarioTest.test_upgrade_instance"), Some(&Outcome::Passed));
    assert!(report.is_success(), "{}", report);
}

#[tokio::test]
async fn smoke_selection_runs_only_read_only_suites() {
    let fake = common::fake().await;
    let settings = common::settings_for(&fake, &[]);
    let selection = Selection {
        filter: None,
        attr: Some(Attr::Smoke),
    };

    let report = run(&all_suites(), &settings, &selection).await;
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.passed(), 5, "{}", report);
}

#[tokio::test]
async fn wrong_current_version_fails_only_that_case() {
    let fake = common::fake().await;
    let settings = common::settings_for(&fake, &[("TROVE_DB_CURRENT_VERSION", "v2.0")]);
    let selection = Selection {
        filter: Some("Database".to_string()),
        attr: Some(Attr::Smoke),
    };

    let report = run(&all_suites(), &settings, &selection).await;
    assert_eq!(report.failed(), 1);
    match report.outcome_of("DatabaseVersionsTest.test_list_db_versions") {
        Some(Outcome::Failed(msg)) => assert!(msg.contains("v2.0"), "{}", msg),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(report.outcome_of("DatabaseDatastoresTest.test_datastores"), Some(&Outcome::Passed));
    assert!(!report.is_success());
}

#[tokio::test]
async fn backup_that_never_completes_is_still_removed() {
    let fake = common::fake().await;
    // The instance is ACTIVE on its first poll, a new backup is not.
    let settings = common::settings_for(&fake, &[("TROVE_BUILD_TIMEOUT", "0")]);
    let selection = Selection {
        filter: Some("InstanceBackupsTest.test_list_create_delete_backup".to_string()),
        attr: None,
    };

    let report = run(&all_suites(), &settings, &selection).await;
    match report.outcome_of("InstanceBackupsTest.test_list_create_delete_backup") {
        Some(Outcome::Failed(msg)) => assert!(msg.contains("COMPLETED"), "{}", msg),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(report.cleanup_errors.is_empty(), "{}", report);

    let clients = TroveClients::connect(&settings).await.unwrap();
    assert!(clients.backups.list_backups(&[]).await.unwrap().is_empty());
    assert!(clients.instances.list_db_instances(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn instance_listing_sees_the_suite_instance() {
    let fake = common::fake().await;
    let settings = common::settings_for(&fake, &[]);
    let selection = Selection {
        filter: Some("DatabaseScenarioTest.test_list_instances".to_string()),
        attr: None,
    };

    let report = run(&all_suites(), &settings, &selection).await;
    assert_eq!(report.results.len(), 1);
    assert_eq!(
        report.outcome_of("DatabaseScenarioTest.test_list_instances"),
        Some(&Outcome::Passed),
        "{}",
        report
    );
    assert!(report.is_success(), "{}", report);

    let clients = TroveClients::connect(&settings).await.unwrap();
    assert!(clients.instances.list_db_instances(&[]).await.unwrap().is_empty());
}

fn delete_shared_instance(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        ctx.clients.instances.delete_db_instance(&id).await?;
        waiters::wait_for_db_instance_decommission(&ctx.clients.instances, &id).await?;
        Ok(())
    }
    .boxed()
}

fn shared_instance_was_rebuilt(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let id = ctx.instance_id()?;
        let instance = ctx.clients.instances.show_db_instance(&id).await?;
        ensure!(instance.status == "ACTIVE", "rebuilt instance is {}", instance.status);
        ensure!(ctx.cleanups.len() == 2, "replacement was not registered for cleanup");
        Ok(())
    }
    .boxed()
}

#[tokio::test]
async fn vanished_shared_instance_is_rebuilt_before_the_next_case() {
    let fake = common::fake().await;
    let settings = common::settings_for(&fake, &[]);
    let suites = vec![Suite {
        name: "RebuildTest",
        fixture: Fixture::SharedInstance {
            datastore_version: |_| None,
        },
        skip: None,
        cases: vec![
            Case {
                name: "test_delete_shared_instance",
                idempotent_id: "00000000-0000-0000-0000-000000000001",
                attrs: &[],
                run: delete_shared_instance,
            },
            Case {
                name: "test_shared_instance_was_rebuilt",
                idempotent_id: "00000000-0000-0000-0000-000000000002",
                attrs: &[],
                run: shared_instance_was_rebuilt,
            },
        ],
    }];

    let report = run(&suites, &settings, &Selection::default()).await;
    assert!(report.is_success(), "{}", report);
    assert_eq!(report.passed(), 2);
}

#[tokio::test]
async fn cleanup_tolerates_resources_that_are_already_gone() {
    let fake = common::fake().await;
    let settings = common::settings_for(&fake, &[]);
    let clients = TroveClients::connect(&settings).await.unwrap();

    let mut ctx = SuiteContext::new("CleanupTest", settings, clients.clone());
    let instance = trove_tempest::fixtures::create_test_instance(&mut ctx, None, None)
        .await
        .unwrap();
    assert_eq!(
        ctx.cleanups.pending(),
        &[Resource::Instance(instance.id.clone())]
    );

    let mut stack = CleanupStack::default();
    stack.push(Resource::Instance(instance.id.clone()));
    stack.push(Resource::Backup("never-existed".to_string()));
    stack.push(Resource::Instance(instance.id.clone()));

    let errors = stack.run(&clients).await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert!(stack.is_empty());
    assert!(clients
        .instances
        .show_db_instance(&instance.id)
        .await
        .unwrap_err()
        .is_not_found());
}
