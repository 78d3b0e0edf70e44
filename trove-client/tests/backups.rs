mod common;

use trove_client::{waiters, ClientError};
use trove_common::RestorePoint;

#[tokio::test]
async fn full_and_incremental_backups() {
    let fake = common::fake().await;
    let clients = common::clients(&fake).await;
    let instance = common::active_instance(&clients, "backups").await;

    assert!(clients
        .instances
        .list_backups(&instance.id)
        .await
        .unwrap()
        .is_empty());

    let full = clients
        .backups
        .create_backup(&instance.id, "full", Some("nightly"), None, false)
        .await
        .unwrap();
    assert_eq!(full.status, "NEW");
    assert_eq!(full.description.as_deref(), Some("nightly"));
    let full = waiters::wait_for_backup_status(&clients.backups, &full.id, "COMPLETED")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(full.instance_id.as_deref(), Some(instance.id.as_str()));

    let incremental = clients
        .backups
        .create_backup(&instance.id, "incr", None, Some(&full.id), true)
        .await
        .unwrap();
    waiters::wait_for_backup_status(&clients.backups, &incremental.id, "COMPLETED")
        .await
        .unwrap();
    let shown = clients.backups.show_backup(&incremental.id).await.unwrap();
    assert_eq!(shown.parent_id.as_deref(), Some(full.id.as_str()));

    let all = clients.backups.list_backups(&[]).await.unwrap();
    assert_eq!(all.len(), 2);
    let per_instance = clients.instances.list_backups(&instance.id).await.unwrap();
    assert_eq!(per_instance.len(), 2);

    let filtered = clients
        .backups
        .list_backups(&[("datastore".to_string(), "postgresql".to_string())])
        .await
        .unwrap();
    assert!(filtered.is_empty());

    clients.backups.delete_backup(&incremental.id).await.unwrap();
    waiters::wait_for_backup_delete(&clients.backups, &incremental.id)
        .await
        .unwrap();
    let remaining: Vec<String> = clients
        .backups
        .list_backups(&[])
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(remaining, vec![full.id.clone()]);
}

#[tokio::test]
async fn restore_brings_back_databases_and_users() {
    let fake = common::fake().await;
    let clients = common::clients(&fake).await;
    let source = common::active_instance(&clients, "source").await;
    let api = &clients.instances;

    api.create_database(&source.id, "ledger").await.unwrap();
    api.create_user(&source.id, "carol", "pw", &[]).await.unwrap();
    api.grant_user_access(&source.id, "carol", &["ledger"])
        .await
        .unwrap();

    let backup = clients
        .backups
        .create_backup(&source.id, "snap", None, None, false)
        .await
        .unwrap();
    waiters::wait_for_backup_status(&clients.backups, &backup.id, "COMPLETED")
        .await
        .unwrap();

    let mut request = common::instance_request("restored");
    request.restore_point = Some(RestorePoint {
        backup_ref: backup.id.clone(),
    });
    let restored = api.create_db_instance(&request).await.unwrap();
    waiters::wait_for_db_instance_status(api, &restored.id, "ACTIVE")
        .await
        .unwrap();

    assert_eq!(
        api.list_databases(&source.id).await.unwrap(),
        api.list_databases(&restored.id).await.unwrap()
    );
    assert_eq!(
        api.list_users(&source.id).await.unwrap(),
        api.list_users(&restored.id).await.unwrap()
    );
}

#[tokio::test]
async fn backup_of_unknown_instance_is_not_found() {
    let fake = common::fake().await;
    let clients = common::clients(&fake).await;

    let err = clients
        .backups
        .create_backup("missing", "b", None, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
    assert!(clients.backups.show_backup("missing").await.unwrap_err().is_not_found());
}
