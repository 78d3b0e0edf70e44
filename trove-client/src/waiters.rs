//! Poll-until-status helpers.
//!
//! Every waiter is the same loop: fetch a fresh snapshot, stop when it is the
//! wanted one, fail fast on an error status, give up once the deadline has
//! passed, otherwise sleep a fixed interval and fetch again. A 404 either ends
//! the wait successfully (the caller wanted the resource gone) or is raised
//! straight away; it is never retried.

use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::backups::BackupsClient;
use crate::error::{ClientError, ResourceKind, WaitError};
use crate::instances::InstancesClient;
use trove_common::settings::DatabaseSettings;
use trove_common::{Backup, Instance, DEFAULT_FAILURE_PATTERN, DELETE_COMPLETE};

#[derive(Debug, Clone)]
pub struct WaitSettings {
    pub timeout: Duration,
    pub interval: Duration,
    pub failure_pattern: Regex,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(1),
            failure_pattern: Regex::new(DEFAULT_FAILURE_PATTERN).expect("default pattern is valid"),
        }
    }
}

impl WaitSettings {
    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        Self {
            timeout: settings.build_timeout,
            interval: settings.build_interval,
            failure_pattern: settings.failure_pattern.clone(),
        }
    }
}

/// Anything a waiter can poll: it has to say who it is and what state it is in.
pub trait Snapshot {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn status(&self) -> &str;
}

impl Snapshot for Instance {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn status(&self) -> &str {
        &self.status
    }
}

impl Snapshot for Backup {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn status(&self) -> &str {
        &self.status
    }
}

/// What to do when the resource disappears mid-wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// The caller is waiting for deletion: a 404 means success.
    Done,
    /// Anything else: a 404 is raised immediately.
    Propagate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<T> {
    Reached(T),
    Gone,
}

impl<T> WaitOutcome<T> {
    pub fn into_snapshot(self) -> Option<T> {
        match self {
            WaitOutcome::Reached(snapshot) => Some(snapshot),
            WaitOutcome::Gone => None,
        }
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, WaitOutcome::Gone)
    }
}

/// Identifies a wait in error messages.
#[derive(Debug, Clone, Copy)]
pub struct WaitLabel<'a> {
    pub kind: ResourceKind,
    pub id: &'a str,
    pub target: &'a str,
}

pub fn is_terminal_not_found(target: &str) -> bool {
    target == DELETE_COMPLETE
}

pub fn is_blocking_error_status(status: &str, failure_pattern: &Regex) -> bool {
    failure_pattern.is_match(status)
}

pub fn is_target_reached(status: &str, target: &str) -> bool {
    status == target
}

pub async fn wait_until<T, F, Fut, S, P>(
    label: &WaitLabel<'_>,
    mut fetch: F,
    is_success: S,
    is_failure: P,
    on_not_found: NotFoundPolicy,
    settings: &WaitSettings,
) -> Result<WaitOutcome<T>, WaitError>
where
    T: Snapshot,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
    S: Fn(&T) -> bool,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let snapshot = match fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_not_found() => {
                return match on_not_found {
                    NotFoundPolicy::Done => {
                        tracing::info!("{} {} is gone after {} poll(s)", label.kind, label.id, polls);
                        Ok(WaitOutcome::Gone)
                    }
                    NotFoundPolicy::Propagate => Err(WaitError::NotFound {
                        kind: label.kind,
                        id: label.id.to_string(),
                    }),
                };
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            "{} {} poll #{}: status={} (waiting for {})",
            label.kind,
            label.id,
            polls,
            snapshot.status(),
            label.target
        );

        if is_success(&snapshot) {
            tracing::info!(
                "{} {} reached {} after {} poll(s)",
                label.kind,
                label.id,
                label.target,
                polls
            );
            return Ok(WaitOutcome::Reached(snapshot));
        }
        if is_failure(&snapshot) {
            return Err(WaitError::Failed {
                kind: label.kind,
                id: snapshot.id().to_string(),
                name: snapshot.name().to_string(),
                status: snapshot.status().to_string(),
            });
        }
        if start.elapsed() >= settings.timeout {
            return Err(WaitError::Timeout {
                kind: label.kind,
                id: label.id.to_string(),
                target: label.target.to_string(),
                last_status: snapshot.status().to_string(),
                timeout: settings.timeout,
            });
        }

        sleep(settings.interval).await;
    }
}

/// Wait for `target`, failing on statuses matching the configured pattern.
/// A target of `DELETE_COMPLETE` also accepts the resource vanishing.
pub async fn wait_for_status<T, F, Fut>(
    kind: ResourceKind,
    id: &str,
    target: &str,
    fetch: F,
    settings: &WaitSettings,
) -> Result<WaitOutcome<T>, WaitError>
where
    T: Snapshot,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let on_not_found = if is_terminal_not_found(target) {
        NotFoundPolicy::Done
    } else {
        NotFoundPolicy::Propagate
    };
    let label = WaitLabel { kind, id, target };
    wait_until(
        &label,
        fetch,
        |s: &T| is_target_reached(s.status(), target),
        |s: &T| is_blocking_error_status(s.status(), &settings.failure_pattern),
        on_not_found,
        settings,
    )
    .await
}

/// Wait until reads of the resource return 404.
pub async fn wait_for_absence<T, F, Fut>(
    kind: ResourceKind,
    id: &str,
    fetch: F,
    settings: &WaitSettings,
) -> Result<(), WaitError>
where
    T: Snapshot,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let label = WaitLabel {
        kind,
        id,
        target: DELETE_COMPLETE,
    };
    wait_until(
        &label,
        fetch,
        |_: &T| false,
        |_: &T| false,
        NotFoundPolicy::Done,
        settings,
    )
    .await
    .map(|_| ())
}

/// Returns the instance once it reports `status`, or `None` when the target
/// was `DELETE_COMPLETE` and the instance is gone.
pub async fn wait_for_db_instance_status(
    client: &InstancesClient,
    instance_id: &str,
    status: &str,
) -> Result<Option<Instance>, WaitError> {
    let outcome = wait_for_status(
        ResourceKind::Instance,
        instance_id,
        status,
        move || client.show_db_instance(instance_id),
        client.rest().wait_settings(),
    )
    .await?;
    Ok(outcome.into_snapshot())
}

pub async fn wait_for_db_instance_decommission(
    client: &InstancesClient,
    instance_id: &str,
) -> Result<(), WaitError> {
    wait_for_absence(
        ResourceKind::Instance,
        instance_id,
        move || client.show_db_instance(instance_id),
        client.rest().wait_settings(),
    )
    .await
}

pub async fn wait_for_backup_status(
    client: &BackupsClient,
    backup_id: &str,
    status: &str,
) -> Result<Option<Backup>, WaitError> {
    let outcome = wait_for_status(
        ResourceKind::Backup,
        backup_id,
        status,
        move || client.show_backup(backup_id),
        client.rest().wait_settings(),
    )
    .await?;
    Ok(outcome.into_snapshot())
}

pub async fn wait_for_backup_delete(client: &BackupsClient, backup_id: &str) -> Result<(), WaitError> {
    wait_for_absence(
        ResourceKind::Backup,
        backup_id,
        move || client.show_backup(backup_id),
        client.rest().wait_settings(),
    )
    .await
}
