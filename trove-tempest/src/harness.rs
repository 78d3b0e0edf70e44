//! Minimal test harness: suites of cases sharing class-level resources,
//! a cleanup stack, and a run report.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::time::{Duration, Instant};

use trove_client::{waiters, ClientError, TroveClients};
use trove_common::Settings;

use crate::fixtures;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Smoke,
    Slow,
}

impl Attr {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attr::Smoke => "smoke",
            Attr::Slow => "slow",
        }
    }
}

impl std::str::FromStr for Attr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smoke" => Ok(Attr::Smoke),
            "slow" => Ok(Attr::Slow),
            other => Err(format!("unknown attribute '{}' (expected smoke or slow)", other)),
        }
    }
}

pub type CaseFn = for<'a> fn(&'a mut SuiteContext) -> BoxFuture<'a, Result<()>>;

/// Returns the reason a suite cannot run with the given settings.
pub type SkipCheck = fn(&Settings) -> Option<String>;

pub struct Case {
    pub name: &'static str,
    pub idempotent_id: &'static str,
    pub attrs: &'static [Attr],
    pub run: CaseFn,
}

#[derive(Clone, Copy)]
pub enum Fixture {
    /// No class-level resources.
    Bare,
    /// One ACTIVE instance shared by every case and re-checked before each.
    SharedInstance {
        datastore_version: fn(&Settings) -> Option<String>,
    },
}

pub struct Suite {
    pub name: &'static str,
    pub fixture: Fixture,
    pub skip: Option<SkipCheck>,
    pub cases: Vec<Case>,
}

// --- Cleanup ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Instance(String),
    Backup(String),
}

/// Class-level resources to tear down once a suite is finished.
///
/// Teardown issues every delete first and only then waits for each resource
/// to disappear, most recently registered first in both phases. A 404 on
/// delete counts as already deleted.
#[derive(Debug, Default)]
pub struct CleanupStack {
    resources: Vec<Resource>,
}

impl CleanupStack {
    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn pending(&self) -> &[Resource] {
        &self.resources
    }

    /// Run and clear the stack, returning one message per problem.
    pub async fn run(&mut self, clients: &TroveClients) -> Vec<String> {
        let pending: Vec<Resource> = self.resources.drain(..).rev().collect();
        let mut errors = Vec::new();
        let mut deleted = Vec::new();

        for resource in pending {
            let result = match &resource {
                Resource::Instance(id) => clients.instances.delete_db_instance(id).await,
                Resource::Backup(id) => clients.backups.delete_backup(id).await,
            };
            match result {
                Ok(_) => deleted.push(resource),
                Err(ClientError::NotFound { .. }) => {
                    tracing::debug!("[cleanup] {:?} already gone", resource);
                    deleted.push(resource);
                }
                Err(e) => {
                    tracing::warn!("[cleanup] failed to delete {:?}: {}", resource, e);
                    errors.push(format!("delete {:?}: {}", resource, e));
                }
            }
        }

        for resource in deleted {
            let result = match &resource {
                Resource::Instance(id) => {
                    waiters::wait_for_db_instance_decommission(&clients.instances, id).await
                }
                Resource::Backup(id) => waiters::wait_for_backup_delete(&clients.backups, id).await,
            };
            if let Err(e) = result {
                tracing::warn!("[cleanup] {:?} did not go away: {}", resource, e);
                errors.push(format!("wait for {:?}: {}", resource, e));
            }
        }
        errors
    }
}

// --- Context ---

pub struct SuiteContext {
    pub suite: &'static str,
    pub settings: Settings,
    pub clients: TroveClients,
    pub cleanups: CleanupStack,
    pub(crate) instance_id: Option<String>,
    pub(crate) instance_version: Option<String>,
}

impl SuiteContext {
    pub fn new(suite: &'static str, settings: Settings, clients: TroveClients) -> Self {
        Self {
            suite,
            settings,
            clients,
            cleanups: CleanupStack::default(),
            instance_id: None,
            instance_version: None,
        }
    }

    /// Id of the suite's shared instance.
    pub fn instance_id(&self) -> Result<String> {
        self.instance_id
            .clone()
            .context("suite has no shared instance")
    }
}

// --- Selection ---

#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Substring of `Suite.case` or of the idempotent id.
    pub filter: Option<String>,
    pub attr: Option<Attr>,
}

impl Selection {
    pub fn matches(&self, suite: &Suite, case: &Case) -> bool {
        let by_name = self.filter.as_deref().map_or(true, |f| {
            format!("{}.{}", suite.name, case.name).contains(f) || case.idempotent_id.contains(f)
        });
        let by_attr = self.attr.map_or(true, |a| case.attrs.contains(&a));
        by_name && by_attr
    }
}

/// One line per selected case, for `--list`.
pub fn describe(suites: &[Suite], selection: &Selection) -> Vec<String> {
    let mut lines = Vec::new();
    for suite in suites {
        for case in suite.cases.iter().filter(|c| selection.matches(suite, c)) {
            let attrs: Vec<&str> = case.attrs.iter().map(Attr::as_str).collect();
            let mut line = format!("{}.{} [id-{}]", suite.name, case.name, case.idempotent_id);
            if !attrs.is_empty() {
                line.push_str(&format!(" ({})", attrs.join(",")));
            }
            lines.push(line);
        }
    }
    lines
}

// --- Report ---

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub suite: &'static str,
    pub case: &'static str,
    pub idempotent_id: &'static str,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct Report {
    pub results: Vec<CaseResult>,
    pub cleanup_errors: Vec<String>,
}

impl Report {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    /// No failed case and a clean teardown.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.cleanup_errors.is_empty()
    }

    /// Outcome of the case named `Suite.case`.
    pub fn outcome_of(&self, qualified: &str) -> Option<&Outcome> {
        let (suite, case) = qualified.split_once('.')?;
        self.results
            .iter()
            .find(|r| r.suite == suite && r.case == case)
            .map(|r| &r.outcome)
    }

    fn record_all(&mut self, suite: &Suite, cases: &[&Case], outcome: Outcome) {
        for case in cases {
            self.results.push(CaseResult {
                suite: suite.name,
                case: case.name,
                idempotent_id: case.idempotent_id,
                outcome: outcome.clone(),
                elapsed: Duration::ZERO,
            });
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.results {
            let status = match &r.outcome {
                Outcome::Passed => "ok".to_string(),
                Outcome::Failed(e) => format!("FAILED: {}", e),
                Outcome::Skipped(why) => format!("skipped: {}", why),
            };
            writeln!(
                f,
                "{}.{} [id-{}] ... {} ({:.1}s)",
                r.suite,
                r.case,
                r.idempotent_id,
                status,
                r.elapsed.as_secs_f64()
            )?;
        }
        for e in &self.cleanup_errors {
            writeln!(f, "cleanup error: {}", e)?;
        }
        write!(
            f,
            "Ran {} cases: {} passed, {} failed, {} skipped",
            self.results.len(),
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

// --- Runner ---

/// Run every selected case, suite by suite.
pub async fn run(suites: &[Suite], settings: &Settings, selection: &Selection) -> Report {
    let mut report = Report::default();
    let selected: Vec<(&Suite, Vec<&Case>)> = suites
        .iter()
        .map(|s| (s, s.cases.iter().filter(|c| selection.matches(s, c)).collect::<Vec<_>>()))
        .filter(|(_, cases)| !cases.is_empty())
        .collect();
    if selected.is_empty() {
        return report;
    }

    if !settings.service_available {
        for (suite, cases) in &selected {
            let why = format!("{} skipped as trove is not available", suite.name);
            report.record_all(suite, cases, Outcome::Skipped(why));
        }
        return report;
    }

    let clients = match TroveClients::connect(settings).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("[runner] cannot reach the database service: {}", e);
            for (suite, cases) in &selected {
                report.record_all(suite, cases, Outcome::Failed(format!("connect: {}", e)));
            }
            return report;
        }
    };

    for (suite, cases) in selected {
        if let Some(why) = suite.skip.and_then(|check| check(settings)) {
            tracing::info!("[runner] skipping {}: {}", suite.name, why);
            report.record_all(suite, &cases, Outcome::Skipped(why));
            continue;
        }
        run_suite(suite, &cases, settings, clients.clone(), &mut report).await;
    }
    report
}

async fn run_suite(
    suite: &Suite,
    cases: &[&Case],
    settings: &Settings,
    clients: TroveClients,
    report: &mut Report,
) {
    tracing::info!("[runner] {} ({} cases)", suite.name, cases.len());
    let mut ctx = SuiteContext::new(suite.name, settings.clone(), clients);

    let setup = match suite.fixture {
        Fixture::Bare => Ok(()),
        Fixture::SharedInstance { datastore_version } => {
            let version = datastore_version(settings);
            ctx.instance_version = version.clone();
            fixtures::create_test_instance(&mut ctx, None, version.as_deref())
                .await
                .map(|instance| ctx.instance_id = Some(instance.id))
        }
    };

    match setup {
        Err(e) => {
            tracing::error!("[runner] {} setup failed: {:#}", suite.name, e);
            report.record_all(suite, cases, Outcome::Failed(format!("suite setup: {:#}", e)));
        }
        Ok(()) => {
            for case in cases {
                let started = Instant::now();
                let outcome = match run_case(suite, case, &mut ctx).await {
                    Ok(()) => Outcome::Passed,
                    Err(e) => Outcome::Failed(format!("{:#}", e)),
                };
                match &outcome {
                    Outcome::Failed(e) => tracing::warn!("[runner] {}.{} failed: {}", suite.name, case.name, e),
                    _ => tracing::info!("[runner] {}.{} passed", suite.name, case.name),
                }
                report.results.push(CaseResult {
                    suite: suite.name,
                    case: case.name,
                    idempotent_id: case.idempotent_id,
                    outcome,
                    elapsed: started.elapsed(),
                });
            }
        }
    }

    let clients = ctx.clients.clone();
    for e in ctx.cleanups.run(&clients).await {
        report.cleanup_errors.push(format!("{}: {}", suite.name, e));
    }
}

async fn run_case(suite: &Suite, case: &Case, ctx: &mut SuiteContext) -> Result<()> {
    if let Fixture::SharedInstance { .. } = suite.fixture {
        fixtures::recheck_shared_instance(ctx)
            .await
            .context("shared instance is not usable")?;
    }
    (case.run)(ctx).await
}
