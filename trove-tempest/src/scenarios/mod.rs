use crate::harness::Suite;

pub mod backup_restore;
pub mod basic_ops;
pub mod catalog;
pub mod datastores;
pub mod instance_actions;
pub mod instance_backups;
pub mod upgrade;

/// Every suite, API tests first, then the scenarios.
pub fn all_suites() -> Vec<Suite> {
    vec![
        datastores::suite(),
        catalog::flavors_suite(),
        catalog::limits_suite(),
        catalog::versions_suite(),
        instance_actions::suite(),
        instance_backups::suite(),
        basic_ops::suite(),
        backup_restore::suite(),
        upgrade::suite(),
    ]
}
