use uuid::Uuid;

/// Random resource name, e.g. `tempest-InstanceActionsTest-3f2a9c1d`.
pub fn rand_name(prefix: &str) -> String {
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    if prefix.is_empty() {
        format!("tempest-{}", suffix)
    } else {
        format!("tempest-{}-{}", prefix, suffix)
    }
}

/// Random name usable as a database or user name on every datastore
/// (no dashes, at most 16 characters).
pub fn db_rand_name() -> String {
    let suffix = &Uuid::new_v4().simple().to_string()[..10];
    format!("trove_{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_names_are_unique_and_prefixed() {
        let a = rand_name("Backups");
        let b = rand_name("Backups");
        assert!(a.starts_with("tempest-Backups-"));
        assert_ne!(a, b);
        assert_eq!(rand_name("").len(), "tempest-".len() + 8);
    }

    #[test]
    fn db_names_are_datastore_safe() {
        let name = db_rand_name();
        assert!(name.len() <= 16);
        assert!(!name.contains('-'));
    }
}
