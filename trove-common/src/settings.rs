use regex::Regex;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::DEFAULT_FAILURE_PATTERN;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key} is not a valid regular expression: {source}")]
    Pattern {
        key: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Database service options consumed by clients, waiters and scenarios.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub catalog_type: String,
    pub db_flavor_ref: String,
    pub db_current_version: String,
    pub datastore_type: String,
    pub datastore_version: Option<String>,
    pub previous_datastore_version: Option<String>,
    pub availability_zone: String,
    pub volume_size: u32,
    pub build_interval: Duration,
    pub build_timeout: Duration,
    pub failure_pattern: Regex,
    pub db_port: u16,
}

#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub auth_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub project_name: Option<String>,
    pub user_domain_name: String,
    pub project_domain_name: String,
    pub region: Option<String>,
    pub endpoint_type: String,
    /// Skips Keystone entirely when set together with `auth_token`.
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Whether Trove is expected to be available at all.
    pub service_available: bool,
    pub database: DatabaseSettings,
    pub identity: IdentitySettings,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset, like an empty line in a .env file.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let pattern = text("TROVE_FAILURE_PATTERN", DEFAULT_FAILURE_PATTERN);
        let failure_pattern = Regex::new(&pattern).map_err(|source| SettingsError::Pattern {
            key: "TROVE_FAILURE_PATTERN",
            source,
        })?;

        let database = DatabaseSettings {
            catalog_type: text("TROVE_CATALOG_TYPE", "database"),
            db_flavor_ref: text("TROVE_DB_FLAVOR_REF", "1"),
            db_current_version: text("TROVE_DB_CURRENT_VERSION", "v1.0"),
            datastore_type: text("TROVE_DATASTORE_TYPE", "MySQL"),
            datastore_version: get("TROVE_DATASTORE_VERSION"),
            previous_datastore_version: get("TROVE_PREVIOUS_DATASTORE_VERSION"),
            availability_zone: text("TROVE_AVAILABILITY_ZONE", "nova"),
            volume_size: parse(&get, "TROVE_VOLUME_SIZE", 1)?,
            build_interval: Duration::from_secs(parse(&get, "TROVE_BUILD_INTERVAL", 1)?),
            build_timeout: Duration::from_secs(parse(&get, "TROVE_BUILD_TIMEOUT", 300)?),
            failure_pattern,
            db_port: parse(&get, "TROVE_DB_PORT", 3306)?,
        };

        let identity = IdentitySettings {
            auth_url: get("OS_AUTH_URL"),
            username: get("OS_USERNAME"),
            password: get("OS_PASSWORD"),
            project_name: get("OS_PROJECT_NAME"),
            user_domain_name: text("OS_USER_DOMAIN_NAME", "Default"),
            project_domain_name: text("OS_PROJECT_DOMAIN_NAME", "Default"),
            region: get("OS_REGION_NAME"),
            endpoint_type: text("OS_INTERFACE", "public"),
            endpoint: get("TROVE_ENDPOINT"),
            auth_token: get("TROVE_AUTH_TOKEN"),
        };

        Ok(Self {
            service_available: parse_bool(&get, "TROVE_SERVICE_AVAILABLE", true)?,
            database,
            identity,
            http_timeout: Duration::from_secs(parse(&get, "TROVE_HTTP_TIMEOUT", 30)?),
        })
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| SettingsError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, SettingsError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(SettingsError::Invalid {
            key,
            value: v,
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_plugin_options() {
        let s = settings(&[]).unwrap();
        assert!(s.service_available);
        assert_eq!(s.database.catalog_type, "database");
        assert_eq!(s.database.db_flavor_ref, "1");
        assert_eq!(s.database.db_current_version, "v1.0");
        assert_eq!(s.database.datastore_type, "MySQL");
        assert_eq!(s.database.availability_zone, "nova");
        assert_eq!(s.database.volume_size, 1);
        assert_eq!(s.database.build_timeout, Duration::from_secs(300));
        assert!(s.database.datastore_version.is_none());
        assert!(s.database.failure_pattern.is_match("BACKUP_ERROR"));
        assert!(!s.database.failure_pattern.is_match("ERROR_BACKUP"));
        assert_eq!(s.identity.endpoint_type, "public");
    }

    #[test]
    fn overrides_are_parsed() {
        let s = settings(&[
            ("TROVE_SERVICE_AVAILABLE", "false"),
            ("TROVE_VOLUME_SIZE", "5"),
            ("TROVE_BUILD_INTERVAL", "0"),
            ("TROVE_DATASTORE_VERSION", " 5.7 "),
            ("TROVE_PREVIOUS_DATASTORE_VERSION", ""),
        ])
        .unwrap();
        assert!(!s.service_available);
        assert_eq!(s.database.volume_size, 5);
        assert_eq!(s.database.build_interval, Duration::ZERO);
        assert_eq!(s.database.datastore_version.as_deref(), Some("5.7"));
        assert!(s.database.previous_datastore_version.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = settings(&[("TROVE_BUILD_TIMEOUT", "soon")]).unwrap_err();
        assert!(err.to_string().contains("TROVE_BUILD_TIMEOUT"));

        let err = settings(&[("TROVE_FAILURE_PATTERN", "([")]).unwrap_err();
        assert!(matches!(err, SettingsError::Pattern { .. }));

        assert!(settings(&[("TROVE_SERVICE_AVAILABLE", "maybe")]).is_err());
    }
}
