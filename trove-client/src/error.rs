use reqwest::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{method} {url} returned 404 Not Found")]
    NotFound { method: Method, url: String },

    #[error("{method} {url} returned {actual} (expected {expected}): {body}")]
    UnexpectedStatus {
        method: Method,
        url: String,
        expected: StatusCode,
        actual: StatusCode,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL {0:?}")]
    InvalidUrl(String),

    #[error("auth token is not a valid HTTP header value")]
    InvalidToken,

    #[error("identity service did not return an X-Subject-Token header")]
    MissingToken,

    #[error("no {interface} endpoint of type {service_type:?} in the service catalog (region: {region:?})")]
    CatalogEntryMissing {
        service_type: String,
        interface: String,
        region: Option<String>,
    },

    #[error("incomplete identity settings: {0} is not set")]
    MissingCredential(&'static str),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// Kind of remote resource a waiter is watching, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Instance,
    Backup,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Instance => f.write_str("DB Instance"),
            ResourceKind::Backup => f.write_str("Backup"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("{kind} {id} not found while waiting for it")]
    NotFound { kind: ResourceKind, id: String },

    #[error("{kind} {name} ({id}) went to failure status {status}")]
    Failed {
        kind: ResourceKind,
        id: String,
        name: String,
        status: String,
    },

    #[error(
        "{kind} {id} failed to reach {target} status (current: {last_status}) \
         within the required time ({} s)",
        .timeout.as_secs()
    )]
    Timeout {
        kind: ResourceKind,
        id: String,
        target: String,
        last_status: String,
        timeout: Duration,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}
