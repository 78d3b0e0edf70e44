pub mod backups;
pub mod datastores;
pub mod error;
pub mod flavors;
pub mod identity;
pub mod instances;
pub mod limits;
pub mod rest;
pub mod versions;
pub mod waiters;

pub use backups::BackupsClient;
pub use datastores::DatastoresClient;
pub use error::{ClientError, ResourceKind, WaitError};
pub use flavors::FlavorsClient;
pub use identity::Session;
pub use instances::InstancesClient;
pub use limits::LimitsClient;
pub use rest::{ResponseBody, RestClient};
pub use versions::VersionsClient;
pub use waiters::{WaitOutcome, WaitSettings};

use trove_common::Settings;

/// Every database API client, sharing one HTTP connection pool and token.
#[derive(Clone, Debug)]
pub struct TroveClients {
    pub instances: InstancesClient,
    pub backups: BackupsClient,
    pub datastores: DatastoresClient,
    pub flavors: FlavorsClient,
    pub limits: LimitsClient,
    pub versions: VersionsClient,
}

impl TroveClients {
    /// Authenticate (or use the configured endpoint/token) and build clients.
    pub async fn connect(settings: &Settings) -> Result<Self, ClientError> {
        let session = identity::authenticate(settings).await?;
        Self::from_session(settings, &session)
    }

    pub fn from_session(settings: &Settings, session: &Session) -> Result<Self, ClientError> {
        let rest = RestClient::new(
            &session.endpoint,
            &session.token,
            settings.http_timeout,
            WaitSettings::from_settings(&settings.database),
        )?;
        Ok(Self {
            instances: InstancesClient::new(rest.clone()),
            backups: BackupsClient::new(rest.clone()),
            datastores: DatastoresClient::new(rest.clone()),
            flavors: FlavorsClient::new(rest.clone()),
            limits: LimitsClient::new(rest.clone()),
            versions: VersionsClient::new(rest),
        })
    }
}
