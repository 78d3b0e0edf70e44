use reqwest::StatusCode;

use crate::error::ClientError;
use crate::rest::RestClient;
use trove_common::{Datastore, DatastoreVersion};

#[derive(Clone, Debug)]
pub struct DatastoresClient {
    rest: RestClient,
}

impl DatastoresClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn list_db_datastores(&self) -> Result<Vec<Datastore>, ClientError> {
        self.rest
            .get("datastores", StatusCode::OK)
            .await?
            .field("datastores")
    }

    /// Look a datastore up by id or name.
    pub async fn show_db_datastore(&self, datastore: &str) -> Result<Datastore, ClientError> {
        self.rest
            .get(&format!("datastores/{}", datastore), StatusCode::OK)
            .await?
            .field("datastore")
    }

    pub async fn list_datastore_versions(
        &self,
        datastore: &str,
    ) -> Result<Vec<DatastoreVersion>, ClientError> {
        self.rest
            .get(&format!("datastores/{}/versions", datastore), StatusCode::OK)
            .await?
            .field("versions")
    }
}
