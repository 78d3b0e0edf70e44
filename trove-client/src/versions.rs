use reqwest::StatusCode;

use crate::error::ClientError;
use crate::rest::RestClient;
use trove_common::ApiVersion;

#[derive(Clone, Debug)]
pub struct VersionsClient {
    rest: RestClient,
}

impl VersionsClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// API versions advertised at the service root (outside the tenant path).
    pub async fn list_db_versions(&self) -> Result<Vec<ApiVersion>, ClientError> {
        let root = self.rest.root_url()?;
        self.rest
            .get_url(root, StatusCode::OK)
            .await?
            .field("versions")
    }
}
