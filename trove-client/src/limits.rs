use reqwest::StatusCode;

use crate::error::ClientError;
use crate::rest::RestClient;
use trove_common::Limit;

#[derive(Clone, Debug)]
pub struct LimitsClient {
    rest: RestClient,
}

impl LimitsClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Absolute quotas plus per-verb rate limits for the current project.
    pub async fn list_limits(&self) -> Result<Vec<Limit>, ClientError> {
        self.rest
            .get("limits", StatusCode::OK)
            .await?
            .field("limits")
    }
}
