use reqwest::StatusCode;

use crate::error::ClientError;
use crate::rest::RestClient;
use trove_common::Flavor;

#[derive(Clone, Debug)]
pub struct FlavorsClient {
    rest: RestClient,
}

impl FlavorsClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn list_db_flavors(&self) -> Result<Vec<Flavor>, ClientError> {
        self.rest
            .get("flavors", StatusCode::OK)
            .await?
            .field("flavors")
    }

    pub async fn show_db_flavor(&self, flavor_id: &str) -> Result<Flavor, ClientError> {
        self.rest
            .get(&format!("flavors/{}", flavor_id), StatusCode::OK)
            .await?
            .field("flavor")
    }
}
