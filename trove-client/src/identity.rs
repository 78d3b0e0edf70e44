use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::ClientError;
use trove_common::Settings;

/// A scoped token and the database endpoint it is valid for.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    pub url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

/// Pick the endpoint for `service_type` on `interface`, restricted to
/// `region` when one is configured.
pub fn find_endpoint<'a>(
    catalog: &'a [CatalogEntry],
    service_type: &str,
    interface: &str,
    region: Option<&str>,
) -> Option<&'a str> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| entry.endpoints.iter())
        .find(|ep| {
            ep.interface == interface && region.map_or(true, |r| ep.region.as_deref() == Some(r))
        })
        .map(|ep| ep.url.as_str())
}

/// Resolve the token and database endpoint to use for a run.
///
/// An explicit endpoint + token pair short-circuits Keystone; otherwise a
/// project-scoped password authentication is performed against the v3
/// identity API and the endpoint is taken from the returned catalog.
pub async fn authenticate(settings: &Settings) -> Result<Session, ClientError> {
    let identity = &settings.identity;
    if let (Some(endpoint), Some(token)) = (&identity.endpoint, &identity.auth_token) {
        tracing::info!("[Identity] using configured endpoint {}", endpoint);
        return Ok(Session {
            token: token.clone(),
            endpoint: endpoint.clone(),
        });
    }

    let auth_url = identity
        .auth_url
        .as_deref()
        .ok_or(ClientError::MissingCredential("OS_AUTH_URL"))?;
    let username = identity
        .username
        .as_deref()
        .ok_or(ClientError::MissingCredential("OS_USERNAME"))?;
    let password = identity
        .password
        .as_deref()
        .ok_or(ClientError::MissingCredential("OS_PASSWORD"))?;
    let project = identity
        .project_name
        .as_deref()
        .ok_or(ClientError::MissingCredential("OS_PROJECT_NAME"))?;

    let base = format!("{}/", auth_url.trim().trim_end_matches('/'));
    let url = Url::parse(&base)
        .and_then(|u| u.join("auth/tokens"))
        .map_err(|_| ClientError::InvalidUrl(auth_url.to_string()))?;

    let body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": username,
                        "domain": { "name": identity.user_domain_name },
                        "password": password
                    }
                }
            },
            "scope": {
                "project": {
                    "name": project,
                    "domain": { "name": identity.project_domain_name }
                }
            }
        }
    });

    tracing::info!("[Identity] POST {} (user={}, project={})", url, username, project);
    let http = Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(settings.http_timeout)
        .build()?;
    let resp = http.post(url.clone()).json(&body).send().await?;

    let status = resp.status();
    if status != StatusCode::CREATED {
        let text = resp.text().await.unwrap_or_default();
        return Err(ClientError::UnexpectedStatus {
            method: reqwest::Method::POST,
            url: url.to_string(),
            expected: StatusCode::CREATED,
            actual: status,
            body: text,
        });
    }

    let token = resp
        .headers()
        .get("X-Subject-Token")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(ClientError::MissingToken)?;
    let parsed: TokenResponse = serde_json::from_str(&resp.text().await?)?;

    let endpoint = find_endpoint(
        &parsed.token.catalog,
        &settings.database.catalog_type,
        &identity.endpoint_type,
        identity.region.as_deref(),
    )
    .ok_or_else(|| ClientError::CatalogEntryMissing {
        service_type: settings.database.catalog_type.clone(),
        interface: identity.endpoint_type.clone(),
        region: identity.region.clone(),
    })?
    .to_string();

    tracing::info!("[Identity] resolved {} endpoint {}", settings.database.catalog_type, endpoint);
    Ok(Session { token, endpoint })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Vec<CatalogEntry> {
        serde_json::from_value(json!([
            {"type": "compute", "name": "nova", "endpoints": [
                {"interface": "public", "region": "RegionOne", "url": "http://nova"}
            ]},
            {"type": "database", "name": "trove", "endpoints": [
                {"interface": "internal", "region": "RegionOne", "url": "http://trove-internal/v1.0/p"},
                {"interface": "public", "region": "RegionOne", "url": "http://trove-one/v1.0/p"},
                {"interface": "public", "region": "RegionTwo", "url": "http://trove-two/v1.0/p"}
            ]}
        ]))
        .unwrap()
    }

    #[test]
    fn endpoint_lookup_honours_type_interface_and_region() {
        let catalog = catalog();
        assert_eq!(
            find_endpoint(&catalog, "database", "public", None),
            Some("http://trove-one/v1.0/p")
        );
        assert_eq!(
            find_endpoint(&catalog, "database", "public", Some("RegionTwo")),
            Some("http://trove-two/v1.0/p")
        );
        assert_eq!(
            find_endpoint(&catalog, "database", "internal", None),
            Some("http://trove-internal/v1.0/p")
        );
        assert_eq!(find_endpoint(&catalog, "database", "admin", None), None);
        assert_eq!(find_endpoint(&catalog, "object-store", "public", None), None);
    }

    #[tokio::test]
    async fn explicit_endpoint_skips_keystone() {
        let settings = Settings::from_lookup(|key| match key {
            "TROVE_ENDPOINT" => Some("http://trove/v1.0/p".to_string()),
            "TROVE_AUTH_TOKEN" => Some("secret".to_string()),
            _ => None,
        })
        .unwrap();
        let session = authenticate(&settings).await.unwrap();
        assert_eq!(session.endpoint, "http://trove/v1.0/p");
        assert_eq!(session.token, "secret");
    }

    #[tokio::test]
    async fn missing_credentials_are_reported() {
        let settings = Settings::from_lookup(|key| match key {
            "OS_AUTH_URL" => Some("http://keystone/v3".to_string()),
            _ => None,
        })
        .unwrap();
        let err = authenticate(&settings).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingCredential("OS_USERNAME")));
    }
}
