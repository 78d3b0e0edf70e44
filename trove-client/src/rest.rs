use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::ClientError;
use crate::waiters::WaitSettings;

/// Decoded response of one API call. `body` is `None` when the service
/// answered with an empty payload (most 202/204 responses).
#[derive(Debug, Clone)]
pub struct ResponseBody {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ResponseBody {
    /// Decode the value stored under `key`, e.g. `{"instance": {...}}`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, ClientError> {
        let value = self
            .body
            .as_ref()
            .and_then(|b| b.get(key))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    pub fn into_value(self) -> Value {
        self.body.unwrap_or(Value::Null)
    }
}

/// One-request-per-call JSON client bound to a database service endpoint.
///
/// Every call names the status it expects; anything else comes back as an
/// error. 404 is reported as [`ClientError::NotFound`] so waiters can tell a
/// vanished resource apart from a broken request. Nothing is retried here.
#[derive(Clone, Debug)]
pub struct RestClient {
    http: Client,
    base_url: Url,
    headers: HeaderMap,
    wait: WaitSettings,
}

impl RestClient {
    pub fn new(
        base_url: &str,
        token: &str,
        http_timeout: Duration,
        wait: WaitSettings,
    ) -> Result<Self, ClientError> {
        // Without a request timeout a stalled endpoint hangs the whole run.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(http_timeout)
            .build()?;

        // Url::join replaces the last segment unless the base ends with '/'.
        let normalized = format!("{}/", base_url.trim().trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Auth-Token",
            HeaderValue::from_str(token.trim()).map_err(|_| ClientError::InvalidToken)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            http,
            base_url,
            headers,
            wait,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn wait_settings(&self) -> &WaitSettings {
        &self.wait
    }

    /// Root of the service (`scheme://host:port/`), where API versions live.
    pub fn root_url(&self) -> Result<Url, ClientError> {
        self.base_url
            .join("/")
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ClientError::InvalidUrl(path.to_string()))
    }

    pub async fn get(&self, path: &str, expected: StatusCode) -> Result<ResponseBody, ClientError> {
        let url = self.url(path)?;
        self.send::<()>(Method::GET, url, None, None, expected).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(String, String)],
        expected: StatusCode,
    ) -> Result<ResponseBody, ClientError> {
        let url = self.url(path)?;
        let query = (!query.is_empty()).then_some(query);
        self.send::<()>(Method::GET, url, query, None, expected).await
    }

    pub async fn get_url(&self, url: Url, expected: StatusCode) -> Result<ResponseBody, ClientError> {
        self.send::<()>(Method::GET, url, None, None, expected).await
    }

    pub async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        expected: StatusCode,
    ) -> Result<ResponseBody, ClientError> {
        let url = self.url(path)?;
        self.send(Method::POST, url, None, Some(body), expected).await
    }

    pub async fn put<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        expected: StatusCode,
    ) -> Result<ResponseBody, ClientError> {
        let url = self.url(path)?;
        self.send(Method::PUT, url, None, Some(body), expected).await
    }

    pub async fn patch<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        expected: StatusCode,
    ) -> Result<ResponseBody, ClientError> {
        let url = self.url(path)?;
        self.send(Method::PATCH, url, None, Some(body), expected).await
    }

    pub async fn delete(&self, path: &str, expected: StatusCode) -> Result<ResponseBody, ClientError> {
        let url = self.url(path)?;
        self.send::<()>(Method::DELETE, url, None, None, expected).await
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        query: Option<&[(String, String)]>,
        body: Option<&B>,
        expected: StatusCode,
    ) -> Result<ResponseBody, ClientError> {
        tracing::debug!("[Trove API] {} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .headers(self.headers.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!("[Trove API] {} {} -> 404", method, url);
            return Err(ClientError::NotFound {
                method,
                url: url.to_string(),
            });
        }
        if status != expected {
            tracing::warn!(
                "[Trove API] {} {} failed: status={} expected={} body={}",
                method,
                url,
                status.as_u16(),
                expected.as_u16(),
                text
            );
            return Err(ClientError::UnexpectedStatus {
                method,
                url: url.to_string(),
                expected,
                actual: status,
                body: text,
            });
        }

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text)?)
        };
        Ok(ResponseBody { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RestClient {
        RestClient::new(base, "token", Duration::from_secs(1), WaitSettings::default()).unwrap()
    }

    #[test]
    fn paths_are_joined_below_the_tenant_endpoint() {
        let c = client("http://trove.example:8779/v1.0/abc");
        assert_eq!(
            c.url("instances/i-1/users").unwrap().as_str(),
            "http://trove.example:8779/v1.0/abc/instances/i-1/users"
        );
        assert_eq!(
            c.url("/backups").unwrap().as_str(),
            "http://trove.example:8779/v1.0/abc/backups"
        );
        assert_eq!(c.root_url().unwrap().as_str(), "http://trove.example:8779/");
    }

    #[test]
    fn rejects_bad_endpoint_and_token() {
        assert!(matches!(
            RestClient::new("not a url", "t", Duration::from_secs(1), WaitSettings::default()),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            RestClient::new(
                "http://localhost/v1.0/p",
                "bad\ntoken",
                Duration::from_secs(1),
                WaitSettings::default()
            ),
            Err(ClientError::InvalidToken)
        ));
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        let body = ResponseBody {
            status: StatusCode::OK,
            body: Some(serde_json::json!({"backups": []})),
        };
        let backups: Vec<trove_common::Backup> = body.field("backups").unwrap();
        assert!(backups.is_empty());
        assert!(matches!(
            body.field::<trove_common::Backup>("backup"),
            Err(ClientError::Decode(_))
        ));
    }
}
