//! Typed REST client for the NetBox API.
//!
//! One generic CRUD surface parameterised by entity family: paginated
//! list-all, create, patch, delete, plus the version probe used at
//! startup. Transport failures and 5xx responses are retried a bounded
//! number of times with exponential backoff; 4xx responses surface
//! NetBox's validation message verbatim.

use std::path::Path;
use std::time::Duration;

use reqwest::{header, Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::objects::{Id, JsonMap, NetboxEntity};

/// Page size for list endpoints.
const PAGE_LIMIT: u32 = 100;
/// Attempts per request, counting the first one.
const MAX_ATTEMPTS: u32 = 3;
/// Base backoff; doubles per attempt.
const BACKOFF: Duration = Duration::from_millis(500);

/// Required NetBox major version.
pub const REQUIRED_MAJOR_VERSION: u32 = 4;

pub struct NetboxClient {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Page<E> {
    count: u64,
    #[serde(default)]
    next: Option<String>,
    results: Vec<E>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(rename = "netbox-version")]
    netbox_version: String,
}

impl NetboxClient {
    /// Build a client for `base_url` (scheme://host:port, no trailing
    /// slash). `validate_cert = false` disables TLS verification; a CA
    /// bundle may be supplied instead.
    pub fn new(
        base_url: &str,
        api_token: &str,
        validate_cert: bool,
        timeout_secs: u64,
        ca_file: Option<&Path>,
    ) -> Result<Self, RemoteError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));
        if !validate_cert {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(path) = ca_file {
            let pem = std::fs::read(path).map_err(|e| {
                RemoteError::Configuration(format!("reading CA file {}: {e}", path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                RemoteError::Configuration(format!("parsing CA file {}: {e}", path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| RemoteError::Configuration(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: api_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, RemoteError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self
                .http
                .request(method.clone(), url)
                .header(header::AUTHORIZATION, format!("Token {}", self.token))
                .header(header::ACCEPT, "application/json");
            if let Some(json_body) = body {
                request = request.json(json_body);
            }
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let retryable = status.is_server_error()
                        || status == StatusCode::TOO_MANY_REQUESTS;
                    if retryable && attempt < MAX_ATTEMPTS {
                        let wait = BACKOFF * 2u32.saturating_pow(attempt - 1);
                        warn!(%url, %status, attempt, "server error, retrying");
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    let wait = BACKOFF * 2u32.saturating_pow(attempt - 1);
                    warn!(%url, error = %e, attempt, "request failed, retrying");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    return Err(RemoteError::transport_with_source(
                        format!("request to {url} failed after {attempt} attempts"),
                        e,
                    ));
                }
            }
        }
    }

    /// Turn a non-success response into an API error carrying the body.
    async fn api_error(url: &str, response: Response) -> RemoteError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        RemoteError::Api {
            status,
            url: url.to_string(),
            message,
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        url: &str,
        response: Response,
    ) -> Result<T, RemoteError> {
        if !response.status().is_success() {
            return Err(Self::api_error(url, response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport_with_source("reading response body", e))?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// NetBox version string from the status endpoint.
    pub async fn version(&self) -> Result<String, RemoteError> {
        let url = self.url("/api/status/");
        let response = self.send_with_retry(Method::GET, &url, None).await?;
        let status: Status = Self::decode(&url, response).await?;
        Ok(status.netbox_version)
    }

    /// Assert the server's major version is supported.
    pub async fn check_version(&self) -> Result<String, RemoteError> {
        let version = self.version().await?;
        let major: u32 = version
            .split('.')
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| RemoteError::Decode {
                url: self.url("/api/status/"),
                message: format!("unparseable version string {version:?}"),
            })?;
        if major < REQUIRED_MAJOR_VERSION {
            return Err(RemoteError::UnsupportedVersion {
                version,
                required: REQUIRED_MAJOR_VERSION,
            });
        }
        Ok(version)
    }

    /// Fetch every object of a family, concatenating all pages.
    pub async fn list_all<E: NetboxEntity>(&self) -> Result<Vec<E>, RemoteError> {
        let mut all = Vec::new();
        let mut offset = 0u64;
        loop {
            let url = format!(
                "{}?limit={PAGE_LIMIT}&offset={offset}",
                self.url(E::API_PATH)
            );
            let response = self.send_with_retry(Method::GET, &url, None).await?;
            let page: Page<E> = Self::decode(&url, response).await?;
            let fetched = page.results.len() as u64;
            all.extend(page.results);
            offset += fetched;
            if page.next.is_none() || fetched == 0 || offset >= page.count {
                break;
            }
        }
        debug!(family = E::API_PATH, count = all.len(), "listed all objects");
        Ok(all)
    }

    /// Create an object; returns the server's view including its id.
    pub async fn create<E: NetboxEntity>(&self, body: &JsonMap) -> Result<E, RemoteError> {
        let url = self.url(E::API_PATH);
        let payload = Value::Object(body.clone());
        let response = self.send_with_retry(Method::POST, &url, Some(&payload)).await?;
        Self::decode(&url, response).await
    }

    /// Patch only the changed fields of an object.
    pub async fn patch<E: NetboxEntity>(
        &self,
        id: Id,
        fields: &JsonMap,
    ) -> Result<E, RemoteError> {
        let url = format!("{}{id}/", self.url(E::API_PATH));
        let payload = Value::Object(fields.clone());
        let response = self.send_with_retry(Method::PATCH, &url, Some(&payload)).await?;
        Self::decode(&url, response).await
    }

    /// Patch by API path without a typed response; used for orphan
    /// tagging where the family is only known dynamically.
    pub async fn patch_raw(
        &self,
        api_path: &str,
        id: Id,
        fields: &JsonMap,
    ) -> Result<(), RemoteError> {
        let url = format!("{}{id}/", self.url(api_path));
        let payload = Value::Object(fields.clone());
        let response = self.send_with_retry(Method::PATCH, &url, Some(&payload)).await?;
        if !response.status().is_success() {
            return Err(Self::api_error(&url, response).await);
        }
        Ok(())
    }

    /// Delete by id. A 404 is treated as already gone.
    pub async fn delete(&self, api_path: &str, id: Id) -> Result<(), RemoteError> {
        let url = format!("{}{id}/", self.url(api_path));
        let response = self.send_with_retry(Method::DELETE, &url, None).await?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(Self::api_error(&url, response).await);
        }
        Ok(())
    }
}

impl std::fmt::Debug for NetboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetboxClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
