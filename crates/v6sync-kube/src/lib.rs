// # Kubernetes Collaborators
//
// This crate talks to the Kubernetes API server directly over REST and
// implements two traits:
//
// - `ServiceApi` (`service` module): the load-balancer IP annotation of a
//   `Service`
// - `PoolApi` (`pool` module): `spec.addresses` of a MetalLB `IPAddressPool`
//
// Writes are JSON merge patches (`application/merge-patch+json`) that touch
// only the field being reconciled.
//
// ## Authentication
//
// - In-cluster: service-account token and CA bundle mounted under
//   `/var/run/secrets/kubernetes.io/serviceaccount`, API server from
//   `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT`
// - Explicit: API URL and bearer token supplied by the caller

pub mod pool;
pub mod service;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use v6sync_core::{Error, Result};

/// Directory holding the mounted service-account credentials
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Content type of JSON merge patches
pub const MERGE_PATCH: &str = "application/merge-patch+json";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Collaborator name used in errors
const NAME: &str = "kubernetes";

/// Kubernetes API client
pub struct KubeClient {
    /// API server base URL, no trailing slash
    api_url: String,

    /// Bearer token
    /// ⚠️ NEVER log this value
    token: String,

    client: reqwest::Client,

    /// Dry-run mode: reads are performed, patches are only logged
    dry_run: bool,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient")
            .field("api_url", &self.api_url)
            .field("token", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl KubeClient {
    /// Client for an explicit API server and token
    pub fn new(api_url: impl Into<String>, token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(api_url.into(), token.into(), client, dry_run)
    }

    /// Client using the pod's service account
    ///
    /// # Errors
    ///
    /// - `Error::ConfigMissing` outside a cluster (no service host variable)
    /// - `Error::Io` if the token or CA bundle cannot be read
    pub fn in_cluster(dry_run: bool) -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            Error::config_missing("KUBERNETES_SERVICE_HOST is not set (not running in a cluster?)")
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        Self::from_service_account(
            Path::new(SERVICE_ACCOUNT_DIR),
            api_server_url(&host, &port),
            dry_run,
        )
    }

    /// Client using the `token` and `ca.crt` files of a service-account directory
    pub fn from_service_account(dir: &Path, api_url: String, dry_run: bool) -> Result<Self> {
        let token = std::fs::read_to_string(dir.join("token"))?;
        let ca = std::fs::read(dir.join("ca.crt"))?;
        let certificate = reqwest::Certificate::from_pem(&ca)
            .map_err(|e| Error::config(format!("Invalid service-account CA bundle: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .add_root_certificate(certificate)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Self::with_client(api_url, token.trim().to_string(), client, dry_run)
    }

    fn with_client(
        api_url: String,
        token: String,
        client: reqwest::Client,
        dry_run: bool,
    ) -> Result<Self> {
        if api_url.trim().is_empty() {
            return Err(Error::config("Kubernetes API URL cannot be empty"));
        }
        if token.is_empty() {
            return Err(Error::config("Kubernetes token cannot be empty"));
        }
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            client,
            dry_run,
        })
    }

    /// API server base URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GET an object as JSON
    async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .client
            .request(Method::GET, format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::collaborator(NAME, format!("GET {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&format!("GET {path}"), status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::collaborator(NAME, format!("GET {path}: invalid JSON: {e}")))
    }

    /// Apply a merge patch, or log it in dry-run mode
    async fn merge_patch(&self, path: &str, patch: &Value) -> Result<()> {
        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send PATCH {} with payload: {}", path, patch);
            return Ok(());
        }

        let response = self
            .client
            .request(Method::PATCH, format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, MERGE_PATCH)
            .body(patch.to_string())
            .send()
            .await
            .map_err(|e| Error::collaborator(NAME, format!("PATCH {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&format!("PATCH {path}"), status, &body));
        }
        Ok(())
    }
}

/// Base URL of the in-cluster API server (IPv6 hosts are bracketed)
pub fn api_server_url(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("https://[{host}]:{port}")
    } else {
        format!("https://{host}:{port}")
    }
}

/// Map a non-success status to an error, using the `Status` message if any
pub fn status_error(action: &str, status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    match status.as_u16() {
        401 | 403 => Error::collaborator(
            NAME,
            format!("{action}: forbidden ({status}), check RBAC for the service account: {message}"),
        ),
        404 => Error::not_found(format!("{action}: {message}")),
        409 => Error::collaborator(NAME, format!("{action}: conflict ({status}): {message}")),
        _ => Error::collaborator(NAME, format!("{action}: {status}: {message}")),
    }
}
