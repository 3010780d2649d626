// # Google Cloud DNS Zone
//
// This crate provides the `DnsZone` implementation backed by the Cloud DNS
// v1 REST API.
//
// ## Behavior
//
// - One HTTP request per trait call, no retries (a failed call skips one
//   target for this run)
// - HTTP timeout of 30 seconds
// - Status codes mapped to specific errors (401/403, 404, 409, 429, 5xx)
// - Dry-run mode: reads are performed, writes are only logged
//
// ## Security
//
// - The bearer token never appears in logs or `Debug` output
//
// ## API Reference
//
// - Base: `https://dns.googleapis.com/dns/v1/projects/{project}/managedZones/{zone}/rrsets`
// - Get record set: GET `rrsets/{name}/{type}`
// - Create record set: POST `rrsets`
// - Replace record set: PATCH `rrsets/{name}/{type}`

pub mod token;

pub use token::TokenSource;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use v6sync_core::traits::{DnsRecord, DnsZone, RecordType};
use v6sync_core::{Error, Result};

/// Cloud DNS API base URL
const CLOUD_DNS_API_BASE: &str = "https://dns.googleapis.com/dns/v1";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Collaborator name used in errors
const NAME: &str = "cloud-dns";

/// Resource record set as exchanged with the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

impl ResourceRecordSet {
    /// A single-value record set
    pub fn new(name: &str, record_type: RecordType, ttl: u32, value: &str) -> Self {
        Self {
            name: name.to_string(),
            record_type: record_type.as_str().to_string(),
            ttl,
            rrdatas: vec![value.to_string()],
        }
    }

    /// Convert into the zone-independent record
    pub fn into_record(self) -> Result<DnsRecord> {
        Ok(DnsRecord {
            record_type: self.record_type.parse()?,
            name: self.name,
            ttl: self.ttl,
            rrdatas: self.rrdatas,
        })
    }
}

/// Google Cloud DNS managed zone
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the zone will:
/// - Perform all GET requests
/// - Log the intended POST/PATCH payload
/// - **NOT** modify any record set
pub struct CloudDnsZone {
    /// GCP project ID
    project: String,

    /// Managed zone name (not its DNS name)
    zone: String,

    /// Bearer token source
    /// ⚠️ NEVER log the token
    token: TokenSource,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for CloudDnsZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDnsZone")
            .field("project", &self.project)
            .field("zone", &self.zone)
            .field("token", &self.token)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudDnsZone {
    /// Create a zone client
    ///
    /// # Errors
    ///
    /// `Error::Config` if the project or zone is empty, or if a static token
    /// is empty.
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        token: TokenSource,
        dry_run: bool,
    ) -> Result<Self> {
        let project = project.into();
        let zone = zone.into();

        if project.trim().is_empty() {
            return Err(Error::config("Cloud DNS project cannot be empty"));
        }
        if zone.trim().is_empty() {
            return Err(Error::config("Cloud DNS managed zone cannot be empty"));
        }
        if let TokenSource::Static(token) = &token
            && token.is_empty()
        {
            return Err(Error::config("Cloud DNS access token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            project,
            zone,
            token,
            client,
            dry_run,
        })
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Collection URL of the zone's record sets
    pub fn rrsets_url(&self) -> String {
        format!(
            "{}/projects/{}/managedZones/{}/rrsets",
            CLOUD_DNS_API_BASE, self.project, self.zone
        )
    }

    /// URL of one record set
    pub fn record_url(&self, name: &str, record_type: RecordType) -> String {
        format!("{}/{}/{}", self.rrsets_url(), name, record_type)
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&ResourceRecordSet>,
    ) -> Result<reqwest::Response> {
        let token = self.token.token(&self.client).await?;
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| Error::collaborator(NAME, format!("HTTP request failed: {e}")))
    }

    /// POST or PATCH a record set, or log it in dry-run mode
    async fn write(&self, method: Method, url: &str, rrset: &ResourceRecordSet) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send {} to {} with payload: {}",
                method,
                url,
                serde_json::to_string(rrset)?
            );
            return Ok(());
        }

        let response = self.request(method.clone(), url, Some(rrset)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&format!("{method} {}", rrset.name), status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsZone for CloudDnsZone {
    async fn get_record(&self, name: &str, record_type: RecordType) -> Result<Option<DnsRecord>> {
        let url = self.record_url(name, record_type);
        tracing::debug!("Looking up record set: {} {}", name, record_type);

        let response = self.request(Method::GET, &url, None).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&format!("get {name} {record_type}"), status, &body));
        }

        let rrset: ResourceRecordSet = response
            .json()
            .await
            .map_err(|e| Error::collaborator(NAME, format!("Failed to parse record set: {e}")))?;
        rrset.into_record().map(Some)
    }

    async fn create_record(
        &self,
        name: &str,
        record_type: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<()> {
        let rrset = ResourceRecordSet::new(name, record_type, ttl, value);
        self.write(Method::POST, &self.rrsets_url(), &rrset).await
    }

    async fn replace_record(&self, existing: &DnsRecord, value: &str) -> Result<()> {
        let rrset = replacement(existing, value);
        let url = self.record_url(&existing.name, existing.record_type);
        self.write(Method::PATCH, &url, &rrset).await
    }

    fn provider_name(&self) -> &'static str {
        "cloud-dns"
    }
}

/// Record set replacing `existing`'s data with `value`, keeping its TTL
pub fn replacement(existing: &DnsRecord, value: &str) -> ResourceRecordSet {
    ResourceRecordSet::new(&existing.name, existing.record_type, existing.ttl, value)
}

/// Map a non-success status to an error
pub fn status_error(action: &str, status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::collaborator(
            NAME,
            format!("{action}: authentication failed, invalid token or missing dns.admin role ({status})"),
        ),
        404 => Error::not_found(format!("{action}: managed zone or record set ({status})")),
        409 => Error::collaborator(
            NAME,
            format!("{action}: conflict, record set changed concurrently ({status})"),
        ),
        429 => Error::collaborator(NAME, format!("{action}: rate limit exceeded ({status})")),
        500..=599 => Error::collaborator(
            NAME,
            format!("{action}: server error (transient): {status} - {body}"),
        ),
        _ => Error::collaborator(NAME, format!("{action}: {status} - {body}")),
    }
}
