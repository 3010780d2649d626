//! Bearer tokens for the Cloud DNS API
//!
//! A token is either supplied up front or fetched once per process from the
//! GCE metadata server (the attached service account).

use serde::Deserialize;
use tokio::sync::OnceCell;

use v6sync_core::{Error, Result};

/// Metadata server endpoint returning the default service account token
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where the bearer token comes from
pub enum TokenSource {
    /// A token supplied by the environment
    Static(String),

    /// The instance metadata server, cached after the first fetch
    Metadata(OnceCell<String>),
}

impl TokenSource {
    /// A fixed token
    pub fn fixed(token: impl Into<String>) -> Self {
        TokenSource::Static(token.into())
    }

    /// Tokens from the metadata server
    pub fn metadata() -> Self {
        TokenSource::Metadata(OnceCell::new())
    }

    /// The current token
    pub async fn token(&self, client: &reqwest::Client) -> Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata(cell) => cell
                .get_or_try_init(|| fetch_metadata_token(client))
                .await
                .cloned(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TokenSource::Static(_) => "static",
            TokenSource::Metadata(_) => "metadata",
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenSource::{}(<REDACTED>)", self.kind())
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

async fn fetch_metadata_token(client: &reqwest::Client) -> Result<String> {
    tracing::debug!("Fetching Cloud DNS token from the metadata server");

    let response = client
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| Error::collaborator("cloud-dns", format!("Metadata server unreachable: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::collaborator(
            "cloud-dns",
            format!("Metadata server returned {}", response.status()),
        ));
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::http(format!("Failed to read metadata response: {e}")))?;

    parse_metadata_token(&body)
}

/// Extract the access token from a metadata server response
pub fn parse_metadata_token(body: &str) -> Result<String> {
    let token: MetadataToken = serde_json::from_str(body)?;
    if token.access_token.is_empty() {
        return Err(Error::collaborator("cloud-dns", "Metadata server returned an empty token"));
    }
    Ok(token.access_token)
}
