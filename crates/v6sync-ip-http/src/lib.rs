// # Public IP Detection
//
// This crate provides the `IpSource` implementations for v6sync.
//
// ## Sources
//
// - [`HttpIpSource`] (default): GET a plain-text "what is my IP" endpoint,
//   one URL per address family
// - [`DigIpSource`]: ask an OpenDNS resolver for `myip.opendns.com` through
//   the `dig` command-line tool
//
// Both are one-shot: every call performs a fresh lookup. The answer is
// validated against the requested family before it is returned.

pub mod dig;

pub use dig::DigIpSource;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use v6sync_core::traits::{IpSource, IpVersion};
use v6sync_core::{Error, Result};

/// Default IPv4 lookup service (plain-text body)
pub const DEFAULT_URL_V4: &str = "https://api.ipify.org";

/// Default IPv6 lookup service (plain-text body)
pub const DEFAULT_URL_V6: &str = "https://api6.ipify.org";

/// Request timeout for lookups
const LOOKUP_TIMEOUT_SECS: u64 = 10;

/// HTTP-based IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL answering with the IPv4 address
    url_v4: String,

    /// URL answering with the IPv6 address
    url_v6: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source using the default lookup services
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_URL_V4, DEFAULT_URL_V6)
    }

    /// Create a source with custom lookup URLs
    pub fn with_urls(url_v4: impl Into<String>, url_v6: impl Into<String>) -> Self {
        Self {
            url_v4: url_v4.into(),
            url_v6: url_v6.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(LOOKUP_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// The lookup URL for a version
    pub fn url(&self, version: IpVersion) -> &str {
        match version {
            IpVersion::V4 => &self.url_v4,
            IpVersion::V6 => &self.url_v6,
        }
    }

    async fn fetch(&self, version: IpVersion) -> Result<String> {
        let url = self.url(version);
        tracing::debug!("Looking up public {} via {}", version, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::detection(format!("{version} lookup request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::detection(format!(
                "{version} lookup returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::detection(format!("Failed to read {version} lookup body: {e}")))?;

        parse_answer(version, &body)
    }
}

impl Default for HttpIpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self, version: IpVersion) -> Result<String> {
        self.fetch(version).await
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Validate a lookup answer against the requested family.
///
/// Surrounding whitespace is ignored; the address is returned in its
/// standard textual form.
pub fn parse_answer(version: IpVersion, body: &str) -> Result<String> {
    let text = body.trim();
    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::detection(format!("Lookup answer '{text}' is not an IP address")))?;

    match (version, ip) {
        (IpVersion::V4, IpAddr::V4(ip)) => Ok(ip.to_string()),
        (IpVersion::V6, IpAddr::V6(ip)) => Ok(ip.to_string()),
        (expected, other) => Err(Error::detection(format!(
            "Expected {expected}, got {other}"
        ))),
    }
}

/// Whether `text` is an address of the given family
pub(crate) fn is_family(version: IpVersion, text: &str) -> bool {
    match version {
        IpVersion::V4 => text.parse::<Ipv4Addr>().is_ok(),
        IpVersion::V6 => text.parse::<Ipv6Addr>().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_are_trimmed_and_checked() {
        assert_eq!(
            parse_answer(IpVersion::V4, "192.0.2.7\n").unwrap(),
            "192.0.2.7"
        );
        assert_eq!(
            parse_answer(IpVersion::V6, " 2001:DB8::abcd ").unwrap(),
            "2001:db8::abcd"
        );
    }

    #[test]
    fn wrong_family_is_a_detection_error() {
        let err = parse_answer(IpVersion::V6, "192.0.2.7").unwrap_err();
        assert!(matches!(err, Error::Detection(_)));

        let err = parse_answer(IpVersion::V4, "2001:db8::1").unwrap_err();
        assert!(matches!(err, Error::Detection(_)));
    }

    #[test]
    fn non_address_body_is_rejected() {
        assert!(parse_answer(IpVersion::V4, "<html>Too Many Requests</html>").is_err());
        assert!(parse_answer(IpVersion::V4, "").is_err());
    }

    #[test]
    fn urls_follow_version() {
        let source = HttpIpSource::new();
        assert_eq!(source.url(IpVersion::V4), DEFAULT_URL_V4);
        assert_eq!(source.url(IpVersion::V6), DEFAULT_URL_V6);

        let source = HttpIpSource::with_urls("http://v4.test", "http://v6.test");
        assert_eq!(source.url(IpVersion::V6), "http://v6.test");
    }

    #[test]
    fn family_check() {
        assert!(is_family(IpVersion::V4, "192.0.2.1"));
        assert!(!is_family(IpVersion::V4, "2001:db8::1"));
        assert!(is_family(IpVersion::V6, "2001:db8::1"));
    }
}
