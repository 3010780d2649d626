// # IP Source Trait
//
// Defines the interface for detecting the current public address.
//
// ## Implementations
//
// - HTTP lookup services and `dig` resolver queries: `v6sync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use v6sync_core::traits::{IpSource, IpVersion};
//
// let source = /* IpSource implementation */;
// let v6 = source.current(IpVersion::V6).await?;
// ```

use async_trait::async_trait;
use std::fmt;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for IP source implementations
///
/// A run calls [`IpSource::current`] at most once per version. Sources are
/// one-shot: no caching, no polling, no retries.
///
/// Implementations must return text that already parses as an address of the
/// requested version; anything else is reported as
/// [`crate::Error::Detection`].
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public address of the given version
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address text (e.g. `"2001:db8::abcd"`)
    /// - `Err(Error)`: If the address could not be determined
    async fn current(&self, version: IpVersion) -> Result<String, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
