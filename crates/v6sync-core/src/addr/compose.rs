// # Address Composer
//
// Builds the addresses v6sync publishes from the prefix of the detected
// public address and a suffix from configuration:
//
// ```text
//  byte  0                       6 7                                15
//       ├─────── prefix (56) ──────┼──────────── suffix (72) ─────────┤
// ```

use std::fmt;

use super::{Ipv6Bytes, PREFIX_LEN, codec};
use crate::error::Result;

/// Prefix length published for load-balancer pool entries
pub const POOL_PREFIX_LEN: u8 = 120;

/// The first 7 bytes of a detected public IPv6 address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix([u8; PREFIX_LEN]);

impl Prefix {
    /// Take the prefix from a full address
    pub fn from_bytes(full: &Ipv6Bytes) -> Self {
        let mut prefix = [0u8; PREFIX_LEN];
        prefix.copy_from_slice(&full[..PREFIX_LEN]);
        Self(prefix)
    }

    /// Parse a detected address and keep its prefix
    pub fn from_address(text: &str) -> Result<Self> {
        Ok(Self::from_bytes(&codec::parse(text)?))
    }

    /// The raw prefix bytes
    pub fn as_bytes(&self) -> &[u8; PREFIX_LEN] {
        &self.0
    }

    /// Prefix followed by the expanded suffix
    pub fn compose(&self, suffix: &str) -> Result<Ipv6Bytes> {
        let tail = codec::parse_partial(suffix)?;
        let mut address = [0u8; 16];
        address[..PREFIX_LEN].copy_from_slice(&self.0);
        address[PREFIX_LEN..].copy_from_slice(&tail);
        Ok(address)
    }

    /// The composed address as text with `/120` appended.
    ///
    /// The host byte is kept as composed, not zeroed.
    pub fn network_address(&self, suffix: &str) -> Result<String> {
        let address = self.compose(suffix)?;
        Ok(format!("{}/{POOL_PREFIX_LEN}", codec::serialize(&address)))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut padded = [0u8; 16];
        padded[..PREFIX_LEN].copy_from_slice(&self.0);
        write!(f, "{}/{}", codec::serialize(&padded), PREFIX_LEN * 8)
    }
}

/// Compose a final address from the prefix of `full` and a suffix spec.
///
/// # Example
///
/// ```
/// use v6sync_core::addr::{codec, compose};
///
/// let detected = codec::parse("2001:db8::abcd").unwrap();
/// let address = compose(&detected, "::1").unwrap();
/// assert_eq!(codec::serialize(&address), "2001:db8::1");
/// ```
pub fn compose(full: &Ipv6Bytes, suffix: &str) -> Result<Ipv6Bytes> {
    Prefix::from_bytes(full).compose(suffix)
}

/// Pool network literal (`<address>/120`) for a prefix and suffix
pub fn network_address(prefix: &[u8; PREFIX_LEN], suffix: &str) -> Result<String> {
    Prefix(*prefix).network_address(suffix)
}
