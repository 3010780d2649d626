// # DNS Zone Trait
//
// Defines the interface to a managed DNS zone.
//
// ## Implementations
//
// - Google Cloud DNS: `v6sync-provider-gcloud` crate
//
// Zones only execute the call they are asked to make. Deciding whether a
// record needs to change is the reconciler's job.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// DNS record type managed by v6sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(crate::Error::Other(format!(
                "Unsupported record type '{other}'"
            ))),
        }
    }
}

/// A record set as it currently exists in the zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Fully-qualified record name (trailing dot)
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Record data, one entry per value
    pub rrdatas: Vec<String>,
}

impl DnsRecord {
    /// The single value of the record, if it has exactly one
    pub fn single_value(&self) -> Option<&str> {
        match self.rrdatas.as_slice() {
            [value] => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Trait for DNS zone implementations
///
/// # Names
///
/// Record names are passed fully-qualified (`example.com.`).
#[async_trait]
pub trait DnsZone: Send + Sync {
    /// Fetch a record set, `None` if it does not exist
    async fn get_record(
        &self,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>, crate::Error>;

    /// Create a record set with a single value
    async fn create_record(
        &self,
        name: &str,
        record_type: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<(), crate::Error>;

    /// Replace the data of an existing record set, keeping its TTL
    async fn replace_record(&self, existing: &DnsRecord, value: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_requires_exactly_one() {
        let mut record = DnsRecord {
            name: "example.com.".to_string(),
            record_type: RecordType::A,
            ttl: 300,
            rrdatas: vec!["192.0.2.1".to_string()],
        };
        assert_eq!(record.single_value(), Some("192.0.2.1"));

        record.rrdatas.push("192.0.2.2".to_string());
        assert_eq!(record.single_value(), None);

        record.rrdatas.clear();
        assert_eq!(record.single_value(), None);
    }

    #[test]
    fn record_type_wire_names() {
        assert_eq!("AAAA".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert_eq!(RecordType::A.to_string(), "A");
        assert!("CNAME".parse::<RecordType>().is_err());
    }
}
