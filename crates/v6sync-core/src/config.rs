//! Target configuration for a v6sync run
//!
//! The binary reads its environment once and builds a [`SyncConfig`]; the
//! reconciler only ever sees this immutable value. The parsing helpers here
//! accept the comma-separated forms used by the environment:
//!
//! - domain lists: `a.example.com,b.example.com`
//! - `domain=suffix` pairs: `example.com=::1,www.example.com=::2`
//! - `domain=group` pairs: `example.com=web-servers`
//! - `domain=namespace/service` pairs: `example.com=ingress/nginx`
//! - `namespace/pool/suffix` triples: `metallb-system/public/::100`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Annotation MetalLB reads load-balancer IPs from
pub const DEFAULT_LB_ANNOTATION: &str = "metallb.universe.tf/loadBalancerIPs";

/// TTL used when a record has to be created
pub const DEFAULT_TTL: u32 = 300;

/// Everything a run needs to know about its targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Domains whose A record tracks the public IPv4 address
    #[serde(default)]
    pub ipv4_domains: Vec<String>,

    /// Domains whose AAAA record is prefix + configured suffix
    #[serde(default)]
    pub ipv6_domains: Vec<DomainSuffix>,

    /// Firewall group kept in sync with a domain's composed address
    #[serde(default)]
    pub firewall_groups: BTreeMap<String, String>,

    /// Service whose load-balancer annotation carries a domain's address
    #[serde(default)]
    pub services: BTreeMap<String, ServiceRef>,

    /// Address pools holding a composed `/120` network
    #[serde(default)]
    pub pools: Vec<PoolTarget>,

    /// TTL for newly created records
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Service annotation holding load-balancer IPs
    #[serde(default = "default_annotation")]
    pub service_annotation: String,
}

impl SyncConfig {
    /// Create an empty configuration with defaults
    pub fn new() -> Self {
        Self {
            ipv4_domains: Vec::new(),
            ipv6_domains: Vec::new(),
            firewall_groups: BTreeMap::new(),
            services: BTreeMap::new(),
            pools: Vec::new(),
            default_ttl: DEFAULT_TTL,
            service_annotation: DEFAULT_LB_ANNOTATION.to_string(),
        }
    }

    /// Add an IPv4 domain
    pub fn with_ipv4_domain(mut self, domain: impl Into<String>) -> Self {
        self.ipv4_domains.push(domain.into());
        self
    }

    /// Add an IPv6 `domain=suffix` target
    pub fn with_ipv6_domain(mut self, domain: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.ipv6_domains.push(DomainSuffix {
            domain: domain.into(),
            suffix: suffix.into(),
        });
        self
    }

    /// Map a domain to a firewall group
    pub fn with_firewall_group(mut self, domain: impl Into<String>, group: impl Into<String>) -> Self {
        self.firewall_groups.insert(domain.into(), group.into());
        self
    }

    /// Map a domain to a service
    pub fn with_service(mut self, domain: impl Into<String>, service: ServiceRef) -> Self {
        self.services.insert(domain.into(), service);
        self
    }

    /// Add a pool target
    pub fn with_pool(mut self, pool: PoolTarget) -> Self {
        self.pools.push(pool);
        self
    }

    /// Whether the IPv6 phase has anything to do
    pub fn has_ipv6_targets(&self) -> bool {
        !self.ipv6_domains.is_empty() || !self.pools.is_empty()
    }

    /// Whether any DNS record is managed
    pub fn has_dns_targets(&self) -> bool {
        !self.ipv4_domains.is_empty() || !self.ipv6_domains.is_empty()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.has_dns_targets() && self.pools.is_empty() {
            return Err(Error::config_missing(
                "No targets configured (IPv4 domains, IPv6 domains or pools)",
            ));
        }

        for domain in self
            .ipv4_domains
            .iter()
            .chain(self.ipv6_domains.iter().map(|d| &d.domain))
        {
            if domain.trim().is_empty() {
                return Err(Error::config("Domain name cannot be empty"));
            }
        }

        if self.default_ttl == 0 {
            return Err(Error::config("Default TTL must be > 0"));
        }

        if self.service_annotation.is_empty() {
            return Err(Error::config("Service annotation key cannot be empty"));
        }

        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_annotation() -> String {
    DEFAULT_LB_ANNOTATION.to_string()
}

/// A domain and the suffix composed onto the detected prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSuffix {
    /// DNS name (with or without trailing dot)
    pub domain: String,
    /// Partial IPv6 text for bytes 7..16
    pub suffix: String,
}

impl FromStr for DomainSuffix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (domain, suffix) = split_pair(s)?;
        Ok(Self {
            domain: domain.to_string(),
            suffix: suffix.to_string(),
        })
    }
}

/// A namespaced service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    /// Namespace
    pub namespace: String,
    /// Service name
    pub name: String,
}

impl ServiceRef {
    /// Create a new service reference
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl FromStr for ServiceRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(namespace, name))
            }
            _ => Err(Error::config(format!(
                "Expected namespace/service, got '{s}'"
            ))),
        }
    }
}

impl std::fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// An address pool and the suffix of the network it publishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTarget {
    /// Namespace
    pub namespace: String,
    /// Pool name
    pub pool: String,
    /// Partial IPv6 text for bytes 7..16
    pub suffix: String,
}

impl PoolTarget {
    /// Create a new pool target
    pub fn new(
        namespace: impl Into<String>,
        pool: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pool: pool.into(),
            suffix: suffix.into(),
        }
    }
}

impl FromStr for PoolTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(pool), Some(suffix))
                if !namespace.is_empty() && !pool.is_empty() =>
            {
                Ok(Self::new(namespace, pool, suffix))
            }
            _ => Err(Error::config(format!(
                "Expected namespace/pool/suffix, got '{s}'"
            ))),
        }
    }
}

impl std::fmt::Display for PoolTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.pool)
    }
}

/// Fully-qualified form of a DNS name (trailing dot)
pub fn fqdn(domain: &str) -> String {
    let domain = domain.trim();
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    }
}

/// Split a comma-separated list, dropping blanks
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `domain=suffix` pairs
pub fn parse_domain_suffixes(value: &str) -> Result<Vec<DomainSuffix>> {
    parse_list(value).iter().map(|s| s.parse()).collect()
}

/// Parse `domain=group` pairs
pub fn parse_firewall_groups(value: &str) -> Result<BTreeMap<String, String>> {
    parse_list(value)
        .iter()
        .map(|s| {
            let (domain, group) = split_pair(s)?;
            if group.is_empty() {
                return Err(Error::config(format!("Missing group name in '{s}'")));
            }
            Ok((domain.to_string(), group.to_string()))
        })
        .collect()
}

/// Parse `domain=namespace/service` pairs
pub fn parse_services(value: &str) -> Result<BTreeMap<String, ServiceRef>> {
    parse_list(value)
        .iter()
        .map(|s| {
            let (domain, service) = split_pair(s)?;
            Ok((domain.to_string(), service.parse()?))
        })
        .collect()
}

/// Parse `namespace/pool/suffix` triples
pub fn parse_pools(value: &str) -> Result<Vec<PoolTarget>> {
    parse_list(value).iter().map(|s| s.parse()).collect()
}

fn split_pair(s: &str) -> Result<(&str, &str)> {
    match s.trim().split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(Error::config(format!("Expected key=value, got '{s}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_domain_suffix_pairs() {
        let pairs = parse_domain_suffixes("example.com=::1, www.example.com=ab::2").unwrap();
        assert_eq!(
            pairs,
            vec![
                DomainSuffix {
                    domain: "example.com".to_string(),
                    suffix: "::1".to_string()
                },
                DomainSuffix {
                    domain: "www.example.com".to_string(),
                    suffix: "ab::2".to_string()
                },
            ]
        );
    }

    #[test]
    fn rejects_pair_without_separator() {
        assert!(matches!(
            parse_domain_suffixes("example.com"),
            Err(Error::Config(_))
        ));
        assert!(parse_firewall_groups("example.com=").is_err());
    }

    #[test]
    fn parses_services_and_pools() {
        let services = parse_services("example.com=ingress/nginx").unwrap();
        assert_eq!(services["example.com"], ServiceRef::new("ingress", "nginx"));
        assert!(parse_services("example.com=nginx").is_err());
        assert!(parse_services("example.com=a/b/c").is_err());

        let pools = parse_pools("metallb-system/public/::100,ns/empty/").unwrap();
        assert_eq!(pools[0], PoolTarget::new("metallb-system", "public", "::100"));
        assert_eq!(pools[1].suffix, "");
        assert!(parse_pools("metallb-system/public").is_err());
    }

    #[test]
    fn list_skips_blanks() {
        assert_eq!(parse_list(" a.com, ,b.com,"), vec!["a.com", "b.com"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn fqdn_appends_single_dot() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }

    #[test]
    fn empty_config_is_missing_targets() {
        assert!(matches!(
            SyncConfig::new().validate(),
            Err(Error::ConfigMissing(_))
        ));
        assert!(SyncConfig::new().with_ipv4_domain("a.com").validate().is_ok());
        assert!(
            SyncConfig::new()
                .with_pool(PoolTarget::new("ns", "pool", "::"))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: SyncConfig = serde_json::from_value(serde_json::json!({
            "ipv6_domains": [{ "domain": "example.com", "suffix": "::1" }]
        }))
        .unwrap();
        assert_eq!(config.default_ttl, DEFAULT_TTL);
        assert_eq!(config.service_annotation, DEFAULT_LB_ANNOTATION);
        assert!(config.has_ipv6_targets());
    }
}
