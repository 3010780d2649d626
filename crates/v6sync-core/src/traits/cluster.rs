// # Cluster Traits
//
// Interfaces to the two cluster resources v6sync maintains:
//
// - a Service whose annotation lists its load-balancer IPs
// - an address pool whose address list contains a `/120` IPv6 network
//
// Both writes are merge patches touching only the named field.

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Object annotations, key → value
pub type Annotations = BTreeMap<String, String>;

/// Read and patch Service annotations
#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// Read the annotations of a service (empty map when it has none)
    async fn read_service(&self, namespace: &str, name: &str) -> Result<Annotations, crate::Error>;

    /// Set a single annotation on a service
    async fn patch_service_annotation(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), crate::Error>;
}

/// Read and patch address pools
#[async_trait]
pub trait PoolApi: Send + Sync {
    /// Read the address list of a pool
    async fn get_pool(&self, namespace: &str, name: &str) -> Result<Vec<String>, crate::Error>;

    /// Replace the address list of a pool
    async fn patch_pool_addresses(
        &self,
        namespace: &str,
        name: &str,
        addresses: &[String],
    ) -> Result<(), crate::Error>;
}
