//! MetalLB `IPAddressPool` addresses

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::KubeClient;
use v6sync_core::Result;
use v6sync_core::traits::PoolApi;

/// API path of a metallb.io/v1beta1 IPAddressPool
pub fn pool_path(namespace: &str, name: &str) -> String {
    format!("/apis/metallb.io/v1beta1/namespaces/{namespace}/ipaddresspools/{name}")
}

/// `spec.addresses` of a pool, in order
pub fn addresses_of(pool: &Value) -> Vec<String> {
    pool.pointer("/spec/addresses")
        .and_then(Value::as_array)
        .map(|addresses| {
            addresses
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Merge patch replacing the address list
///
/// Merge patches replace arrays wholesale, so the full list is sent.
pub fn addresses_patch(addresses: &[String]) -> Value {
    json!({ "spec": { "addresses": addresses } })
}

#[async_trait]
impl PoolApi for KubeClient {
    async fn get_pool(&self, namespace: &str, name: &str) -> Result<Vec<String>> {
        let pool = self.get(&pool_path(namespace, name)).await?;
        Ok(addresses_of(&pool))
    }

    async fn patch_pool_addresses(
        &self,
        namespace: &str,
        name: &str,
        addresses: &[String],
    ) -> Result<()> {
        self.merge_patch(&pool_path(namespace, name), &addresses_patch(addresses))
            .await
    }
}
