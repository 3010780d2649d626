//! `Service` load-balancer annotations

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::KubeClient;
use v6sync_core::Result;
use v6sync_core::traits::{Annotations, ServiceApi};

/// API path of a core/v1 Service
pub fn service_path(namespace: &str, name: &str) -> String {
    format!("/api/v1/namespaces/{namespace}/services/{name}")
}

/// String annotations of an object; non-string values are skipped
pub fn annotations_of(object: &Value) -> Annotations {
    object
        .pointer("/metadata/annotations")
        .and_then(Value::as_object)
        .map(|annotations| {
            annotations
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Merge patch setting one annotation
pub fn annotation_patch(key: &str, value: &str) -> Value {
    json!({ "metadata": { "annotations": { key: value } } })
}

#[async_trait]
impl ServiceApi for KubeClient {
    async fn read_service(&self, namespace: &str, name: &str) -> Result<Annotations> {
        let service = self.get(&service_path(namespace, name)).await?;
        Ok(annotations_of(&service))
    }

    async fn patch_service_annotation(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.merge_patch(&service_path(namespace, name), &annotation_patch(key, value))
            .await
    }
}
