//! # Kubernetes Store
//!
//! [`DescriptorStore`] and [`SecretStore`] on `kube::Api`.

use super::{DescriptorStore, SecretStore, StoreError};
use crate::constants::OPERATOR_NAME;
use crate::controller::ObjectKey;
use crate::crd::{ManagedResource, ManagedStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Kubernetes-backed store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for<K: ManagedResource>(&self, obj: &K) -> Api<K> {
        Api::namespaced(self.client.clone(), &obj.namespace().unwrap_or_default())
    }
}

fn describe<K: ManagedResource>(obj: &K) -> String {
    format!(
        "{} {}/{}",
        K::kind(&()),
        obj.namespace().unwrap_or_default(),
        obj.name_any()
    )
}

#[async_trait]
impl<K: ManagedResource> DescriptorStore<K> for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name)
            .await
            .map_err(|e| StoreError::from_kube(e, &key.to_string()))
    }

    async fn update_finalizers(&self, obj: &K, finalizers: Vec<String>) -> Result<K, StoreError> {
        let what = describe(obj);
        // resourceVersion turns the merge patch into a conditional write
        let patch = json!({
            "metadata": {
                "resourceVersion": obj.resource_version(),
                "finalizers": finalizers,
            }
        });
        debug!(resource = %what, ?finalizers, "Writing finalizers");
        self.api_for(obj)
            .patch(&obj.name_any(), &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| StoreError::from_kube(e, &what))
    }

    async fn update_status(&self, obj: &K, status: &ManagedStatus) -> Result<K, StoreError> {
        let what = describe(obj);
        let patch = json!({
            "metadata": { "resourceVersion": obj.resource_version() },
            "status": serde_json::to_value(status)?,
        });
        debug!(resource = %what, phase = %status.phase, "Writing status");
        self.api_for(obj)
            .patch_status(&obj.name_any(), &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| StoreError::from_kube(e, &what))
    }
}

#[async_trait]
impl SecretStore for KubeStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("Secret {namespace}/{name}")))
    }

    async fn upsert_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let namespace = secret.namespace().unwrap_or_default();
        let name = secret.name_any();
        let what = format!("Secret {namespace}/{name}");
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        // Server-side apply as sole field manager: keys dropped from `data` are removed
        api.patch(
            &name,
            &PatchParams::apply(OPERATOR_NAME).force(),
            &Patch::Apply(secret),
        )
        .await
        .map_err(|e| StoreError::from_kube(e, &what))?;
        Ok(())
    }
}
