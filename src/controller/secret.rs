//! # Secret Synthesizer
//!
//! Builds the generated connection secret from adapter output and upserts it
//! in one write, owned by the descriptor so it is garbage collected with it.

use crate::adapter::SecretData;
use crate::constants::{MANAGED_BY_LABEL, OPERATOR_NAME};
use crate::crd::ManagedResource;
use crate::store::{SecretStore, StoreError};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Drop fields whose value is empty
pub fn prune_empty(data: SecretData) -> SecretData {
    data.into_iter().filter(|(_, v)| !v.is_empty()).collect()
}

/// Build the secret `name` in the owner's namespace
pub fn build_secret<K: ManagedResource>(owner: &K, name: &str, data: SecretData) -> Secret {
    let labels = BTreeMap::from([
        ("app".to_string(), owner.name_any()),
        (MANAGED_BY_LABEL.to_string(), OPERATOR_NAME.to_string()),
    ]);
    let data = prune_empty(data)
        .into_iter()
        .map(|(k, v)| (k, ByteString(v.into_bytes())))
        .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: owner.namespace(),
            labels: Some(labels),
            owner_references: owner.controller_owner_ref(&()).map(|r| {
                vec![OwnerReference {
                    block_owner_deletion: Some(true),
                    ..r
                }]
            }),
            ..ObjectMeta::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Secret::default()
    }
}

/// Write the connection secret for `owner`
///
/// No retries here; a failure surfaces to the engine's error policy.
///
/// # Errors
///
/// Returns the store error from the upsert.
pub async fn synthesize<K: ManagedResource>(
    store: &dyn SecretStore,
    owner: &K,
    name: &str,
    data: SecretData,
) -> Result<(), StoreError> {
    let secret = build_secret(owner, name, data);
    store.upsert_secret(&secret).await
}
