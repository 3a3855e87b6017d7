//! # Declarative Object Store
//!
//! Access to descriptors and generated secrets.
//!
//! Descriptor writes are conditional on `metadata.resourceVersion`: a stale
//! write fails with [`StoreError::Conflict`] instead of overwriting a newer
//! version. [`KubeStore`] implements both traits on the Kubernetes API.

mod kube_store;

use crate::controller::ObjectKey;
use crate::crd::{ManagedResource, ManagedStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

pub use kube_store::KubeStore;

/// Store failure classes
#[derive(Debug, Error)]
pub enum StoreError {
    /// The written object changed since it was read
    #[error("conflict writing {0}: object was modified")]
    Conflict(String),
    /// The API server rejected the write as malformed
    #[error("invalid write to {0}: {1}")]
    Invalid(String, String),
    #[error("kubernetes API error: {0}")]
    Api(#[from] kube::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Retrying the same write will not succeed
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Invalid(..) | StoreError::Serialization(_))
    }

    /// Map a Kubernetes API failure for `what` onto a store error class
    pub fn from_kube(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(ref api_err) if api_err.code == 409 => {
                StoreError::Conflict(what.to_string())
            }
            kube::Error::Api(ref api_err) if api_err.code == 400 || api_err.code == 422 => {
                StoreError::Invalid(what.to_string(), err.to_string())
            }
            other => StoreError::Api(other),
        }
    }
}

/// Descriptor access for one kind
#[async_trait]
pub trait DescriptorStore<K: ManagedResource>: Send + Sync {
    /// Latest version of the descriptor, `None` once physically removed
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>;

    /// Replace the finalizer list, conditional on the version in `obj`
    ///
    /// Returns the written object. Clearing the list on a descriptor marked
    /// for deletion lets the store remove it.
    async fn update_finalizers(&self, obj: &K, finalizers: Vec<String>) -> Result<K, StoreError>;

    /// Replace the status, conditional on the version in `obj`
    async fn update_status(&self, obj: &K, status: &ManagedStatus) -> Result<K, StoreError>;
}

/// Generated secret access
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    /// Create the secret or replace its content
    async fn upsert_secret(&self, secret: &Secret) -> Result<(), StoreError>;
}
