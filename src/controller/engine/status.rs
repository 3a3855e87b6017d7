//! # Status Persistence
//!
//! Conditional writes of status and finalizers.
//!
//! Every write carries the resource version it was computed from. On a
//! conflict the latest version is re-read and the write retried once; a second
//! conflict surfaces as a transient error.

use super::Engine;
use crate::controller::types::{EngineError, ObjectKey};
use crate::crd::{ManagedResource, ManagedStatus};
use kube::ResourceExt;
use tracing::debug;

impl<K: ManagedResource> Engine<K> {
    /// Re-read the descriptor `obj` was loaded from
    pub(super) async fn reload(&self, obj: &K) -> Result<K, EngineError> {
        let key = ObjectKey::from_resource(obj);
        self.descriptors
            .get(&key)
            .await?
            .ok_or_else(|| EngineError::Vanished(key.to_string()))
    }

    /// Write `status` unless the stored status already equals it
    ///
    /// `observedGeneration` is stamped from `obj`, the version the step acted on.
    pub(super) async fn persist_status(
        &self,
        obj: &K,
        mut status: ManagedStatus,
    ) -> Result<K, EngineError> {
        status.observed_generation = obj.meta().generation;
        if obj.managed_status() == Some(&status) {
            debug!(
                "Skipping status update for {}: unchanged (phase={})",
                obj.name_any(),
                status.phase
            );
            return Ok(obj.clone());
        }

        match self.descriptors.update_status(obj, &status).await {
            Ok(updated) => Ok(updated),
            Err(e) if e.is_conflict() => {
                debug!("Status conflict for {}, retrying on latest version", obj.name_any());
                let latest = self.reload(obj).await?;
                if latest.managed_status() == Some(&status) {
                    return Ok(latest);
                }
                Ok(self.descriptors.update_status(&latest, &status).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `edit` to the finalizer list and write it if it changed
    pub(super) async fn edit_finalizers<F>(&self, obj: &K, edit: F) -> Result<K, EngineError>
    where
        F: Fn(&mut Vec<String>) + Send + Sync,
    {
        let mut finalizers = obj.finalizers().to_vec();
        edit(&mut finalizers);
        if finalizers == obj.finalizers() {
            return Ok(obj.clone());
        }

        match self.descriptors.update_finalizers(obj, finalizers).await {
            Ok(updated) => Ok(updated),
            Err(e) if e.is_conflict() => {
                debug!("Finalizer conflict for {}, retrying on latest version", obj.name_any());
                let latest = self.reload(obj).await?;
                let mut finalizers = latest.finalizers().to_vec();
                edit(&mut finalizers);
                if finalizers == latest.finalizers() {
                    return Ok(latest);
                }
                Ok(self.descriptors.update_finalizers(&latest, finalizers).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
