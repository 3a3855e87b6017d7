//! # Finalizer
//!
//! The finalizer is added before any mutating remote call and removed only
//! after the adapter confirms the remote service is gone.

use super::Engine;
use crate::adapter::DeleteOutcome;
use crate::constants::SERVICE_FINALIZER;
use crate::controller::types::{EngineError, ObjectKey, ReconcileResult, RequeueReason};
use crate::crd::{ManagedResource, Phase};
use kube::ResourceExt;
use tracing::{info, warn};

fn has_finalizer<K: ManagedResource>(obj: &K) -> bool {
    obj.finalizers().iter().any(|f| f == SERVICE_FINALIZER)
}

impl<K: ManagedResource> Engine<K> {
    /// Add the finalizer if missing; returns the latest written version
    pub(super) async fn ensure_finalizer(&self, obj: K) -> Result<K, EngineError> {
        if has_finalizer(&obj) {
            return Ok(obj);
        }
        let updated = self
            .edit_finalizers(&obj, |finalizers| {
                if !finalizers.iter().any(|f| f == SERVICE_FINALIZER) {
                    finalizers.push(SERVICE_FINALIZER.to_string());
                }
            })
            .await?;
        info!("Added finalizer to {} {}", self.kind, obj.name_any());
        Ok(updated)
    }

    /// Tear down the remote service of a descriptor marked for deletion
    ///
    /// Anything short of a confirmed absence keeps the finalizer.
    pub(super) async fn finalize(
        &self,
        key: &ObjectKey,
        obj: K,
    ) -> Result<ReconcileResult, EngineError> {
        if !has_finalizer(&obj) {
            self.forget(key);
            return Ok(ReconcileResult::Success { resync_after: None });
        }

        match self.adapter.delete(self.client.as_ref(), &obj).await {
            Ok(DeleteOutcome::Gone) => {
                self.edit_finalizers(&obj, |finalizers| {
                    finalizers.retain(|f| f != SERVICE_FINALIZER);
                })
                .await?;
                self.forget(key);
                info!("✅ Remote service for {} {} removed, finalizer released", self.kind, key);
                Ok(ReconcileResult::Success { resync_after: None })
            }
            Ok(DeleteOutcome::Pending) => {
                let mut status = obj.managed_status().cloned().unwrap_or_default();
                status.set_phase(Phase::Deleting, "waiting for remote service to be removed");
                self.persist_status(&obj, status).await?;
                Ok(ReconcileResult::RetryAfter {
                    delay: self.settings.delete_requeue,
                    reason: RequeueReason::Deleting,
                })
            }
            Err(err) if !err.is_fatal() => {
                warn!("Delete of {} {} failed, keeping finalizer: {}", self.kind, key, err);
                Ok(ReconcileResult::RetryAfter {
                    delay: self.settings.delete_requeue,
                    reason: RequeueReason::Deleting,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
