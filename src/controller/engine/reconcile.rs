//! # Reconcile Step
//!
//! One pass of the state machine for a single key. Waiting is never a sleep:
//! every non-final branch returns a retry-after for the dispatcher to honor.

use super::Engine;
use crate::controller::secret;
use crate::controller::types::{EngineError, ObjectKey, ReconcileResult, RequeueReason};
use crate::crd::{ManagedResource, ManagedStatus, Phase};
use crate::observability::metrics;
use crate::remote::STATE_RUNNING;
use kube::ResourceExt;
use tracing::{debug, info};

impl<K: ManagedResource> Engine<K> {
    pub(super) async fn reconcile_key(&self, key: &ObjectKey) -> ReconcileResult {
        match self.step(key).await {
            Ok(result) => {
                // Any completed step ends a run of transient failures
                Self::reset_backoff(&self.error_backoff, key);
                result
            }
            Err(err) => self.handle_error(key, err).await,
        }
    }

    async fn step(&self, key: &ObjectKey) -> Result<ReconcileResult, EngineError> {
        let Some(obj) = self.descriptors.get(key).await? else {
            debug!("{} {} no longer exists", self.kind, key);
            self.forget(key);
            return Ok(ReconcileResult::Success { resync_after: None });
        };

        if obj.meta().deletion_timestamp.is_some() {
            return self.finalize(key, obj).await;
        }

        let obj = self.ensure_finalizer(obj).await?;
        let mut status = obj.managed_status().cloned().unwrap_or_default();

        // Failed sticks until the spec changes
        if status.phase == Phase::Failed && status.observed_generation == obj.meta().generation {
            debug!(
                "{} {} is Failed at generation {:?}, skipping",
                self.kind, key, status.observed_generation
            );
            return Ok(ReconcileResult::Terminal {
                message: status.message.unwrap_or_default(),
            });
        }

        if let Some(reason) = self.missing_auth_secret(&obj).await? {
            return self.wait(&obj, status, reason).await;
        }
        let client = self.client.as_ref();
        if !self.adapter.check_preconditions(client, &obj).await? {
            return self
                .wait(&obj, status, "project or VPC not ready".to_string())
                .await;
        }

        if self.adapter.exists(client, &obj).await? {
            let observed = self.adapter.update(client, &obj).await?;
            observed.apply_to(&mut status);
        } else {
            let observed = self.adapter.create(client, &obj).await?;
            info!("🚀 Requested {} service for {}", self.kind, key);
            observed.apply_to(&mut status);
            status.set_phase(Phase::Provisioning, "service creation requested");
            self.persist_status(&obj, status).await?;
            Self::reset_backoff(&self.poll_backoff, key);
            return Ok(ReconcileResult::RetryAfter {
                delay: self.settings.create_requeue,
                reason: RequeueReason::Provisioning,
            });
        }

        if !self.adapter.is_active(client, &obj).await? {
            let (delay, _) = Self::next_backoff(
                &self.poll_backoff,
                key,
                self.settings.poll_backoff_start,
                self.settings.poll_backoff_max,
            );
            status.set_phase(
                Phase::Provisioning,
                format!("waiting for service to become {STATE_RUNNING}"),
            );
            self.persist_status(&obj, status).await?;
            return Ok(ReconcileResult::RetryAfter {
                delay,
                reason: RequeueReason::Provisioning,
            });
        }

        let data = self.adapter.get_secret(client, &obj).await?;
        let secret_name = self.adapter.secret_name(&obj);
        secret::synthesize(self.secrets.as_ref(), &obj, &secret_name, data).await?;
        metrics::increment_secrets_synced(&self.kind);

        status.set_phase(Phase::Ready, "service is running");
        let previous = obj.managed_status().map(|s| s.phase);
        self.persist_status(&obj, status).await?;
        if previous != Some(Phase::Ready) {
            info!("✅ {} {} is Ready, secret {} written", self.kind, key, secret_name);
        }
        self.forget(key);
        Ok(ReconcileResult::Success {
            resync_after: Some(self.settings.resync_interval),
        })
    }

    /// Why the referenced auth secret is unusable, if it is
    async fn missing_auth_secret(&self, obj: &K) -> Result<Option<String>, EngineError> {
        let Some(reference) = self.adapter.get_secret_reference(obj) else {
            return Ok(None);
        };
        let namespace = obj.namespace().unwrap_or_default();
        let Some(secret) = self.secrets.get_secret(&namespace, &reference.name).await? else {
            return Ok(Some(format!("auth secret {} not found", reference.name)));
        };
        let has_key = secret
            .data
            .as_ref()
            .is_some_and(|data| data.contains_key(&reference.key));
        Ok((!has_key).then(|| {
            format!("auth secret {} has no key {}", reference.name, reference.key)
        }))
    }

    /// Record Waiting and retry at the fixed precondition interval
    async fn wait(
        &self,
        obj: &K,
        mut status: ManagedStatus,
        reason: String,
    ) -> Result<ReconcileResult, EngineError> {
        info!("⏳ {} {} waiting: {}", self.kind, obj.name_any(), reason);
        status.set_phase(Phase::Waiting, reason);
        self.persist_status(obj, status).await?;
        Ok(ReconcileResult::RetryAfter {
            delay: self.settings.precondition_requeue,
            reason: RequeueReason::WaitingForPrecondition,
        })
    }
}
