//! # Error Policy
//!
//! Turns a failed step into a schedule.
//!
//! - Fatal: status `Failed`, no retry until the generation changes
//! - Transient: exponential backoff; status `Degraded` once the ceiling is hit

use super::Engine;
use crate::controller::types::{EngineError, ObjectKey, ReconcileResult, RequeueReason};
use crate::crd::{ManagedResource, Phase};
use crate::observability::metrics;
use tracing::{error, warn};

impl<K: ManagedResource> Engine<K> {
    pub(super) async fn handle_error(&self, key: &ObjectKey, err: EngineError) -> ReconcileResult {
        metrics::increment_reconciliation_errors(&self.kind, err.class());

        if err.is_fatal() {
            error!("❌ Reconciliation of {} {} failed permanently: {}", self.kind, key, err);
            Self::reset_backoff(&self.error_backoff, key);
            let message = err.to_string();
            self.record_phase(key, Phase::Failed, &message).await;
            return ReconcileResult::Terminal { message };
        }

        let (delay, at_ceiling) = Self::next_backoff(
            &self.error_backoff,
            key,
            self.settings.error_backoff_start,
            self.settings.error_backoff_max,
        );
        warn!(
            "Reconciliation of {} {} failed ({}), retrying in {}s: {}",
            self.kind,
            key,
            err.class(),
            delay.as_secs(),
            err
        );
        if at_ceiling {
            self.record_phase(key, Phase::Degraded, &format!("retrying after repeated failures: {err}"))
                .await;
        }
        ReconcileResult::RetryAfter {
            delay,
            reason: RequeueReason::ErrorBackoff,
        }
    }

    /// Best-effort status write from the latest version; failures are logged only
    async fn record_phase(&self, key: &ObjectKey, phase: Phase, message: &str) {
        let obj = match self.descriptors.get(key).await {
            Ok(Some(obj)) => obj,
            Ok(None) => return,
            Err(e) => {
                warn!("Could not read {} {} to record {}: {}", self.kind, key, phase, e);
                return;
            }
        };
        let mut status = obj.managed_status().cloned().unwrap_or_default();
        status.set_phase(phase, message);
        if let Err(e) = self.persist_status(&obj, status).await {
            warn!("Could not record {} for {} {}: {}", phase, self.kind, key, e);
        }
    }
}
