//! # Reconciliation Engine
//!
//! Drives one descriptor toward its desired state, one step per invocation.
//! The engine is generic over the kind and reaches the remote side only
//! through the kind's [`Adapter`].
//!
//! - `reconcile.rs` - The per-step state machine
//! - `finalizer.rs` - Finalizer bookkeeping and remote teardown
//! - `status.rs` - Conditional status writes
//! - `error_policy.rs` - Error classification, backoff and Degraded/Failed

mod error_policy;
mod finalizer;
mod reconcile;
mod status;

use crate::adapter::{Adapter, AdapterFactory};
use crate::config::ControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use crate::controller::dispatcher::KeyReconciler;
use crate::controller::types::{ObjectKey, ReconcileResult};
use crate::crd::ManagedResource;
use crate::remote::ControlPlane;
use crate::store::{DescriptorStore, SecretStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timing knobs for the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Revisit interval once Ready
    pub resync_interval: Duration,
    /// First readiness poll after a create
    pub create_requeue: Duration,
    /// Revisit interval while remote teardown drains
    pub delete_requeue: Duration,
    /// Fixed retry while a dependency is not ready
    pub precondition_requeue: Duration,
    pub poll_backoff_start: Duration,
    pub poll_backoff_max: Duration,
    pub error_backoff_start: Duration,
    pub error_backoff_max: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            resync_interval: config.resync_interval(),
            create_requeue: config.create_requeue(),
            delete_requeue: config.delete_requeue(),
            precondition_requeue: config.precondition_requeue(),
            poll_backoff_start: Duration::from_secs(config.poll_backoff_start_secs),
            poll_backoff_max: Duration::from_secs(config.poll_backoff_max_secs),
            error_backoff_start: Duration::from_secs(config.error_backoff_start_secs),
            error_backoff_max: Duration::from_secs(config.error_backoff_max_secs),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

/// Per-key backoff state, keyed by descriptor
type BackoffMap = Mutex<HashMap<ObjectKey, ExponentialBackoff>>;

/// Reconciliation engine for one kind
pub struct Engine<K: ManagedResource> {
    kind: String,
    descriptors: Arc<dyn DescriptorStore<K>>,
    secrets: Arc<dyn SecretStore>,
    client: Arc<dyn ControlPlane>,
    adapter: Arc<dyn Adapter<K>>,
    settings: EngineSettings,
    poll_backoff: BackoffMap,
    error_backoff: BackoffMap,
}

impl<K: ManagedResource> std::fmt::Debug for Engine<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &self.kind)
            .field("client", &self.client)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<K: ManagedResource> Engine<K> {
    pub fn new(
        descriptors: Arc<dyn DescriptorStore<K>>,
        secrets: Arc<dyn SecretStore>,
        client: Arc<dyn ControlPlane>,
        factory: AdapterFactory<K>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            kind: K::kind(&()).into_owned(),
            descriptors,
            secrets,
            client,
            adapter: factory(),
            settings,
            poll_backoff: Mutex::new(HashMap::new()),
            error_backoff: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Advance the key's backoff in `map`; returns the delay and whether it hit the ceiling
    fn next_backoff(
        map: &BackoffMap,
        key: &ObjectKey,
        start: Duration,
        max: Duration,
    ) -> (Duration, bool) {
        let mut states = map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let backoff = states
            .entry(key.clone())
            .or_insert_with(|| ExponentialBackoff::new(start, max));
        let delay = backoff.next_backoff();
        (delay, backoff.at_ceiling())
    }

    fn reset_backoff(map: &BackoffMap, key: &ObjectKey) {
        map.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }

    /// Drop all per-key state once a descriptor is gone
    fn forget(&self, key: &ObjectKey) {
        Self::reset_backoff(&self.poll_backoff, key);
        Self::reset_backoff(&self.error_backoff, key);
    }
}

#[async_trait]
impl<K: ManagedResource> KeyReconciler for Engine<K> {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn reconcile(&self, key: &ObjectKey) -> ReconcileResult {
        self.reconcile_key(key).await
    }
}
