//! # Types
//!
//! Core types shared by the engine and the dispatcher.

use crate::remote::RemoteError;
use crate::store::StoreError;
use kube::ResourceExt;
use std::time::Duration;
use thiserror::Error;

/// Namespace-scoped identity of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_resource<K: ResourceExt>(obj: &K) -> Self {
        Self::new(obj.namespace().unwrap_or_default(), obj.name_any())
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Why a key was scheduled again
/// Tracked for logs and the requeue metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueReason {
    /// Remote service requested, polling until it runs
    Provisioning,
    /// Project, VPC or auth secret not ready
    WaitingForPrecondition,
    /// Remote teardown still in progress
    Deleting,
    /// Transient failure, exponential backoff
    ErrorBackoff,
    /// Step exceeded its deadline
    Timeout,
}

impl RequeueReason {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RequeueReason::Provisioning => "provisioning",
            RequeueReason::WaitingForPrecondition => "waiting-for-precondition",
            RequeueReason::Deleting => "deleting",
            RequeueReason::ErrorBackoff => "error-backoff",
            RequeueReason::Timeout => "timeout",
        }
    }
}

/// Outcome of one reconcile step, consumed by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Converged; revisit after `resync_after` if set
    Success { resync_after: Option<Duration> },
    /// Not converged; redeliver the key after `delay`
    RetryAfter {
        delay: Duration,
        reason: RequeueReason,
    },
    /// Permanent failure; wait for the next spec change
    Terminal { message: String },
}

impl ReconcileResult {
    /// Delay the dispatcher should honor, if any
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            ReconcileResult::Success { resync_after } => *resync_after,
            ReconcileResult::RetryAfter { delay, .. } => Some(*delay),
            ReconcileResult::Terminal { .. } => None,
        }
    }

    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileResult::Success { .. } => "success",
            ReconcileResult::RetryAfter { .. } => "retry",
            ReconcileResult::Terminal { .. } => "terminal",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The descriptor vanished between a read and the following write
    #[error("descriptor {0} disappeared during reconciliation")]
    Vanished(String),
}

impl EngineError {
    /// Fatal errors are recorded as Failed and not retried
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Remote(e) => e.is_fatal(),
            EngineError::Store(e) => e.is_fatal(),
            EngineError::Vanished(_) => false,
        }
    }

    /// Short label for metrics
    pub fn class(&self) -> &'static str {
        match self {
            EngineError::Remote(e) => e.class(),
            EngineError::Store(e) if e.is_conflict() => "conflict",
            EngineError::Store(e) if e.is_fatal() => "fatal",
            EngineError::Store(_) => "store",
            EngineError::Vanished(_) => "vanished",
        }
    }
}
