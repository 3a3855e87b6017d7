//! # Controller Configuration
//!
//! Operator-level settings loaded from environment variables.

use super::{process_env, var_or_default, var_or_default_bool, var_or_default_str};
use crate::constants::{
    DEFAULT_CONTROL_PLANE_URL, DEFAULT_CREATE_REQUEUE_SECS, DEFAULT_DELETE_REQUEUE_SECS,
    DEFAULT_ERROR_BACKOFF_MAX_SECS, DEFAULT_ERROR_BACKOFF_START_SECS,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_MAX_CONCURRENT_REMOTE_CALLS,
    DEFAULT_POLL_BACKOFF_MAX_SECS, DEFAULT_POLL_BACKOFF_START_SECS,
    DEFAULT_PRECONDITION_REQUEUE_SECS, DEFAULT_RECONCILE_TIMEOUT_SECS,
    DEFAULT_REMOTE_REQUEST_TIMEOUT_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
};
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("text") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Number of reconcile workers per resource kind
    pub max_concurrent_reconciliations: usize,
    /// Steady-state resync interval once a service is Ready (seconds)
    pub resync_interval_secs: u64,
    /// Delay before the first readiness poll after a create (seconds)
    pub create_requeue_secs: u64,
    /// Delay before re-checking a delete that is still draining (seconds)
    pub delete_requeue_secs: u64,
    /// Fixed retry interval while a dependency is not ready (seconds)
    pub precondition_requeue_secs: u64,
    /// Readiness polling backoff start (seconds)
    pub poll_backoff_start_secs: u64,
    /// Readiness polling backoff ceiling (seconds)
    pub poll_backoff_max_secs: u64,
    /// Transient error backoff start (seconds)
    pub error_backoff_start_secs: u64,
    /// Transient error backoff ceiling (seconds)
    /// Reaching it marks the descriptor Degraded
    pub error_backoff_max_secs: u64,
    /// Deadline for a single reconcile step (seconds)
    pub reconcile_timeout_secs: u64,
    /// Control plane base URL
    pub control_plane_url: String,
    /// Control plane API token
    pub control_plane_token: Option<String>,
    /// Maximum in-flight control plane requests across all workers
    pub max_concurrent_remote_calls: usize,
    /// Per-request timeout for the control plane client (seconds)
    pub remote_request_timeout_secs: u64,
    /// Kinds to run (empty = every registered kind)
    pub enabled_kinds: Vec<String>,
    /// Restrict watches to a single namespace
    pub watch_namespace: Option<String>,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field(
                "max_concurrent_reconciliations",
                &self.max_concurrent_reconciliations,
            )
            .field("resync_interval_secs", &self.resync_interval_secs)
            .field("control_plane_url", &self.control_plane_url)
            .field(
                "control_plane_token",
                &self.control_plane_token.as_ref().map(|_| "***"),
            )
            .field("enabled_kinds", &self.enabled_kinds)
            .field("watch_namespace", &self.watch_namespace)
            .finish_non_exhaustive()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled_kinds = lookup("ENABLED_KINDS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            max_concurrent_reconciliations: var_or_default(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            )
            .max(1),
            resync_interval_secs: var_or_default(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            create_requeue_secs: var_or_default(
                &lookup,
                "CREATE_REQUEUE_SECS",
                DEFAULT_CREATE_REQUEUE_SECS,
            ),
            delete_requeue_secs: var_or_default(
                &lookup,
                "DELETE_REQUEUE_SECS",
                DEFAULT_DELETE_REQUEUE_SECS,
            ),
            precondition_requeue_secs: var_or_default(
                &lookup,
                "PRECONDITION_REQUEUE_SECS",
                DEFAULT_PRECONDITION_REQUEUE_SECS,
            ),
            poll_backoff_start_secs: var_or_default(
                &lookup,
                "POLL_BACKOFF_START_SECS",
                DEFAULT_POLL_BACKOFF_START_SECS,
            ),
            poll_backoff_max_secs: var_or_default(
                &lookup,
                "POLL_BACKOFF_MAX_SECS",
                DEFAULT_POLL_BACKOFF_MAX_SECS,
            ),
            error_backoff_start_secs: var_or_default(
                &lookup,
                "ERROR_BACKOFF_START_SECS",
                DEFAULT_ERROR_BACKOFF_START_SECS,
            ),
            error_backoff_max_secs: var_or_default(
                &lookup,
                "ERROR_BACKOFF_MAX_SECS",
                DEFAULT_ERROR_BACKOFF_MAX_SECS,
            ),
            reconcile_timeout_secs: var_or_default(
                &lookup,
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            control_plane_url: var_or_default_str(
                &lookup,
                "CONTROL_PLANE_URL",
                DEFAULT_CONTROL_PLANE_URL,
            ),
            control_plane_token: lookup("CONTROL_PLANE_TOKEN").filter(|t| !t.trim().is_empty()),
            max_concurrent_remote_calls: var_or_default(
                &lookup,
                "MAX_CONCURRENT_REMOTE_CALLS",
                DEFAULT_MAX_CONCURRENT_REMOTE_CALLS,
            )
            .max(1),
            remote_request_timeout_secs: var_or_default(
                &lookup,
                "REMOTE_REQUEST_TIMEOUT_SECS",
                DEFAULT_REMOTE_REQUEST_TIMEOUT_SECS,
            ),
            enabled_kinds,
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            log_level: var_or_default_str(&lookup, "LOG_LEVEL", "INFO"),
            log_format: LogFormat::parse(&var_or_default_str(&lookup, "LOG_FORMAT", "json")),
            enable_metrics: var_or_default_bool(&lookup, "ENABLE_METRICS", true),
        }
    }

    /// Steady-state resync interval
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Delay before the first readiness poll after a create
    pub fn create_requeue(&self) -> Duration {
        Duration::from_secs(self.create_requeue_secs)
    }

    /// Delay before re-checking a draining delete
    pub fn delete_requeue(&self) -> Duration {
        Duration::from_secs(self.delete_requeue_secs)
    }

    /// Retry interval while a dependency is not ready
    pub fn precondition_requeue(&self) -> Duration {
        Duration::from_secs(self.precondition_requeue_secs)
    }

    /// Deadline for a single reconcile step
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    /// Per-request timeout for the control plane client
    pub fn remote_request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_request_timeout_secs)
    }

    /// Whether `kind` should run under this configuration
    pub fn is_kind_enabled(&self, kind: &str) -> bool {
        self.enabled_kinds.is_empty()
            || self
                .enabled_kinds
                .iter()
                .any(|k| k.eq_ignore_ascii_case(kind))
    }
}
