//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager / application name used for server-side apply and labels
pub const OPERATOR_NAME: &str = "managed-service-operator";

/// Finalizer token guarding remote teardown
pub const SERVICE_FINALIZER: &str = "service-finalizer.aiven.io";

/// Label marking generated secrets so the secret watch can find them
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default steady-state resync interval once a service is ready (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 30 * 60;

/// Default delay before polling readiness after a create (seconds)
pub const DEFAULT_CREATE_REQUEUE_SECS: u64 = 10;

/// Default delay before re-checking a draining delete (seconds)
pub const DEFAULT_DELETE_REQUEUE_SECS: u64 = 10;

/// Default delay while a dependency (project, VPC, auth secret) is not ready (seconds)
pub const DEFAULT_PRECONDITION_REQUEUE_SECS: u64 = 10;

/// Readiness polling backoff start (seconds)
pub const DEFAULT_POLL_BACKOFF_START_SECS: u64 = 5;

/// Readiness polling backoff ceiling (seconds)
pub const DEFAULT_POLL_BACKOFF_MAX_SECS: u64 = 300;

/// Transient error backoff start (seconds)
pub const DEFAULT_ERROR_BACKOFF_START_SECS: u64 = 5;

/// Transient error backoff ceiling (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 600;

/// Deadline for a single reconcile step (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

/// Default number of reconcile workers per kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: usize = 10;

/// Default control plane endpoint
pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.aiven.io";

/// Default number of in-flight control plane requests shared by all workers
pub const DEFAULT_MAX_CONCURRENT_REMOTE_CALLS: usize = 8;

/// Default per-request timeout for the control plane client (seconds)
pub const DEFAULT_REMOTE_REQUEST_TIMEOUT_SECS: u64 = 30;
