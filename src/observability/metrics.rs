//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `service_operator_reconciliations_total` - Reconcile steps by kind and result
//! - `service_operator_reconciliation_errors_total` - Reconcile errors by kind and class
//! - `service_operator_reconciliation_duration_seconds` - Duration of reconcile steps
//! - `service_operator_reconcile_timeouts_total` - Steps that overran their deadline
//! - `service_operator_requeues_total` - Requeues by kind and reason
//! - `service_operator_secrets_synced_total` - Connection secrets written
//! - `service_operator_queue_depth` - Keys waiting in the work queue
//! - `service_operator_remote_requests_total` - Control plane calls by operation and outcome
//! - `service_operator_remote_request_duration_seconds` - Duration of control plane calls
//! - `service_operator_watch_errors_total` - Watch stream errors by kind

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_operator_reconciliations_total",
            "Total number of reconcile steps by kind and result",
        ),
        &["kind", "result"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_operator_reconciliation_errors_total",
            "Total number of reconcile errors by kind and error class",
        ),
        &["kind", "class"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "service_operator_reconciliation_duration_seconds",
            "Duration of reconcile steps in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 120.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static RECONCILE_TIMEOUTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_operator_reconcile_timeouts_total",
            "Total number of reconcile steps that exceeded their deadline",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILE_TIMEOUTS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_operator_requeues_total",
            "Total number of requeues by kind and reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static SECRETS_SYNCED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_operator_secrets_synced_total",
            "Total number of connection secrets written",
        ),
        &["kind"],
    )
    .expect("Failed to create SECRETS_SYNCED_TOTAL metric - this should never happen")
});

static QUEUE_DEPTH: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new(
            "service_operator_queue_depth",
            "Number of keys waiting to be reconciled",
        ),
        &["kind"],
    )
    .expect("Failed to create QUEUE_DEPTH metric - this should never happen")
});

static REMOTE_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_operator_remote_requests_total",
            "Total number of control plane requests by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create REMOTE_REQUESTS_TOTAL metric - this should never happen")
});

static REMOTE_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "service_operator_remote_request_duration_seconds",
            "Duration of control plane requests in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create REMOTE_REQUEST_DURATION metric - this should never happen")
});

static WATCH_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_operator_watch_errors_total",
            "Total number of watch stream errors by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create WATCH_ERRORS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_TIMEOUTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_SYNCED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUEUE_DEPTH.clone()))?;
    REGISTRY.register(Box::new(REMOTE_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(WATCH_ERRORS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str, result: &str) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[kind, result])
        .inc();
}

pub fn increment_reconciliation_errors(kind: &str, class: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, class])
        .inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_reconcile_timeouts(kind: &str) {
    RECONCILE_TIMEOUTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_requeues(kind: &str, reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[kind, reason]).inc();
}

pub fn increment_secrets_synced(kind: &str) {
    SECRETS_SYNCED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn set_queue_depth(kind: &str, depth: usize) {
    QUEUE_DEPTH
        .with_label_values(&[kind])
        .set(i64::try_from(depth).unwrap_or(i64::MAX));
}

/// Record one control plane request
pub fn record_remote_request(operation: &str, outcome: &str, duration: f64) {
    REMOTE_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    REMOTE_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_watch_errors(kind: &str) {
    WATCH_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}
