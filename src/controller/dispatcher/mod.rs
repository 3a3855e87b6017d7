//! # Work Dispatcher
//!
//! Feeds descriptor keys from a [`WorkQueue`] to a fixed pool of workers.
//!
//! At most one step runs per key at a time; unrelated keys run in parallel.
//! Each step runs in its own task under a deadline. When the deadline passes
//! the worker still waits for the task (the key stays exclusive and any remote
//! call in flight completes), then requeues the key so the next step observes
//! the real state.

pub mod queue;

use crate::config::ControllerConfig;
use crate::controller::types::{ObjectKey, ReconcileResult};
use crate::observability::metrics;
use async_trait::async_trait;
use queue::WorkQueue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// One reconcile step for a key
#[async_trait]
pub trait KeyReconciler: Send + Sync + 'static {
    /// Kind label used in logs and metrics
    fn kind(&self) -> &str;

    async fn reconcile(&self, key: &ObjectKey) -> ReconcileResult;
}

/// Worker pool settings
#[derive(Debug, Clone, Copy)]
pub struct DispatcherSettings {
    pub workers: usize,
    pub step_timeout: Duration,
    /// Delay before revisiting a key whose step timed out or panicked
    pub retry_delay: Duration,
}

impl DispatcherSettings {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            workers: config.max_concurrent_reconciliations,
            step_timeout: config.reconcile_timeout(),
            retry_delay: config.delete_requeue(),
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

/// Enqueue side of a running dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    queue: Arc<WorkQueue<ObjectKey>>,
}

impl DispatcherHandle {
    pub fn enqueue(&self, key: ObjectKey) {
        self.queue.add(key);
    }

    pub fn enqueue_after(&self, key: ObjectKey, delay: Duration) {
        self.queue.add_after(key, delay);
    }

    /// Workers finish their current step and exit
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}

/// Fixed worker pool over one work queue
pub struct Dispatcher<R: KeyReconciler> {
    reconciler: Arc<R>,
    queue: Arc<WorkQueue<ObjectKey>>,
    settings: DispatcherSettings,
}

impl<R: KeyReconciler> std::fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kind", &self.reconciler.kind())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<R: KeyReconciler> Dispatcher<R> {
    pub fn new(reconciler: Arc<R>, settings: DispatcherSettings) -> Self {
        Self {
            reconciler,
            queue: Arc::new(WorkQueue::new()),
            settings,
        }
    }

    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Run the workers until the queue shuts down
    pub async fn run(self) {
        let workers = self.settings.workers.max(1);
        info!(
            kind = self.reconciler.kind(),
            workers, "Starting reconcile workers"
        );

        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(worker_loop(
                id,
                Arc::clone(&self.reconciler),
                Arc::clone(&self.queue),
                self.settings,
            ));
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(kind = self.reconciler.kind(), "Reconcile worker crashed: {}", e);
            }
        }
        info!(kind = self.reconciler.kind(), "All reconcile workers stopped");
    }
}

async fn worker_loop<R: KeyReconciler>(
    id: usize,
    reconciler: Arc<R>,
    queue: Arc<WorkQueue<ObjectKey>>,
    settings: DispatcherSettings,
) {
    let kind = reconciler.kind().to_string();
    while let Some(key) = queue.next().await {
        metrics::set_queue_depth(&kind, queue.len());
        let span = info_span!(
            "controller.worker.step",
            worker = id,
            resource.kind = %kind,
            resource.namespace = %key.namespace,
            resource.name = %key.name
        );

        let outcome = run_step(&reconciler, &key, &settings, &kind)
            .instrument(span)
            .await;

        match outcome {
            Some(result) => {
                if let ReconcileResult::RetryAfter { reason, .. } = &result {
                    metrics::increment_requeues(&kind, reason.as_str());
                }
                if let Some(delay) = result.requeue_after() {
                    queue.add_after(key.clone(), delay);
                }
            }
            None => {
                metrics::increment_requeues(&kind, "timeout");
                queue.add_after(key.clone(), settings.retry_delay);
            }
        }
        queue.done(&key);
    }
    debug!(worker = id, kind = %kind, "Reconcile worker exiting");
}

/// Run one step in its own task; `None` if it overran its deadline or panicked
async fn run_step<R: KeyReconciler>(
    reconciler: &Arc<R>,
    key: &ObjectKey,
    settings: &DispatcherSettings,
    kind: &str,
) -> Option<ReconcileResult> {
    let start = Instant::now();
    let mut task = {
        let reconciler = Arc::clone(reconciler);
        let key = key.clone();
        tokio::spawn(async move { reconciler.reconcile(&key).await }.in_current_span())
    };

    let joined = match tokio::time::timeout(settings.step_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(
                "Reconcile step exceeded {}s deadline, waiting for in-flight calls to settle",
                settings.step_timeout.as_secs()
            );
            metrics::increment_reconcile_timeouts(kind);
            // Keep the key exclusive until the step really ends
            let _ = task.await;
            return None;
        }
    };

    metrics::observe_reconciliation_duration(kind, start.elapsed().as_secs_f64());
    match joined {
        Ok(result) => {
            metrics::increment_reconciliations(kind, result.label());
            Some(result)
        }
        Err(e) => {
            error!("Reconcile step panicked: {}", e);
            metrics::increment_reconciliations(kind, "panic");
            None
        }
    }
}
