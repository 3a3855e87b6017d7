//! # Watch Loop
//!
//! Feeds descriptor and generated-secret changes into a kind's dispatcher.
//!
//! Status-only updates do not change `metadata.generation`, so they are
//! filtered out here; periodic resync comes from the retry-after the engine
//! returns, not from the watch.

use crate::adapter::{AdapterFactory, AdapterRegistry};
use crate::constants::{MANAGED_BY_LABEL, OPERATOR_NAME};
use crate::controller::dispatcher::{Dispatcher, DispatcherSettings};
use crate::controller::engine::{Engine, EngineSettings};
use crate::controller::ObjectKey;
use crate::crd::ManagedResource;
use crate::runtime::error_policy::handle_watch_stream_error;
use crate::runtime::initialization::InitializationResult;
use crate::runtime::RuntimeContext;
use crate::store::{DescriptorStore, KubeStore, SecretStore};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::watcher::{self, Event};
use kube_runtime::WatchStreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

/// What the filter remembers per descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Seen {
    generation: Option<i64>,
    deleting: bool,
}

/// Passes a descriptor event through only when it needs a reconcile
///
/// A key is enqueued when first seen, when its generation changes, when it is
/// marked for deletion, and when it is removed.
#[derive(Debug, Default)]
pub struct GenerationFilter {
    seen: HashMap<ObjectKey, Seen>,
}

impl GenerationFilter {
    pub fn observe<K: ManagedResource>(&mut self, event: &Event<K>) -> Option<ObjectKey> {
        match event {
            Event::Apply(obj) | Event::InitApply(obj) => self.observe_object(obj),
            Event::Delete(obj) => {
                let key = ObjectKey::from_resource(obj);
                self.seen.remove(&key);
                Some(key)
            }
            Event::Init | Event::InitDone => None,
        }
    }

    fn observe_object<K: ManagedResource>(&mut self, obj: &K) -> Option<ObjectKey> {
        let key = ObjectKey::from_resource(obj);
        let seen = Seen {
            generation: obj.meta().generation,
            deleting: obj.meta().deletion_timestamp.is_some(),
        };
        match self.seen.insert(key.clone(), seen) {
            Some(previous) if previous == seen => None,
            _ => Some(key),
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Descriptor of kind `K` that controls `secret`, if any
pub fn owner_key<K: ManagedResource>(secret: &Secret) -> Option<ObjectKey> {
    let namespace = secret.namespace()?;
    let kind = K::kind(&());
    let api_version = K::api_version(&());
    secret
        .owner_references()
        .iter()
        .find(|o| o.kind == kind && o.api_version == api_version)
        .map(|o| ObjectKey::new(namespace, o.name.clone()))
}

/// Run the watch feeds and workers for kind `K` until shutdown
///
/// # Errors
///
/// Returns an error if the worker pool panics.
pub async fn run_kind<K: ManagedResource>(
    ctx: RuntimeContext,
    factory: AdapterFactory<K>,
) -> anyhow::Result<()> {
    let kind = K::kind(&()).into_owned();
    let span = tracing::info_span!("controller.watch", resource.kind = kind.as_str());

    async move {
        let store = Arc::new(KubeStore::new(ctx.client.clone()));
        let descriptor_store: Arc<dyn DescriptorStore<K>> = Arc::<KubeStore>::clone(&store);
        let secret_store: Arc<dyn SecretStore> = store;
        let engine = Engine::new(
            descriptor_store,
            secret_store,
            Arc::clone(&ctx.control_plane),
            factory,
            EngineSettings::from_config(&ctx.config),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(engine),
            DispatcherSettings::from_config(&ctx.config),
        );
        let handle = dispatcher.handle();
        let workers = tokio::spawn(dispatcher.run().in_current_span());

        let (descriptors, secrets): (Api<K>, Api<Secret>) = match &ctx.config.watch_namespace {
            Some(namespace) => (
                Api::namespaced(ctx.client.clone(), namespace),
                Api::namespaced(ctx.client.clone(), namespace),
            ),
            None => (Api::all(ctx.client.clone()), Api::all(ctx.client.clone())),
        };
        let selector = format!("{MANAGED_BY_LABEL}={OPERATOR_NAME}");
        let descriptor_events = watcher::watcher(descriptors, watcher::Config::default())
            .default_backoff();
        let secret_events = watcher::watcher(secrets, watcher::Config::default().labels(&selector))
            .default_backoff()
            .touched_objects();
        futures::pin_mut!(descriptor_events, secret_events);

        let mut filter = GenerationFilter::default();
        let mut shutdown = ctx.shutdown.clone();
        info!("Starting {} watch loop...", kind);

        loop {
            tokio::select! {
                event = descriptor_events.next() => match event {
                    Some(Ok(Event::InitDone)) => {
                        info!("Initial {} list complete, tracking {} descriptors", kind, filter.len());
                    }
                    Some(Ok(event)) => {
                        if let Some(key) = filter.observe(&event) {
                            debug!("watch.event.enqueue {}", key);
                            handle.enqueue(key);
                        }
                    }
                    Some(Err(e)) => {
                        handle_watch_stream_error(&kind, &e);
                    }
                    None => {
                        warn!("{} watch stream ended", kind);
                        break;
                    }
                },
                secret = secret_events.next() => match secret {
                    Some(Ok(secret)) => {
                        if let Some(key) = owner_key::<K>(&secret) {
                            debug!("Generated secret {} changed, enqueueing {}", secret.name_any(), key);
                            handle.enqueue(key);
                        }
                    }
                    Some(Err(e)) => {
                        handle_watch_stream_error(&kind, &e);
                    }
                    None => {
                        warn!("{} secret watch stream ended", kind);
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    info!("Shutdown requested, stopping {} watch loop", kind);
                    break;
                }
            }
        }

        // Workers finish their current step, then exit
        handle.shutdown();
        workers.await?;
        info!("{} controller stopped", kind);
        Ok(())
    }
    .instrument(span)
    .await
}

/// Run every enabled kind until SIGINT/SIGTERM
///
/// # Errors
///
/// Returns the first error a kind runner reports, or an error when no
/// registered kind is enabled.
pub async fn run_controllers(
    init: InitializationResult,
    registry: &AdapterRegistry,
) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server_state = Arc::clone(&init.server_state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        server_state.set_ready(false);
        if shutdown_tx.send(true).is_err() {
            debug!("All watch loops already stopped");
        }
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    let ctx = RuntimeContext {
        client: init.client,
        control_plane: init.control_plane,
        config: init.config,
        shutdown: shutdown_rx,
    };

    let mut tasks = JoinSet::new();
    for registration in registry.iter() {
        if !ctx.config.is_kind_enabled(registration.kind) {
            info!("Kind {} disabled by ENABLED_KINDS", registration.kind);
            continue;
        }
        info!("Starting controller for kind {}", registration.kind);
        let kind = registration.kind;
        let runner = (registration.run)(ctx.clone());
        tasks.spawn(async move { (kind, runner.await) });
    }
    if tasks.is_empty() {
        anyhow::bail!(
            "ENABLED_KINDS {:?} matches none of the registered kinds {:?}",
            ctx.config.enabled_kinds,
            registry.kinds()
        );
    }

    while let Some(joined) = tasks.join_next().await {
        let (kind, result) = joined?;
        if let Err(e) = result {
            error!("Controller for kind {} failed: {:#}", kind, e);
            return Err(e.context(format!("controller for kind {kind} failed")));
        }
    }

    info!("Controller stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
