//! # Adapter Registry
//!
//! Maps each kind name to everything the binaries need to serve it: the CRD
//! manifest and the runner that wires the kind's adapter into an engine. Built
//! once at startup; the set of kinds is closed.

use super::{kafka, pg, redis};
use crate::crd::{Kafka, Redis, PG};
use crate::runtime::{watch_loop::run_kind, RuntimeContext};
use futures::future::BoxFuture;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;
use std::collections::BTreeMap;

/// Runs the watch feed and workers for one kind until shutdown
pub type KindRunner = fn(RuntimeContext) -> BoxFuture<'static, anyhow::Result<()>>;

/// One served kind
#[derive(Clone, Copy)]
pub struct KindRegistration {
    pub kind: &'static str,
    pub crd: fn() -> CustomResourceDefinition,
    pub run: KindRunner,
}

impl std::fmt::Debug for KindRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindRegistration")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Kind name to registration, keyed case-insensitively
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    kinds: BTreeMap<String, KindRegistration>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every kind this operator ships
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(KindRegistration {
            kind: "PG",
            crd: PG::crd,
            run: |ctx| Box::pin(run_kind::<PG>(ctx, pg::adapter)),
        });
        registry.register(KindRegistration {
            kind: "Kafka",
            crd: Kafka::crd,
            run: |ctx| Box::pin(run_kind::<Kafka>(ctx, kafka::adapter)),
        });
        registry.register(KindRegistration {
            kind: "Redis",
            crd: Redis::crd,
            run: |ctx| Box::pin(run_kind::<Redis>(ctx, redis::adapter)),
        });
        registry
    }

    pub fn register(&mut self, registration: KindRegistration) {
        self.kinds
            .insert(registration.kind.to_ascii_lowercase(), registration);
    }

    pub fn get(&self, kind: &str) -> Option<&KindRegistration> {
        self.kinds.get(&kind.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &KindRegistration> {
        self.kinds.values()
    }

    /// Registered kind names in a stable order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.kinds.values().map(|r| r.kind).collect()
    }
}
