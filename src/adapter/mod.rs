//! # Resource Adapters
//!
//! One adapter per resource kind translates between a descriptor and the
//! control plane. Adapters hold no per-descriptor state, so a single instance
//! serves every worker.
//!
//! - `service.rs` - Generic adapter shared by all service-shaped kinds
//! - `pg.rs`, `kafka.rs`, `redis.rs` - Per-kind profiles
//! - `registry.rs` - Kind to adapter resolution, built once at startup

pub mod kafka;
pub mod pg;
pub mod redis;
pub mod registry;
pub mod service;

use crate::crd::{AuthSecretReference, ManagedResource, ManagedStatus};
use crate::remote::{ControlPlane, RemoteError, RemoteService};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use registry::{AdapterRegistry, KindRegistration};
pub use service::{parse_disk_space_mb, GenericServiceAdapter, ServiceProfile};

/// Flat mapping of credential field name to value
pub type SecretData = BTreeMap<String, String>;

/// Constructor used by the engine to obtain its adapter
pub type AdapterFactory<K> = fn() -> Arc<dyn Adapter<K>>;

/// Remote fields copied into status after create or update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedService {
    pub state: String,
    pub cloud_name: Option<String>,
    pub plan: Option<String>,
    pub maintenance_window_dow: Option<String>,
    pub maintenance_window_time: Option<String>,
    pub project_vpc_id: Option<String>,
}

impl ObservedService {
    pub fn apply_to(&self, status: &mut ManagedStatus) {
        status.state = Some(self.state.clone()).filter(|s| !s.is_empty());
        status.cloud_name.clone_from(&self.cloud_name);
        status.plan.clone_from(&self.plan);
        status
            .maintenance_window_dow
            .clone_from(&self.maintenance_window_dow);
        status
            .maintenance_window_time
            .clone_from(&self.maintenance_window_time);
        status.project_vpc_id.clone_from(&self.project_vpc_id);
    }
}

impl From<&RemoteService> for ObservedService {
    fn from(service: &RemoteService) -> Self {
        let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        Self {
            state: service.state.clone(),
            cloud_name: non_empty(&service.cloud_name),
            plan: non_empty(&service.plan),
            maintenance_window_dow: service.maintenance.as_ref().map(|m| m.dow.clone()),
            maintenance_window_time: service.maintenance.as_ref().map(|m| m.time.clone()),
            project_vpc_id: service.project_vpc_id.clone().filter(|id| !id.is_empty()),
        }
    }
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The remote side confirmed the resource is absent
    Gone,
    /// Teardown accepted or still draining
    Pending,
}

/// Capability contract every resource kind implements
#[async_trait]
pub trait Adapter<K: ManagedResource>: Send + Sync {
    /// Whether the remote resource exists; NotFound maps to `false`
    async fn exists(&self, client: &dyn ControlPlane, obj: &K) -> Result<bool, RemoteError>;

    async fn create(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<ObservedService, RemoteError>;

    /// Apply the desired state to an existing resource; idempotent
    async fn update(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<ObservedService, RemoteError>;

    async fn delete(&self, client: &dyn ControlPlane, obj: &K)
        -> Result<DeleteOutcome, RemoteError>;

    async fn is_active(&self, client: &dyn ControlPlane, obj: &K) -> Result<bool, RemoteError>;

    async fn get_secret(&self, client: &dyn ControlPlane, obj: &K)
        -> Result<SecretData, RemoteError>;

    /// Dependencies (project, VPC) ready for mutation
    async fn check_preconditions(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<bool, RemoteError>;

    /// Auth secret the descriptor depends on, if any
    fn get_secret_reference(&self, obj: &K) -> Option<AuthSecretReference>;

    /// Name of the generated connection secret
    fn secret_name(&self, obj: &K) -> String;
}
