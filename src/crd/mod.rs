//! # Custom Resource Definitions
//!
//! CRD types for the managed service operator.
//!
//! ## Module Structure
//!
//! - `common.rs` - Spec fields shared by every service kind
//! - `status.rs` - Status, phase and conditions written by the engine
//! - `pg.rs`, `kafka.rs`, `redis.rs` - One descriptor per service kind
//!
//! The engine is generic over [`ManagedResource`]; the service adapter is
//! generic over [`ServiceResource`].

mod common;
mod kafka;
mod pg;
mod redis;
mod status;

use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};

// Re-export all public types
pub use common::{AuthSecretReference, ConnInfoSecretTarget, ServiceCommonSpec};
pub use kafka::{Kafka, KafkaSpec};
pub use pg::{PGSpec, PG};
pub use redis::{Redis, RedisSpec};
pub use status::{Condition, ManagedStatus, Phase, READY_CONDITION};

/// A descriptor the reconciliation engine can drive
pub trait ManagedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn managed_status(&self) -> Option<&ManagedStatus>;

    fn set_managed_status(&mut self, status: ManagedStatus);
}

/// A descriptor backed by a remote service
pub trait ServiceResource: ManagedResource {
    fn service_spec(&self) -> &ServiceCommonSpec;

    /// Disk space override, for kinds that support one
    fn disk_space(&self) -> Option<&str> {
        None
    }
}

macro_rules! managed_resource {
    ($kind:ty) => {
        impl ManagedResource for $kind {
            fn managed_status(&self) -> Option<&ManagedStatus> {
                self.status.as_ref()
            }

            fn set_managed_status(&mut self, status: ManagedStatus) {
                self.status = Some(status);
            }
        }
    };
}

managed_resource!(PG);
managed_resource!(Kafka);
managed_resource!(Redis);

impl ServiceResource for PG {
    fn service_spec(&self) -> &ServiceCommonSpec {
        &self.spec.service
    }

    fn disk_space(&self) -> Option<&str> {
        self.spec.disk_space.as_deref()
    }
}

impl ServiceResource for Kafka {
    fn service_spec(&self) -> &ServiceCommonSpec {
        &self.spec.service
    }

    fn disk_space(&self) -> Option<&str> {
        self.spec.disk_space.as_deref()
    }
}

impl ServiceResource for Redis {
    fn service_spec(&self) -> &ServiceCommonSpec {
        &self.spec.service
    }
}
