//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use managed_service_operator::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (PG, Kafka, Redis, ManagedStatus, etc.)
//! - The adapter contract and registry
//! - Engine and dispatcher types
//! - Remote client trait and errors
//! - Config types (ControllerConfig, ServerConfig)

// CRD types - most commonly used
pub use crate::crd::*;

// Adapter contract - needed for adding a kind
pub use crate::adapter::{
    Adapter, AdapterFactory, AdapterRegistry, DeleteOutcome, GenericServiceAdapter,
    KindRegistration, ObservedService, SecretData, ServiceProfile,
};

// Engine types - core controller functionality
pub use crate::controller::dispatcher::{Dispatcher, DispatcherHandle, DispatcherSettings};
pub use crate::controller::engine::{Engine, EngineSettings};
pub use crate::controller::{EngineError, ObjectKey, ReconcileResult, RequeueReason};

// Remote side
pub use crate::remote::{ControlPlane, ControlPlaneREST, RemoteError};

// Stores
pub use crate::store::{DescriptorStore, KubeStore, SecretStore, StoreError};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, ServerConfig};
