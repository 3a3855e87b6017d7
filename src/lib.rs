//! Managed Service Operator Library
//!
//! This library provides the core functionality for the Managed Service Operator:
//! a generic reconciliation engine that provisions externally hosted services
//! (PostgreSQL, Kafka, Redis) from Kubernetes custom resources and keeps their
//! connection secrets in sync.
//!
//! ## Quick Start
//!
//! ```rust
//! use managed_service_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod adapter;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod remote;
pub mod runtime;
pub mod server;
pub mod store;
