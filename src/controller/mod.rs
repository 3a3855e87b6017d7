//! # Controller
//!
//! Core controller modules for the Managed Service Operator.
//!
//! - `backoff`: Exponential backoff for readiness polling and error retries
//! - `dispatcher`: Work queue and worker pool driving reconcile steps
//! - `engine`: Generic reconciliation state machine
//! - `secret`: Connection secret synthesis
//! - `types`: Keys, step outcomes and engine errors

pub mod backoff;
pub mod dispatcher;
pub mod engine;
pub mod secret;
pub mod types;

pub use types::{EngineError, ObjectKey, ReconcileResult, RequeueReason};
