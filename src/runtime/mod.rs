//! # Runtime
//!
//! Process wiring around the engine: startup, per-kind watch feeds, and
//! shutdown.
//!
//! - `initialization.rs` - rustls, tracing, metrics, HTTP server and clients
//! - `watch_loop.rs` - Watch feeds into the dispatcher, one task per kind
//! - `error_policy.rs` - Watch stream error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::config::ControllerConfig;
use crate::remote::ControlPlane;
use kube::Client;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything a kind runner needs, shared by all kinds
#[derive(Clone)]
pub struct RuntimeContext {
    pub client: Client,
    pub control_plane: Arc<dyn ControlPlane>,
    pub config: ControllerConfig,
    /// Flips to `true` once shutdown starts
    pub shutdown: watch::Receiver<bool>,
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("control_plane", &self.control_plane)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
