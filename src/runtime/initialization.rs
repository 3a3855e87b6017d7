//! # Initialization
//!
//! Operator startup: rustls setup, tracing, metrics, server startup, and the
//! Kubernetes and control plane clients.

use crate::config::{ControllerConfig, LogFormat, ServerConfig};
use crate::observability;
use crate::remote::rest::ControlPlaneREST;
use crate::remote::ControlPlane;
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the operator
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Shared, rate-limited control plane client
    pub control_plane: Arc<dyn ControlPlane>,
    pub config: ControllerConfig,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes and control plane client creation
///
/// # Errors
///
/// Fails when the server does not come up or a client cannot be built.
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection; a second install is harmless
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    let config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();
    init_tracing(&config);

    info!("Starting Managed Service Operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!("Configuration: {:?}", config);

    if config.enable_metrics {
        observability::metrics::register_metrics()?;
    } else {
        info!("Metrics disabled, /metrics will be empty");
    }

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    if config.control_plane_token.is_none() {
        warn!("CONTROL_PLANE_TOKEN is not set, control plane requests will be unauthenticated");
    }
    let control_plane: Arc<dyn ControlPlane> = Arc::new(ControlPlaneREST::new(
        &config.control_plane_url,
        config.control_plane_token.clone(),
        config.max_concurrent_remote_calls,
        config.remote_request_timeout(),
    )?);
    info!(
        "Control plane client ready: {} (max {} concurrent calls)",
        config.control_plane_url, config.max_concurrent_remote_calls
    );

    Ok(InitializationResult {
        client,
        control_plane,
        config,
        server_state,
    })
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `LOG_LEVEL`.
fn init_tracing(config: &ControllerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("managed_service_operator={}", config.log_level.to_lowercase()).into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = result {
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
