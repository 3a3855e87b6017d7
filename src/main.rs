//! # Managed Service Operator
//!
//! A Kubernetes operator that provisions externally hosted services from
//! custom resources and keeps their connection secrets in sync.
//!
//! ## Overview
//!
//! For every `PG`, `Kafka` and `Redis` descriptor the operator:
//!
//! 1. **Guards deletion** - Adds a finalizer before touching the control plane
//! 2. **Checks dependencies** - Waits for the project, VPC and auth secret
//! 3. **Creates or updates** - Applies the spec to the remote service
//! 4. **Polls readiness** - Requeues with backoff until the service runs
//! 5. **Writes credentials** - Upserts an owned connection secret
//!
//! ## Usage
//!
//! See the [README.md](../README.md) for configuration and deployment.

use anyhow::Result;
use managed_service_operator::adapter::AdapterRegistry;
use managed_service_operator::runtime::{initialization::initialize, watch_loop::run_controllers};

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;
    let registry = AdapterRegistry::builtin();

    run_controllers(init_result, &registry).await
}
