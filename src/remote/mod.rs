//! # Remote Control Plane
//!
//! Typed access to the service provisioning API.
//!
//! The [`ControlPlane`] trait is the seam the adapters and the engine depend
//! on; [`ControlPlaneREST`] is the production implementation. One client is
//! shared by every worker.

mod error;
pub mod rest;
mod types;

use async_trait::async_trait;

pub use error::RemoteError;
pub use rest::ControlPlaneREST;
pub use types::{
    ConnectionInfo, CreateServiceRequest, MaintenanceWindow, RemoteProject, RemoteService,
    RemoteVpc, ServiceUser, UpdateServiceRequest, STATE_RUNNING, VPC_STATE_ACTIVE,
};

/// Operations against the provisioning API
#[async_trait]
pub trait ControlPlane: Send + Sync + std::fmt::Debug {
    async fn get_service(&self, project: &str, name: &str) -> Result<RemoteService, RemoteError>;

    async fn create_service(
        &self,
        project: &str,
        request: &CreateServiceRequest,
    ) -> Result<RemoteService, RemoteError>;

    async fn update_service(
        &self,
        project: &str,
        name: &str,
        request: &UpdateServiceRequest,
    ) -> Result<RemoteService, RemoteError>;

    async fn delete_service(&self, project: &str, name: &str) -> Result<(), RemoteError>;

    /// PEM encoded CA certificate of the project
    async fn get_project_ca(&self, project: &str) -> Result<String, RemoteError>;

    async fn get_project(&self, project: &str) -> Result<RemoteProject, RemoteError>;

    async fn get_project_vpc(&self, project: &str, vpc_id: &str)
        -> Result<RemoteVpc, RemoteError>;
}
