//! # Service Operations
//!
//! Implementation of [`ControlPlane`] for the REST client.

use super::ControlPlaneREST;
use crate::remote::{
    ControlPlane, CreateServiceRequest, RemoteError, RemoteProject, RemoteService, RemoteVpc,
    UpdateServiceRequest,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, info_span, Instrument};

#[derive(Debug, Deserialize)]
struct ServiceEnvelope {
    service: RemoteService,
}

#[derive(Debug, Deserialize)]
struct CertificateEnvelope {
    certificate: String,
}

#[derive(Debug, Deserialize)]
struct ProjectEnvelope {
    project: RemoteProject,
}

fn to_body<T: serde::Serialize>(request: &T) -> Result<serde_json::Value, RemoteError> {
    serde_json::to_value(request).map_err(|e| RemoteError::Fatal(format!("invalid request: {e}")))
}

#[async_trait]
impl ControlPlane for ControlPlaneREST {
    async fn get_service(&self, project: &str, name: &str) -> Result<RemoteService, RemoteError> {
        let span = info_span!("remote.service.get", project = project, service = name);
        async move {
            let envelope: ServiceEnvelope = self
                .send_json(
                    "get_service",
                    Method::GET,
                    &format!("project/{project}/service/{name}"),
                    None,
                )
                .await?;
            debug!(state = %envelope.service.state, "Fetched service");
            Ok(envelope.service)
        }
        .instrument(span)
        .await
    }

    async fn create_service(
        &self,
        project: &str,
        request: &CreateServiceRequest,
    ) -> Result<RemoteService, RemoteError> {
        let span = info_span!(
            "remote.service.create",
            project = project,
            service = %request.service_name,
            service_type = %request.service_type
        );
        async move {
            let body = to_body(request)?;
            let envelope: ServiceEnvelope = self
                .send_json(
                    "create_service",
                    Method::POST,
                    &format!("project/{project}/service"),
                    Some(body),
                )
                .await?;
            info!(state = %envelope.service.state, "Created service");
            Ok(envelope.service)
        }
        .instrument(span)
        .await
    }

    async fn update_service(
        &self,
        project: &str,
        name: &str,
        request: &UpdateServiceRequest,
    ) -> Result<RemoteService, RemoteError> {
        let span = info_span!("remote.service.update", project = project, service = name);
        async move {
            let body = to_body(request)?;
            let envelope: ServiceEnvelope = self
                .send_json(
                    "update_service",
                    Method::PUT,
                    &format!("project/{project}/service/{name}"),
                    Some(body),
                )
                .await?;
            debug!(state = %envelope.service.state, "Updated service");
            Ok(envelope.service)
        }
        .instrument(span)
        .await
    }

    async fn delete_service(&self, project: &str, name: &str) -> Result<(), RemoteError> {
        let span = info_span!("remote.service.delete", project = project, service = name);
        async move {
            self.execute(
                "delete_service",
                Method::DELETE,
                &format!("project/{project}/service/{name}"),
                None,
            )
            .await?;
            info!("Requested service deletion");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn get_project_ca(&self, project: &str) -> Result<String, RemoteError> {
        let envelope: CertificateEnvelope = self
            .send_json(
                "get_project_ca",
                Method::GET,
                &format!("project/{project}/kms/ca"),
                None,
            )
            .instrument(info_span!("remote.project.ca", project = project))
            .await?;
        Ok(envelope.certificate)
    }

    async fn get_project(&self, project: &str) -> Result<RemoteProject, RemoteError> {
        let envelope: ProjectEnvelope = self
            .send_json(
                "get_project",
                Method::GET,
                &format!("project/{project}"),
                None,
            )
            .instrument(info_span!("remote.project.get", project = project))
            .await?;
        Ok(envelope.project)
    }

    async fn get_project_vpc(
        &self,
        project: &str,
        vpc_id: &str,
    ) -> Result<RemoteVpc, RemoteError> {
        self.send_json(
            "get_project_vpc",
            Method::GET,
            &format!("project/{project}/vpcs/{vpc_id}"),
            None,
        )
        .instrument(info_span!("remote.vpc.get", project = project, vpc = vpc_id))
        .await
    }
}
