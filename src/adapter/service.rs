//! # Generic Service Adapter
//!
//! Implements the adapter contract once for every service-shaped kind. A
//! [`ServiceProfile`] supplies what differs between kinds: the service type
//! tag, whether the project CA is needed, and the secret field mapping.
//!
//! The remote service name is the descriptor name; the project comes from
//! `spec.project`.

use super::{Adapter, DeleteOutcome, ObservedService, SecretData};
use crate::crd::{AuthSecretReference, ServiceResource};
use crate::remote::{
    ControlPlane, CreateServiceRequest, MaintenanceWindow, RemoteError, RemoteService,
    UpdateServiceRequest,
};
use async_trait::async_trait;
use kube::ResourceExt;
use regex::Regex;
use std::marker::PhantomData;
use std::sync::LazyLock;
use tracing::{debug, info};

static DISK_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(MiB|GiB|TiB)\s*$")
        .expect("Failed to compile disk space pattern - this should never happen")
});

/// What distinguishes one service kind from another
#[derive(Debug, Clone, Copy)]
pub struct ServiceProfile {
    /// Service type tag sent to the control plane, e.g. `pg`
    pub service_type: &'static str,
    /// Fetch the project CA and pass it to `secret_fields`
    pub needs_ca_certificate: bool,
    /// Map a running service (and the CA, when requested) to secret fields
    pub secret_fields: fn(&RemoteService, Option<&str>) -> SecretData,
}

/// Adapter shared by all service kinds
pub struct GenericServiceAdapter<K> {
    profile: ServiceProfile,
    _kind: PhantomData<fn() -> K>,
}

impl<K> std::fmt::Debug for GenericServiceAdapter<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericServiceAdapter")
            .field("service_type", &self.profile.service_type)
            .finish_non_exhaustive()
    }
}

impl<K: ServiceResource> GenericServiceAdapter<K> {
    pub fn new(profile: ServiceProfile) -> Self {
        Self {
            profile,
            _kind: PhantomData,
        }
    }

    pub fn profile(&self) -> &ServiceProfile {
        &self.profile
    }

    fn validated(obj: &K) -> Result<(), RemoteError> {
        obj.service_spec()
            .validate()
            .map_err(|msg| RemoteError::Fatal(format!("invalid spec: {msg}")))
    }

    fn maintenance(obj: &K) -> Option<MaintenanceWindow> {
        obj.service_spec()
            .maintenance_window()
            .map(|(dow, time)| MaintenanceWindow {
                dow: dow.to_string(),
                time: time.to_string(),
            })
    }

    fn create_request(&self, obj: &K) -> Result<CreateServiceRequest, RemoteError> {
        Self::validated(obj)?;
        let spec = obj.service_spec();
        Ok(CreateServiceRequest {
            service_name: obj.name_any(),
            service_type: self.profile.service_type.to_string(),
            plan: spec.plan.clone(),
            cloud: spec.cloud_name.clone().filter(|c| !c.is_empty()),
            maintenance: Self::maintenance(obj),
            project_vpc_id: spec.vpc_id().map(str::to_string),
            user_config: spec.user_config.clone(),
            disk_space_mb: parse_disk_space_mb(obj.disk_space())?,
            termination_protection: spec.termination_protection,
        })
    }

    fn update_request(obj: &K) -> Result<UpdateServiceRequest, RemoteError> {
        Self::validated(obj)?;
        let spec = obj.service_spec();
        Ok(UpdateServiceRequest {
            plan: spec.plan.clone(),
            cloud: spec.cloud_name.clone().filter(|c| !c.is_empty()),
            maintenance: Self::maintenance(obj),
            project_vpc_id: spec.vpc_id().map(str::to_string),
            user_config: spec.user_config.clone(),
            disk_space_mb: parse_disk_space_mb(obj.disk_space())?,
            powered: true,
            termination_protection: spec.termination_protection,
        })
    }
}

#[async_trait]
impl<K: ServiceResource> Adapter<K> for GenericServiceAdapter<K> {
    async fn exists(&self, client: &dyn ControlPlane, obj: &K) -> Result<bool, RemoteError> {
        match client
            .get_service(&obj.service_spec().project, &obj.name_any())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<ObservedService, RemoteError> {
        let request = self.create_request(obj)?;
        info!(
            service_type = self.profile.service_type,
            plan = %request.plan,
            "Creating remote service"
        );
        let service = client
            .create_service(&obj.service_spec().project, &request)
            .await?;
        Ok(ObservedService::from(&service))
    }

    async fn update(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<ObservedService, RemoteError> {
        let request = Self::update_request(obj)?;
        let service = client
            .update_service(&obj.service_spec().project, &obj.name_any(), &request)
            .await?;
        Ok(ObservedService::from(&service))
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<DeleteOutcome, RemoteError> {
        match client
            .delete_service(&obj.service_spec().project, &obj.name_any())
            .await
        {
            Ok(()) => Ok(DeleteOutcome::Pending),
            Err(e) if e.is_not_found() => Ok(DeleteOutcome::Gone),
            Err(e) => Err(e),
        }
    }

    async fn is_active(&self, client: &dyn ControlPlane, obj: &K) -> Result<bool, RemoteError> {
        match client
            .get_service(&obj.service_spec().project, &obj.name_any())
            .await
        {
            Ok(service) => {
                debug!(state = %service.state, "Checked remote service state");
                Ok(service.is_running())
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_secret(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<SecretData, RemoteError> {
        let project = &obj.service_spec().project;
        let service = client.get_service(project, &obj.name_any()).await?;
        let ca = if self.profile.needs_ca_certificate {
            Some(client.get_project_ca(project).await?)
        } else {
            None
        };
        Ok((self.profile.secret_fields)(&service, ca.as_deref()))
    }

    async fn check_preconditions(
        &self,
        client: &dyn ControlPlane,
        obj: &K,
    ) -> Result<bool, RemoteError> {
        // A broken spec fails now instead of waiting on its dependencies
        Self::validated(obj)?;
        parse_disk_space_mb(obj.disk_space())?;

        let spec = obj.service_spec();
        match client.get_project(&spec.project).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!(project = %spec.project, "Project not found");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        let Some(vpc_id) = spec.vpc_id() else {
            return Ok(true);
        };
        match client.get_project_vpc(&spec.project, vpc_id).await {
            Ok(vpc) => {
                debug!(vpc = vpc_id, state = %vpc.state, "Checked project VPC");
                Ok(vpc.is_active())
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn get_secret_reference(&self, obj: &K) -> Option<AuthSecretReference> {
        obj.service_spec().auth_secret_ref.clone()
    }

    fn secret_name(&self, obj: &K) -> String {
        obj.service_spec()
            .conn_info_secret_target
            .as_ref()
            .map(|t| t.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| obj.name_any())
    }
}

/// Convert a disk space string such as `90GiB` to megabytes
///
/// `None` or an empty string means "use the plan default".
///
/// # Errors
///
/// A string that does not match `<digits><MiB|GiB|TiB>` is a Fatal error.
pub fn parse_disk_space_mb(value: Option<&str>) -> Result<Option<u64>, RemoteError> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let invalid = || {
        RemoteError::Fatal(format!(
            "invalid spec: diskSpace '{value}' must look like 90GiB"
        ))
    };
    let caps = DISK_SPACE.captures(value).ok_or_else(invalid)?;
    let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
    let factor = match &caps[2] {
        "MiB" => 1,
        "GiB" => 1024,
        _ => 1024 * 1024,
    };
    amount.checked_mul(factor).map(Some).ok_or_else(invalid)
}
