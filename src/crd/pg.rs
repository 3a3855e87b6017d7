//! # PG
//!
//! Managed PostgreSQL service descriptor.

use super::ServiceCommonSpec;
use serde::{Deserialize, Serialize};

/// PG Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: aiven.io/v1alpha1
/// kind: PG
/// metadata:
///   name: p1-db
///   namespace: default
/// spec:
///   project: p1
///   cloudName: google-europe-west1
///   plan: startup-4
///   maintenanceWindowDow: sunday
///   maintenanceWindowTime: "03:00:00"
///   authSecretRef:
///     name: control-plane-token
///     key: token
///   userConfig:
///     pg_version: "15"
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "PG",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::ManagedStatus",
    shortname = "pg",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Plan", "type":"string", "jsonPath":".spec.plan"}, {"name":"State", "type":"string", "jsonPath":".status.state"}, {"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PGSpec {
    #[serde(flatten)]
    pub service: ServiceCommonSpec,
    /// Disk space override, e.g. `90GiB`
    /// Must be a multiple of the plan's disk space step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_space: Option<String>,
}
