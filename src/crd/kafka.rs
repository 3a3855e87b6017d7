//! # Kafka
//!
//! Managed Kafka cluster descriptor.

use super::ServiceCommonSpec;
use serde::{Deserialize, Serialize};

/// Kafka Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: aiven.io/v1alpha1
/// kind: Kafka
/// metadata:
///   name: events
///   namespace: default
/// spec:
///   project: p1
///   plan: business-4
///   connInfoSecretTarget:
///     name: events-kafka
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Kafka",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::ManagedStatus",
    shortname = "kafka",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Plan", "type":"string", "jsonPath":".spec.plan"}, {"name":"State", "type":"string", "jsonPath":".status.state"}, {"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSpec {
    #[serde(flatten)]
    pub service: ServiceCommonSpec,
    /// Disk space override, e.g. `600GiB`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_space: Option<String>,
}
