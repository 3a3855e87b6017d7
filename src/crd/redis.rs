//! # Redis
//!
//! Managed Redis cache descriptor.

use super::ServiceCommonSpec;
use serde::{Deserialize, Serialize};

/// Redis Custom Resource Definition
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Redis",
    group = "aiven.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::ManagedStatus",
    plural = "redis",
    shortname = "rd",
    printcolumn = r#"{"name":"Project", "type":"string", "jsonPath":".spec.project"}, {"name":"Plan", "type":"string", "jsonPath":".spec.plan"}, {"name":"State", "type":"string", "jsonPath":".status.state"}, {"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    #[serde(flatten)]
    pub service: ServiceCommonSpec,
}
