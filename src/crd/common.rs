//! # Shared Service Spec
//!
//! Fields every service-shaped kind carries, flattened into each kind's spec.

use regex::Regex;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const MAINTENANCE_DAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

static MAINTENANCE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):[0-5]\d:[0-5]\d$")
        .expect("Failed to compile maintenance time pattern - this should never happen")
});

/// Desired state shared by PG, Kafka and Redis
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCommonSpec {
    /// Target project name
    pub project: String,
    /// Cloud and region, e.g. `google-europe-west1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,
    /// Subscription plan, e.g. `startup-4`
    pub plan: String,
    /// Day of week for maintenance (monday..sunday)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window_dow: Option<String>,
    /// Time of day for maintenance (HH:MM:SS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window_time: Option<String>,
    /// Identifier of the project VPC the service is placed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_vpc_id: Option<String>,
    /// Secret holding the control plane token for this descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret_ref: Option<AuthSecretReference>,
    /// Overrides the generated connection secret name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_info_secret_target: Option<ConnInfoSecretTarget>,
    /// Prevent the service from being powered off or deleted remotely
    #[serde(default)]
    pub termination_protection: bool,
    /// Kind-specific user configuration, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "user_config_schema")]
    pub user_config: Option<serde_json::Value>,
}

/// Reference to a key inside a Secret in the descriptor's namespace
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthSecretReference {
    pub name: String,
    pub key: String,
}

/// Generated secret target
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnInfoSecretTarget {
    /// Name of the secret to write connection details into
    pub name: String,
}

fn user_config_schema(_gen: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "description": "Service-specific user configuration",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

impl ServiceCommonSpec {
    /// Maintenance window as (dow, time), only when both halves are set
    pub fn maintenance_window(&self) -> Option<(&str, &str)> {
        match (
            self.maintenance_window_dow.as_deref(),
            self.maintenance_window_time.as_deref(),
        ) {
            (Some(dow), Some(time)) if !dow.is_empty() && !time.is_empty() => Some((dow, time)),
            _ => None,
        }
    }

    /// VPC reference, ignoring empty strings
    pub fn vpc_id(&self) -> Option<&str> {
        self.project_vpc_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Check the fields the API server schema cannot express
    ///
    /// # Errors
    ///
    /// Returns a human-readable message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.project.trim().is_empty() {
            return Err("spec.project must not be empty".to_string());
        }
        if self.plan.trim().is_empty() {
            return Err("spec.plan must not be empty".to_string());
        }
        if let Some(dow) = self.maintenance_window_dow.as_deref() {
            if !MAINTENANCE_DAYS.contains(&dow) {
                return Err(format!(
                    "spec.maintenanceWindowDow '{dow}' must be one of {}",
                    MAINTENANCE_DAYS.join(", ")
                ));
            }
        }
        if let Some(time) = self.maintenance_window_time.as_deref() {
            if !MAINTENANCE_TIME.is_match(time) {
                return Err(format!(
                    "spec.maintenanceWindowTime '{time}' must be formatted as HH:MM:SS"
                ));
            }
        }
        Ok(())
    }
}
