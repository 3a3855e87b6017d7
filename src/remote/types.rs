//! # Control Plane Types
//!
//! Request and response payloads exchanged with the provisioning API.
//!
//! Field names follow the API's snake_case JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Remote lifecycle state of a running service
pub const STATE_RUNNING: &str = "RUNNING";

/// Remote lifecycle state of a usable VPC
pub const VPC_STATE_ACTIVE: &str = "ACTIVE";

/// A provisioned service as reported by the control plane
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RemoteService {
    pub service_name: String,
    #[serde(default)]
    pub service_type: String,
    /// REBUILDING, RUNNING, POWEROFF, REBALANCING
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceWindow>,
    /// Full connection URI
    #[serde(default)]
    pub service_uri: String,
    /// Parsed URI parts: host, port, user, password, dbname, sslmode
    #[serde(default)]
    pub service_uri_params: BTreeMap<String, String>,
    #[serde(default)]
    pub users: Vec<ServiceUser>,
    #[serde(default)]
    pub connection_info: ConnectionInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_space_mb: Option<u64>,
    #[serde(default)]
    pub termination_protection: bool,
}

impl RemoteService {
    pub fn is_running(&self) -> bool {
        self.state == STATE_RUNNING
    }

    /// URI parameter by name, empty when absent
    pub fn uri_param(&self, key: &str) -> &str {
        self.service_uri_params
            .get(key)
            .map_or("", String::as_str)
    }

    /// Credentials from the URI, falling back to the first service user
    pub fn credentials(&self) -> (&str, &str) {
        let first = self.users.first();
        let user = match self.uri_param("user") {
            "" => first.map_or("", |u| u.username.as_str()),
            user => user,
        };
        let password = match self.uri_param("password") {
            "" => first.map_or("", |u| u.password.as_str()),
            password => password,
        };
        (user, password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MaintenanceWindow {
    pub dow: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceUser {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "type")]
    pub user_type: String,
}

/// Kind-specific connection metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka_access_cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka_access_key: Option<String>,
}

/// Body of `POST /v1/project/{project}/service`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateServiceRequest {
    pub service_name: String,
    pub service_type: String,
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space_mb: Option<u64>,
    pub termination_protection: bool,
}

/// Body of `PUT /v1/project/{project}/service/{service}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateServiceRequest {
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_space_mb: Option<u64>,
    pub powered: bool,
    pub termination_protection: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteProject {
    pub project_name: String,
    #[serde(default)]
    pub default_cloud: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteVpc {
    pub project_vpc_id: String,
    /// APPROVED, ACTIVE, DELETING, DELETED
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub network_cidr: String,
}

impl RemoteVpc {
    pub fn is_active(&self) -> bool {
        self.state == VPC_STATE_ACTIVE
    }
}
