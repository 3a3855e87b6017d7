//! # Managed Service Status
//!
//! Observed state written by the reconciliation engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type mirrored from the phase
pub const READY_CONDITION: &str = "Ready";

/// Reconciliation phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum Phase {
    /// Seen for the first time, nothing done yet
    #[default]
    Uninitialized,
    /// A dependency (project, VPC, auth secret) is not ready
    Waiting,
    /// Remote service requested, not yet running
    Provisioning,
    /// Remote service running and connection secret written
    Ready,
    /// Remote teardown in progress
    Deleting,
    /// Transient failures reached the backoff ceiling; still retrying
    Degraded,
    /// Permanent failure; waits for a spec edit
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Uninitialized => "Uninitialized",
            Phase::Waiting => "Waiting",
            Phase::Provisioning => "Provisioning",
            Phase::Ready => "Ready",
            Phase::Deleting => "Deleting",
            Phase::Degraded => "Degraded",
            Phase::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shared by every managed service kind
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedStatus {
    /// Current reconciliation phase
    #[serde(default)]
    pub phase: Phase,
    /// Remote lifecycle state as reported by the control plane
    /// Values: REBUILDING, RUNNING, POWEROFF, REBALANCING
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window_dow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_vpc_id: Option<String>,
    /// Human-readable description of the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Generation the status was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl ManagedStatus {
    /// Move to `phase` and keep the Ready condition in step
    ///
    /// `lastTransitionTime` only changes when the condition status flips, so
    /// re-applying the same phase yields an equal status.
    pub fn set_phase(&mut self, phase: Phase, message: impl Into<String>) {
        let message = message.into();
        let status = if phase == Phase::Ready { "True" } else { "False" };
        let previous = self
            .conditions
            .iter()
            .find(|c| c.r#type == READY_CONDITION)
            .cloned();
        let last_transition_time = match previous {
            Some(ref c) if c.status == status => c.last_transition_time.clone(),
            _ => Some(chrono::Utc::now().to_rfc3339()),
        };

        self.conditions.retain(|c| c.r#type != READY_CONDITION);
        self.conditions.push(Condition {
            r#type: READY_CONDITION.to_string(),
            status: status.to_string(),
            last_transition_time,
            reason: Some(phase.as_str().to_string()),
            message: Some(message.clone()),
        });
        self.phase = phase;
        self.message = Some(message);
    }

    pub fn ready_condition(&self) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == READY_CONDITION)
    }
}
