//! # TempoStack Status
//!
//! Status types reported back on the TempoStack resource.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the TempoStack resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TempoStackStatus {
    /// Version of tempo the stack is running, derived from the tempo image tag
    #[serde(default)]
    pub tempo_version: String,
    /// Conditions represent the latest available observations, in insertion order
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (Ready, Degraded)
    pub r#type: String,
    /// Status of the condition
    pub status: ConditionStatus,
    /// Machine-readable reason for the last transition
    #[serde(default)]
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Last time the status changed (RFC3339)
    pub last_transition_time: String,
}

/// Status of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition types set by the controller
pub mod condition_types {
    pub const READY: &str = "Ready";
    pub const DEGRADED: &str = "Degraded";
}

/// Condition reasons set by the controller
pub mod reasons {
    pub const READY: &str = "Ready";
    pub const INVALID_STORAGE_CONFIG: &str = "InvalidStorageConfig";
}
