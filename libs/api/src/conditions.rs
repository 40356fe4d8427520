//! Status conditions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition types the harness inspects.
pub mod types {
    pub const READY: &str = "Ready";
    pub const UPDATING: &str = "Updating";
    pub const ACCESSIBLE: &str = "Accessible";
    pub const APPROVED: &str = "Approved";
    pub const SPEC_VALID: &str = "SpecValid";
    pub const RESOURCE_PARSED: &str = "ResourceParsed";
    pub const SYNCED: &str = "Synced";
}

/// Condition reasons the harness inspects.
pub mod reasons {
    pub const UPDATED: &str = "Updated";
    pub const PREPARING: &str = "Preparing";
    pub const READY_TO_UPDATE: &str = "ReadyToUpdate";
    pub const APPLYING_UPDATE: &str = "ApplyingUpdate";
    pub const REBOOTING: &str = "Rebooting";
}

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A single status condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,

    pub status: ConditionStatus,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    pub fn new(condition_type: &str, status: ConditionStatus, reason: &str) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status,
            reason: reason.to_string(),
            message: String::new(),
            last_transition_time: None,
            observed_generation: None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// First condition with the given type.
pub fn find_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions
        .iter()
        .find(|c| c.condition_type == condition_type)
}

/// Whether a condition with this type, status, and reason is present.
pub fn condition_exists(
    conditions: &[Condition],
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
) -> bool {
    conditions
        .iter()
        .any(|c| c.condition_type == condition_type && c.status == status && c.reason == reason)
}

/// Whether a condition with this type and status is present, whatever the reason.
pub fn condition_status_exists(
    conditions: &[Condition],
    condition_type: &str,
    status: ConditionStatus,
) -> bool {
    conditions
        .iter()
        .any(|c| c.condition_type == condition_type && c.status == status)
}
