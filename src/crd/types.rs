//! Shared types for the Vertica custom resources
//!
//! These are used by both schema versions. They carry no version-specific
//! fields, so conversion copies them unchanged.

use k8s_openapi::api::core::v1::{NodeAffinity, PodAffinity, PodAntiAffinity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group shared by every resource kind
pub const GROUP: &str = "vertica.com";

/// Reference to an object in the same namespace
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Pod scheduling affinity
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Affinity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub node_affinity: Option<NodeAffinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub pod_affinity: Option<PodAffinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub pod_anti_affinity: Option<PodAntiAffinity>,
}

impl Affinity {
    pub fn is_empty(&self) -> bool {
        self.node_affinity.is_none() && self.pod_affinity.is_none() && self.pod_anti_affinity.is_none()
    }
}

/// Status condition following Kubernetes conventions
///
/// Written by the reconciler; this crate only reads it to decide whether an
/// update is currently allowed to touch guarded fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., "UpgradeInProgress", "DBInitialized")
    #[serde(rename = "type")]
    pub type_: String,
    /// Status of the condition: "True", "False", or "Unknown"
    pub status: String,
    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_transition_time: String,
    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Condition {
    pub fn new(type_: &str, status: bool, reason: &str) -> Self {
        Self {
            type_: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: chrono::Utc::now().to_rfc3339(),
            reason: reason.to_string(),
            message: String::new(),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

/// Returns true when a condition of the given type is present and "True"
pub fn condition_is_true(conditions: &[Condition], type_: &str) -> bool {
    conditions.iter().any(|c| c.type_ == type_ && c.is_true())
}
