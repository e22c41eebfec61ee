//! EventTrigger: runs a Job when a referenced VerticaDB reaches a condition

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::JobSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "EventTrigger",
    namespaced,
    status = "EventTriggerStatus",
    shortname = "et",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct EventTriggerSpec {
    #[serde(default)]
    pub references: Vec<ETReference>,

    #[serde(default)]
    pub matches: Vec<ETMatch>,

    #[serde(default)]
    pub template: JobTemplate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ETReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ETRefObject>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ETRefObject {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ETMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ETCondition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ETCondition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobTemplate {
    #[serde(default)]
    pub metadata: JobObjectMeta,

    #[serde(default)]
    #[schemars(with = "serde_json::Value")]
    pub spec: JobSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventTriggerStatus {
    #[serde(default)]
    pub references: Vec<ETRefObjectStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ETRefObjectStatus {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub resource_version: String,
    #[serde(default)]
    pub job_namespace: String,
    #[serde(default)]
    pub job_name: String,
}
