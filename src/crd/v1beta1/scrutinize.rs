//! VerticaScrutinize: collects a diagnostic bundle from a database

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, ResourceRequirements, Toleration, Volume};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::types::{Affinity, Condition};
use crate::crd::v1::database::is_zero;

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaScrutinize",
    namespaced,
    status = "VerticaScrutinizeStatus",
    shortname = "vscr",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaScrutinizeSpec {
    #[serde(default, rename = "verticaDBName")]
    pub vertica_db_name: String,

    /// Where the bundle is written; an emptyDir is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub volume: Option<Volume>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub init_containers: Vec<Container>,

    /// `YYYY-MM-DD HH [+/-XX]`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_age_oldest_time: String,

    /// `YYYY-MM-DD HH [+/-XX]`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_age_newest_time: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub log_age_hours: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Affinity::is_empty")]
    pub affinity: Affinity,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority_class_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub tolerations: Vec<Toleration>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaScrutinizeStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_name: String,

    #[serde(default, rename = "podUID", skip_serializing_if = "String::is_empty")]
    pub pod_uid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tarball_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
