//! VerticaRestorePointsQuery: lists restore points of a database

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::types::Condition;

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaRestorePointsQuery",
    namespaced,
    status = "VerticaRestorePointsQueryStatus",
    shortname = "vrpq",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaRestorePointsQuerySpec {
    #[serde(default, rename = "verticaDBName")]
    pub vertica_db_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_options: Option<RestorePointFilterOptions>,
}

/// Optional filters; empty strings mean "no bound"
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestorePointFilterOptions {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub archive_name: String,

    /// `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS[.fffffffff]`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_timestamp: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub end_timestamp: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaRestorePointsQueryStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restore_points: Vec<RestorePoint>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestorePoint {
    #[serde(default)]
    pub archive: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub vertica_version: String,
}
