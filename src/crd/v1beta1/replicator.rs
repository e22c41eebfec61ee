//! VerticaReplicator: copies data from one database to another

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::types::Condition;

pub const REPLICATION_MODE_SYNC: &str = "sync";
pub const REPLICATION_MODE_ASYNC: &str = "async";

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaReplicator",
    namespaced,
    status = "VerticaReplicatorStatus",
    shortname = "vrep",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaReplicatorSpec {
    #[serde(default)]
    pub source: VerticaReplicatorSourceDatabaseInfo,

    #[serde(default)]
    pub target: VerticaReplicatorTargetDatabaseInfo,

    #[serde(default, rename = "tlsConfig", skip_serializing_if = "String::is_empty")]
    pub tls_config: String,

    /// sync, async or empty (sync)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mode: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaReplicatorDatabaseInfo {
    #[serde(default, rename = "verticaDB")]
    pub vertica_db: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sandbox_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaReplicatorSourceDatabaseInfo {
    #[serde(flatten)]
    pub database: VerticaReplicatorDatabaseInfo,

    /// Single object to replicate; async only
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub object_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub include_pattern: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exclude_pattern: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaReplicatorTargetDatabaseInfo {
    #[serde(flatten)]
    pub database: VerticaReplicatorDatabaseInfo,

    /// Namespace of the target database; async only
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaReplicatorStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
