//! VerticaDB, legacy schema version (`vertica.com/v1beta1`)
//!
//! Still served so existing manifests keep working. Objects written in this
//! shape are converted to [`crate::crd::v1::VerticaDB`] before admission.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, PodSecurityContext, Probe, ResourceRequirements, SecurityContext, Toleration,
    Volume, VolumeMount,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::types::{Affinity, LocalObjectReference};
use crate::crd::v1::database::{
    default_image, is_zero, LocalStorage, RestorePointPolicy, SubclusterPodCount,
    VerticaDBStatus,
};

pub const K_SAFETY_0: &str = "0";
pub const K_SAFETY_1: &str = "1";

#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaDB",
    namespaced,
    status = "VerticaDBStatus",
    shortname = "vdb",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaDBSpec {
    #[serde(default = "default_image_pull_policy")]
    pub image_pull_policy: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default = "default_true")]
    pub auto_restart_vertica: bool,

    #[serde(default = "default_db_name")]
    pub db_name: String,

    #[serde(default = "default_shard_count")]
    pub shard_count: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub superuser_password_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license_secret: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_cluster_lease: bool,

    #[serde(default = "default_init_policy")]
    pub init_policy: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_point: Option<RestorePointPolicy>,

    #[serde(default = "default_upgrade_policy")]
    pub upgrade_policy: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_upgrade_path: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revive_order: Vec<SubclusterPodCount>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub restart_timeout: i32,

    #[serde(default)]
    pub communal: CommunalStorage,

    #[serde(default)]
    pub local: LocalStorage,

    #[serde(default)]
    pub subclusters: Vec<Subcluster>,

    #[serde(default)]
    pub temporary_subcluster_routing: SubclusterSelection,

    /// "0" or "1"
    #[serde(default = "default_k_safety")]
    pub k_safety: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub requeue_time: i32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub upgrade_requeue_time: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub sidecars: Vec<Container>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub volumes: Vec<Volume>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub volume_mounts: Vec<VolumeMount>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cert_secrets: Vec<LocalObjectReference>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kerberos_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encrypt_spread_comm: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub security_context: Option<SecurityContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub pod_security_context: Option<PodSecurityContext>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_server_mode: String,

    #[serde(default, rename = "httpServerTLSSecret", skip_serializing_if = "String::is_empty")]
    pub http_server_tls_secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub readiness_probe_override: Option<Probe>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub liveness_probe_override: Option<Probe>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub startup_probe_override: Option<Probe>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,
}

fn default_true() -> bool {
    true
}

fn default_image_pull_policy() -> String {
    "IfNotPresent".to_string()
}

fn default_db_name() -> String {
    "vertdb".to_string()
}

fn default_shard_count() -> i32 {
    6
}

fn default_init_policy() -> String {
    "Create".to_string()
}

fn default_upgrade_policy() -> String {
    "Auto".to_string()
}

fn default_k_safety() -> String {
    K_SAFETY_1.to_string()
}

impl Default for VerticaDBSpec {
    fn default() -> Self {
        Self {
            image_pull_policy: default_image_pull_policy(),
            image_pull_secrets: Vec::new(),
            image: default_image(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            auto_restart_vertica: true,
            db_name: default_db_name(),
            shard_count: default_shard_count(),
            superuser_password_secret: String::new(),
            license_secret: String::new(),
            ignore_cluster_lease: false,
            init_policy: default_init_policy(),
            restore_point: None,
            upgrade_policy: default_upgrade_policy(),
            ignore_upgrade_path: false,
            revive_order: Vec::new(),
            restart_timeout: 0,
            communal: CommunalStorage::default(),
            local: LocalStorage::default(),
            subclusters: Vec::new(),
            temporary_subcluster_routing: SubclusterSelection::default(),
            k_safety: default_k_safety(),
            requeue_time: 0,
            upgrade_requeue_time: 0,
            sidecars: Vec::new(),
            volumes: Vec::new(),
            volume_mounts: Vec::new(),
            cert_secrets: Vec::new(),
            kerberos_secret: String::new(),
            ssh_secret: String::new(),
            encrypt_spread_comm: String::new(),
            security_context: None,
            pod_security_context: None,
            http_server_mode: String::new(),
            http_server_tls_secret: String::new(),
            readiness_probe_override: None,
            liveness_probe_override: None,
            startup_probe_override: None,
            service_account_name: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubclusterSelection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    #[serde(default)]
    pub template: Subcluster,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunalStorage {
    #[serde(default)]
    pub path: String,

    #[serde(default, rename = "includeUIDInPath", skip_serializing_if = "std::ops::Not::not")]
    pub include_uid_in_path: bool,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub credential_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_file: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hadoop_config: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kerberos_service_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kerberos_realm: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_server_side_encryption: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_sse_customer_key_secret: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_config: BTreeMap<String, String>,
}

/// Legacy subcluster: the role is spread over three flags
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subcluster {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub size: i32,

    #[serde(default = "default_true")]
    pub is_primary: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_transient: bool,

    #[serde(default)]
    pub is_sandbox_primary: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_override: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Affinity::is_empty")]
    pub affinity: Affinity,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority_class_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub tolerations: Vec<Toleration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default = "default_service_type")]
    pub service_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub node_port: i32,

    #[serde(default, rename = "verticaHTTPNodePort", skip_serializing_if = "is_zero")]
    pub vertica_http_node_port: i32,

    #[serde(default, rename = "externalIPs", skip_serializing_if = "Vec::is_empty")]
    pub external_ips: Vec<String>,

    #[serde(default, rename = "loadBalancerIP", skip_serializing_if = "String::is_empty")]
    pub load_balancer_ip: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

fn default_service_type() -> String {
    "ClusterIP".to_string()
}

impl Default for Subcluster {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            is_primary: true,
            is_transient: false,
            is_sandbox_primary: false,
            image_override: String::new(),
            node_selector: BTreeMap::new(),
            affinity: Affinity::default(),
            priority_class_name: String::new(),
            tolerations: Vec::new(),
            resources: None,
            service_type: default_service_type(),
            service_name: String::new(),
            node_port: 0,
            vertica_http_node_port: 0,
            external_ips: Vec::new(),
            load_balancer_ip: String::new(),
            service_annotations: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}
