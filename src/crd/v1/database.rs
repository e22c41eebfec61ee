//! VerticaDB, current schema version (`vertica.com/v1`)
//!
//! This is the hub version: every other Database representation converts into
//! it, and admission always runs against it. Fields that only the legacy
//! version carries natively (k-safety, requeue times, ...) live in
//! `metadata.annotations` and are accessed through
//! [`crate::annotations::DatabaseExtensions`].

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, PodSecurityContext, Probe, ResourceRequirements, SecurityContext, Toleration,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::types::{condition_is_true, Affinity, Condition, LocalObjectReference};

pub const INIT_POLICY_CREATE: &str = "Create";
pub const INIT_POLICY_CREATE_SKIP_PACKAGE_INSTALL: &str = "CreateSkipPackageInstall";
pub const INIT_POLICY_REVIVE: &str = "Revive";
pub const INIT_POLICY_SCHEDULE_ONLY: &str = "ScheduleOnly";

pub const UPGRADE_POLICY_AUTO: &str = "Auto";

pub const SSE_S3: &str = "SSE-S3";
pub const SSE_KMS: &str = "SSE-KMS";
pub const SSE_C: &str = "SSE-C";

pub const DEPOT_VOLUME_EMPTY_DIR: &str = "EmptyDir";
pub const DEPOT_VOLUME_PERSISTENT_VOLUME: &str = "PersistentVolume";

pub const HTTP_SERVER_MODE_ENABLED: &str = "Enabled";
pub const HTTP_SERVER_MODE_DISABLED: &str = "Disabled";
pub const HTTP_SERVER_MODE_AUTO: &str = "Auto";

pub const ENCRYPT_SPREAD_COMM_WITH_VERTICA: &str = "vertica";

pub const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";
pub const SERVICE_TYPE_NODE_PORT: &str = "NodePort";
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";
pub const SERVICE_TYPE_EXTERNAL_NAME: &str = "ExternalName";

pub const S3_PREFIX: &str = "s3://";
pub const GCLOUD_PREFIX: &str = "gs://";
pub const AZURE_PREFIX: &str = "azb://";
pub const HDFS_PREFIXES: [&str; 2] = ["webhdfs://", "swebhdfs://"];

pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_GCLOUD_REGION: &str = "US-EAST1";
pub const DEFAULT_GCLOUD_ENDPOINT: &str = "https://storage.googleapis.com";

/// additionalConfig key holding the KMS key id for SSE-KMS
pub const S3_SSE_KMS_KEY_ID: &str = "S3SseKmsKeyId";
/// additionalConfig keys holding the Kerberos settings
pub const KERBEROS_REALM_CONFIG: &str = "KerberosRealm";
pub const KERBEROS_SERVICE_NAME_CONFIG: &str = "KerberosServiceName";

/// Set by the reconciler while the image is being changed
pub const CONDITION_UPGRADE_IN_PROGRESS: &str = "UpgradeInProgress";
/// Set by the reconciler once the database exists in communal storage
pub const CONDITION_DB_INITIALIZED: &str = "DBInitialized";

/// Role of a subcluster within the database
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubclusterType {
    Primary,
    Secondary,
    Transient,
    SandboxPrimary,
}

impl SubclusterType {
    pub const ALL: [SubclusterType; 4] = [
        SubclusterType::Primary,
        SubclusterType::Secondary,
        SubclusterType::Transient,
        SubclusterType::SandboxPrimary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubclusterType::Primary => "primary",
            SubclusterType::Secondary => "secondary",
            SubclusterType::Transient => "transient",
            SubclusterType::SandboxPrimary => "sandboxprimary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for SubclusterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of a Vertica database
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1",
    kind = "VerticaDB",
    namespaced,
    status = "VerticaDBStatus",
    shortname = "vdb",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Subclusters","type":"integer","jsonPath":".status.subclusterCount"}"#,
    printcolumn = r#"{"name":"Installed","type":"integer","jsonPath":".status.installCount"}"#,
    printcolumn = r#"{"name":"DBAdded","type":"integer","jsonPath":".status.addedToDBCount"}"#,
    printcolumn = r#"{"name":"Up","type":"integer","jsonPath":".status.upNodeCount"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaDBSpec {
    #[serde(default = "default_image_pull_policy")]
    pub image_pull_policy: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,

    #[serde(default = "default_image")]
    pub image: String,

    /// Labels added to every object the operator creates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations added to every object the operator creates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default = "default_true")]
    pub auto_restart_vertica: bool,

    #[serde(default = "default_db_name")]
    pub db_name: String,

    #[serde(default = "default_shard_count")]
    pub shard_count: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license_secret: String,

    #[serde(default = "default_init_policy")]
    pub init_policy: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_point: Option<RestorePointPolicy>,

    #[serde(default = "default_upgrade_policy")]
    pub upgrade_policy: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revive_order: Vec<SubclusterPodCount>,

    #[serde(default)]
    pub communal: CommunalStorage,

    #[serde(default)]
    pub local: LocalStorage,

    #[serde(default)]
    pub subclusters: Vec<Subcluster>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hadoop_config: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_subcluster_routing: Option<SubclusterSelection>,

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
    pub encrypt_spread_comm: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub security_context: Option<SecurityContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub pod_security_context: Option<PodSecurityContext>,

    #[serde(default, rename = "nmaTLSSecret", skip_serializing_if = "String::is_empty")]
    pub nma_tls_secret: String,

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

    /// Deprecated. Kept so that existing objects keep validating.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_server_mode: String,
}

fn default_true() -> bool {
    true
}

fn default_image_pull_policy() -> String {
    "IfNotPresent".to_string()
}

pub(crate) fn default_image() -> String {
    "opentext/vertica-k8s:24.1.0-0-minimal".to_string()
}

fn default_db_name() -> String {
    "vertdb".to_string()
}

fn default_shard_count() -> i32 {
    6
}

fn default_init_policy() -> String {
    INIT_POLICY_CREATE.to_string()
}

fn default_upgrade_policy() -> String {
    UPGRADE_POLICY_AUTO.to_string()
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
            password_secret: String::new(),
            license_secret: String::new(),
            init_policy: default_init_policy(),
            restore_point: None,
            upgrade_policy: default_upgrade_policy(),
            revive_order: Vec::new(),
            communal: CommunalStorage::default(),
            local: LocalStorage::default(),
            subclusters: Vec::new(),
            hadoop_config: String::new(),
            temporary_subcluster_routing: None,
            sidecars: Vec::new(),
            volumes: Vec::new(),
            volume_mounts: Vec::new(),
            cert_secrets: Vec::new(),
            kerberos_secret: String::new(),
            encrypt_spread_comm: String::new(),
            security_context: None,
            pod_security_context: None,
            nma_tls_secret: String::new(),
            readiness_probe_override: None,
            liveness_probe_override: None,
            startup_probe_override: None,
            service_account_name: String::new(),
            http_server_mode: String::new(),
        }
    }
}

/// Restore point to revive from
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestorePointPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub archive: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubclusterPodCount {
    pub subcluster_index: i32,
    #[serde(default)]
    pub pod_count: i32,
}

/// Routing used while subclusters are offline during an upgrade
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubclusterSelection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    /// Template for a transient subcluster created for the upgrade
    #[serde(default)]
    pub template: Subcluster,
}

/// External storage location for the database
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunalStorage {
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub credential_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_file: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_server_side_encryption: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_sse_customer_key_secret: String,

    /// Server config parameters passed through to the database
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_config: BTreeMap<String, String>,
}

/// Pod-local storage settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalStorage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub request_size: Option<Quantity>,

    #[serde(default = "default_data_path")]
    pub data_path: String,

    #[serde(default = "default_depot_path")]
    pub depot_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub depot_volume: String,

    #[serde(default = "default_data_path")]
    pub catalog_path: String,
}

fn default_data_path() -> String {
    "/data".to_string()
}

fn default_depot_path() -> String {
    "/depot".to_string()
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self {
            storage_class: String::new(),
            request_size: None,
            data_path: default_data_path(),
            depot_path: default_depot_path(),
            depot_volume: String::new(),
            catalog_path: default_data_path(),
        }
    }
}

impl LocalStorage {
    /// The catalog shares the data path when not set
    pub fn catalog_path(&self) -> &str {
        if self.catalog_path.is_empty() {
            &self.data_path
        } else {
            &self.catalog_path
        }
    }

    pub fn is_depot_volume_empty_dir(&self) -> bool {
        self.depot_volume == DEPOT_VOLUME_EMPTY_DIR
    }

    pub fn is_known_depot_volume_type(&self) -> bool {
        self.depot_volume.is_empty()
            || self.depot_volume == DEPOT_VOLUME_EMPTY_DIR
            || self.depot_volume == DEPOT_VOLUME_PERSISTENT_VOLUME
    }

    pub fn is_depot_path_unique(&self) -> bool {
        self.depot_path != self.data_path && self.depot_path != self.catalog_path()
    }
}

/// A named, independently sized partition of the database
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subcluster {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub size: i32,

    /// One of primary, secondary, transient or sandboxprimary
    #[serde(default = "default_subcluster_type", rename = "type")]
    pub type_: String,

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
    pub client_node_port: i32,

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

fn default_subcluster_type() -> String {
    SubclusterType::Primary.as_str().to_string()
}

fn default_service_type() -> String {
    SERVICE_TYPE_CLUSTER_IP.to_string()
}

pub(crate) fn is_zero(v: &i32) -> bool {
    *v == 0
}

impl Default for Subcluster {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            type_: default_subcluster_type(),
            image_override: String::new(),
            node_selector: BTreeMap::new(),
            affinity: Affinity::default(),
            priority_class_name: String::new(),
            tolerations: Vec::new(),
            resources: None,
            service_type: default_service_type(),
            service_name: String::new(),
            client_node_port: 0,
            vertica_http_node_port: 0,
            external_ips: Vec::new(),
            load_balancer_ip: String::new(),
            service_annotations: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}

impl Subcluster {
    pub fn role(&self) -> Option<SubclusterType> {
        SubclusterType::parse(&self.type_)
    }

    pub fn is_primary(&self) -> bool {
        self.type_ == SubclusterType::Primary.as_str()
    }

    pub fn is_transient(&self) -> bool {
        self.type_ == SubclusterType::Transient.as_str()
    }

    /// Transient subclusters count as secondaries
    pub fn effective_type(&self) -> &str {
        if self.is_transient() {
            SubclusterType::Secondary.as_str()
        } else {
            &self.type_
        }
    }

    /// Name usable inside a DNS name: underscores become dashes
    pub fn fqdn_compatible_name(&self) -> String {
        self.name.replace('_', "-")
    }

    /// Name of the service routing to this subcluster
    pub fn service_name(&self) -> String {
        if self.service_name.is_empty() {
            self.fqdn_compatible_name()
        } else {
            self.service_name.clone()
        }
    }
}

/// Observed state, written by the reconciler
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaDBStatus {
    #[serde(default)]
    pub install_count: i32,

    #[serde(default, rename = "addedToDBCount")]
    pub added_to_db_count: i32,

    #[serde(default)]
    pub up_node_count: i32,

    #[serde(default)]
    pub subcluster_count: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subclusters: Vec<SubclusterStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upgrade_status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubclusterStatus {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub oid: String,

    #[serde(default)]
    pub install_count: i32,

    #[serde(default, rename = "addedToDBCount")]
    pub added_to_db_count: i32,

    #[serde(default)]
    pub up_node_count: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<VerticaDBPodStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaDBPodStatus {
    #[serde(default)]
    pub installed: bool,
    #[serde(default, rename = "addedToDB")]
    pub added_to_db: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vnode_name: String,
    #[serde(default)]
    pub up_node: bool,
}

impl VerticaDBStatus {
    pub fn is_upgrade_in_progress(&self) -> bool {
        condition_is_true(&self.conditions, CONDITION_UPGRADE_IN_PROGRESS)
    }

    pub fn is_db_initialized(&self) -> bool {
        condition_is_true(&self.conditions, CONDITION_DB_INITIALIZED)
    }

    pub fn subcluster(&self, name: &str) -> Option<&SubclusterStatus> {
        self.subclusters.iter().find(|s| s.name == name)
    }
}

impl VerticaDBSpec {
    pub fn is_s3(&self) -> bool {
        self.communal.path.starts_with(S3_PREFIX)
    }

    pub fn is_gcloud(&self) -> bool {
        self.communal.path.starts_with(GCLOUD_PREFIX)
    }

    pub fn is_azure(&self) -> bool {
        self.communal.path.starts_with(AZURE_PREFIX)
    }

    pub fn is_hdfs(&self) -> bool {
        HDFS_PREFIXES.iter().any(|p| self.communal.path.starts_with(p))
    }

    pub fn is_sse_kms(&self) -> bool {
        self.communal.s3_server_side_encryption.eq_ignore_ascii_case(SSE_KMS)
    }

    pub fn is_sse_c(&self) -> bool {
        self.communal.s3_server_side_encryption.eq_ignore_ascii_case(SSE_C)
    }

    pub fn is_known_sse_type(&self) -> bool {
        [SSE_S3, SSE_KMS, SSE_C]
            .iter()
            .any(|t| self.communal.s3_server_side_encryption.eq_ignore_ascii_case(t))
    }

    pub fn kerberos_realm(&self) -> &str {
        self.communal
            .additional_config
            .get(KERBEROS_REALM_CONFIG)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn kerberos_service_name(&self) -> &str {
        self.communal
            .additional_config
            .get(KERBEROS_SERVICE_NAME_CONFIG)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_schedule_only(&self) -> bool {
        self.init_policy == INIT_POLICY_SCHEDULE_ONLY
    }

    /// Sum of all subcluster sizes
    pub fn cluster_size(&self) -> i64 {
        self.subclusters.iter().map(|sc| i64::from(sc.size)).sum()
    }

    pub fn find_subcluster(&self, name: &str) -> Option<&Subcluster> {
        self.subclusters.iter().find(|sc| sc.name == name)
    }

    /// A transient subcluster is needed when the routing template is filled out
    pub fn requires_transient_subcluster(&self) -> bool {
        self.temporary_subcluster_routing
            .as_ref()
            .is_some_and(|r| !r.template.name.is_empty() && r.template.size > 0)
    }
}
