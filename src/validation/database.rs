//! Self-contained rules for a VerticaDB spec

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use k8s_openapi::api::core::v1::Probe;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{DatabaseView, FieldError, FieldErrorList, FieldPath};
use crate::annotations::{DatabaseExtensions, K_SAFETY, REQUEUE_TIME, UPGRADE_REQUEUE_TIME};
use crate::crd::v1::database::{
    DEPOT_VOLUME_EMPTY_DIR, DEPOT_VOLUME_PERSISTENT_VOLUME, ENCRYPT_SPREAD_COMM_WITH_VERTICA,
    HTTP_SERVER_MODE_AUTO, HTTP_SERVER_MODE_DISABLED, HTTP_SERVER_MODE_ENABLED,
    INIT_POLICY_CREATE, INIT_POLICY_CREATE_SKIP_PACKAGE_INSTALL, INIT_POLICY_REVIVE,
    INIT_POLICY_SCHEDULE_ONLY, KERBEROS_REALM_CONFIG, KERBEROS_SERVICE_NAME_CONFIG,
    S3_SSE_KMS_KEY_ID, SERVICE_TYPE_CLUSTER_IP, SERVICE_TYPE_EXTERNAL_NAME,
    SERVICE_TYPE_LOAD_BALANCER, SERVICE_TYPE_NODE_PORT,
};
use crate::crd::v1::VerticaDBSpec;
use crate::crd::v1beta1::database::{K_SAFETY_0, K_SAFETY_1};

pub const DB_NAME_LENGTH_LIMIT: usize = 30;
const INVALID_DB_NAME_CHARS: &str = "$=<>`'^\".@*?#&/-:;{}()[] \\~!%+|,";

/// Kubernetes' default NodePort allocation range
pub const NODE_PORT_RANGE: RangeInclusive<i32> = 30000..=32767;

const K_SAFETY_0_HOSTS: RangeInclusive<i64> = 1..=3;
const K_SAFETY_1_MIN_HOSTS: i64 = 3;

const DNS_LABEL_MAX_LEN: usize = 63;
static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("constant pattern"));

/// Volume names the operator generates for every pod
const RESERVED_VOLUME_NAMES: [&str; 8] = [
    "local-data",
    "podinfo",
    "licensing",
    "hadoop-conf",
    "krb5",
    "ssh",
    "http-server-certs",
    "depot",
];

/// Mount paths the operator generates for every pod
const RESERVED_MOUNT_PATHS: [&str; 10] = [
    "/opt/vertica/config",
    "/opt/vertica/config/share",
    "/opt/vertica/config/logrotate",
    "/opt/vertica/log",
    "/etc/podinfo",
    "/home/dbadmin/licensing/mnt",
    "/etc/hadoop",
    "/etc/krb5",
    "/etc/krb5.conf",
    "/home/dbadmin/.ssh",
];

const CERTS_ROOT: &str = "/certs";

/// Paths shipped inside the server image
const RESTRICTED_LOCAL_PATHS: [&str; 14] = [
    "/home",
    "/home/dbadmin",
    "/opt",
    "/opt/vertica",
    "/opt/vertica/bin",
    "/opt/vertica/sbin",
    "/opt/vertica/include",
    "/opt/vertica/java",
    "/opt/vertica/lib",
    "/opt/vertica/oss",
    "/opt/vertica/packages",
    "/opt/vertica/share",
    "/opt/vertica/scripts",
    "/opt/vertica/spread",
];

/// Labels the operator sets on every object it creates
const PROTECTED_LABELS: [&str; 9] = [
    "app.kubernetes.io/instance",
    "app.kubernetes.io/managed-by",
    "app.kubernetes.io/name",
    "app.kubernetes.io/component",
    "vertica.com/database",
    "vertica.com/subcluster-name",
    "vertica.com/subcluster-type",
    "vertica.com/subcluster-svc",
    "vertica.com/sandbox",
];

/// Runs every structural rule and returns all violations
pub fn validate_database(db: DatabaseView<'_>) -> FieldErrorList {
    let spec = db.spec;
    let mut errors = FieldErrorList::new();

    check_has_subclusters(spec, &mut errors);
    check_init_policy(spec, &mut errors);
    check_db_name(spec, &mut errors);
    check_has_primary(spec, &mut errors);
    check_k_safety(spec, db.extensions, &mut errors);
    check_communal_path(spec, &mut errors);
    check_server_side_encryption(spec, &mut errors);
    check_additional_config(spec, &mut errors);
    check_labels(spec, &mut errors);
    check_endpoint(spec, &mut errors);
    check_subcluster_names(spec, &mut errors);
    check_subcluster_types(spec, &mut errors);
    check_node_ports(spec, &mut errors);
    check_service_types(spec, &mut errors);
    check_duplicate_names(spec, &mut errors);
    check_volume_names(spec, &mut errors);
    check_volume_mounts(spec, &mut errors);
    check_kerberos(spec, &mut errors);
    check_temporary_routing(spec, &mut errors);
    check_requeue_times(db.extensions, &mut errors);
    check_encrypt_spread_comm(spec, &mut errors);
    check_local_storage(spec, &mut errors);
    check_http_server_mode(spec, &mut errors);
    check_shard_count(spec, &mut errors);
    check_probe_overrides(spec, &mut errors);

    errors
}

fn subcluster_path(i: usize) -> FieldPath {
    FieldPath::spec().child("subclusters").index(i)
}

fn check_has_subclusters(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    if spec.subclusters.is_empty() {
        errors.push(FieldError::required(
            FieldPath::spec().child("subclusters"),
            "there should be at least one subcluster defined",
        ));
    }
}

fn check_init_policy(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let known = [
        INIT_POLICY_CREATE,
        INIT_POLICY_CREATE_SKIP_PACKAGE_INSTALL,
        INIT_POLICY_REVIVE,
        INIT_POLICY_SCHEDULE_ONLY,
    ];
    if !known.contains(&spec.init_policy.as_str()) {
        errors.push(FieldError::not_supported(
            FieldPath::spec().child("initPolicy"),
            &spec.init_policy,
            "initPolicy should either be Create, CreateSkipPackageInstall, Revive or ScheduleOnly",
        ));
    }
}

fn check_db_name(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let path = FieldPath::spec().child("dbName");
    if spec.db_name.len() > DB_NAME_LENGTH_LIMIT {
        errors.push(FieldError::invalid(
            path.clone(),
            &spec.db_name,
            format!("dbName cannot exceed {DB_NAME_LENGTH_LIMIT} characters"),
        ));
    }
    for c in INVALID_DB_NAME_CHARS.chars().filter(|c| spec.db_name.contains(*c)) {
        errors.push(FieldError::invalid(
            path.clone(),
            &spec.db_name,
            format!("dbName cannot have the '{c}' character"),
        ));
    }
}

fn check_has_primary(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    if !spec.subclusters.iter().any(|sc| sc.is_primary()) {
        let names: Vec<&str> = spec.subclusters.iter().map(|sc| sc.name.as_str()).collect();
        errors.push(FieldError::invalid(
            FieldPath::spec().child("subclusters"),
            names,
            "there must be at least one primary subcluster",
        ));
    }
}

fn check_k_safety(spec: &VerticaDBSpec, ext: &DatabaseExtensions, errors: &mut FieldErrorList) {
    if spec.is_schedule_only() {
        return;
    }
    let path = FieldPath::annotation(K_SAFETY);
    let size = spec.cluster_size();
    match ext.k_safety.as_str() {
        K_SAFETY_0 => {
            if !K_SAFETY_0_HOSTS.contains(&size) {
                errors.push(FieldError::invalid(
                    path,
                    &ext.k_safety,
                    format!(
                        "with kSafety 0, the total size of the cluster must have between {} and {} hosts",
                        K_SAFETY_0_HOSTS.start(),
                        K_SAFETY_0_HOSTS.end()
                    ),
                ));
            }
        }
        K_SAFETY_1 => {
            if size < K_SAFETY_1_MIN_HOSTS {
                errors.push(FieldError::invalid(
                    path,
                    &ext.k_safety,
                    format!(
                        "with kSafety 1, the total size of the cluster must have at least {K_SAFETY_1_MIN_HOSTS} hosts"
                    ),
                ));
            }
        }
        other => errors.push(FieldError::not_supported(
            path,
            other,
            format!("kSafety can only be {K_SAFETY_0} or {K_SAFETY_1}"),
        )),
    }
}

fn check_communal_path(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    if !spec.is_schedule_only() && spec.communal.path.is_empty() {
        errors.push(FieldError::required(
            FieldPath::spec().child("communal").child("path"),
            "communal.path cannot be empty",
        ));
    }
}

fn check_server_side_encryption(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let communal = &spec.communal;
    if !spec.is_s3() || communal.s3_server_side_encryption.is_empty() {
        return;
    }
    let prefix = FieldPath::spec().child("communal");
    if !spec.is_known_sse_type() {
        errors.push(FieldError::not_supported(
            prefix.child("s3ServerSideEncryption"),
            &communal.s3_server_side_encryption,
            "communal.s3ServerSideEncryption, if specified, can only be SSE-S3, SSE-KMS or SSE-C",
        ));
    }
    let has_kms_key = communal
        .additional_config
        .get(S3_SSE_KMS_KEY_ID)
        .is_some_and(|v| !v.is_empty());
    if spec.is_sse_kms() && !has_kms_key {
        errors.push(FieldError::required(
            prefix.child("additionalConfig").key(S3_SSE_KMS_KEY_ID),
            format!(
                "communal.additionalConfig[{S3_SSE_KMS_KEY_ID}] must be set when setting up SSE-KMS server-side encryption"
            ),
        ));
    }
    if spec.is_sse_c() && communal.s3_sse_customer_key_secret.is_empty() {
        errors.push(FieldError::required(
            prefix.child("s3SseCustomerKeySecret"),
            "communal.s3SseCustomerKeySecret must be set when setting up SSE-C server-side encryption",
        ));
    }
}

/// Server configuration keys are case-insensitive
fn check_additional_config(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let mut seen = BTreeSet::new();
    for key in spec.communal.additional_config.keys() {
        if !seen.insert(key.to_lowercase()) {
            errors.push(FieldError::duplicate(
                FieldPath::spec().child("communal").child("additionalConfig"),
                key,
                format!("duplicates key {key}"),
            ));
        }
    }
}

fn check_labels(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    for label in PROTECTED_LABELS.iter().filter(|l| spec.labels.contains_key(**l)) {
        errors.push(FieldError::forbidden(
            FieldPath::spec().child("labels").key(label),
            &spec.labels[*label],
            format!("'{label}' is a restricted label."),
        ));
    }
}

fn check_endpoint(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    if spec.is_schedule_only() || !(spec.is_s3() || spec.is_gcloud()) {
        return;
    }
    let endpoint = &spec.communal.endpoint;
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        errors.push(FieldError::invalid(
            FieldPath::spec().child("communal").child("endpoint"),
            endpoint,
            "communal.endpoint must be prefaced with http:// or https:// to know what protocol to connect with",
        ));
    }
}

fn check_subcluster_names(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    for (i, sc) in spec.subclusters.iter().enumerate() {
        let name = sc.fqdn_compatible_name();
        if name.len() > DNS_LABEL_MAX_LEN || !DNS_LABEL.is_match(&name) {
            errors.push(FieldError::invalid(
                subcluster_path(i).child("name"),
                &sc.name,
                "is not a valid domain name",
            ));
        }
    }
}

fn check_subcluster_types(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    for (i, sc) in spec.subclusters.iter().enumerate() {
        if sc.role().is_none() {
            errors.push(FieldError::not_supported(
                subcluster_path(i).child("type"),
                &sc.type_,
                "type must be one of primary, secondary, transient or sandboxprimary",
            ));
        }
    }
}

/// Node ports only exist for NodePort and LoadBalancer services
fn check_node_ports(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    for (i, sc) in spec.subclusters.iter().enumerate() {
        let exposes_node_ports = sc.service_type == SERVICE_TYPE_NODE_PORT
            || sc.service_type == SERVICE_TYPE_LOAD_BALANCER;
        let ports = [
            ("clientNodePort", sc.client_node_port),
            ("verticaHTTPNodePort", sc.vertica_http_node_port),
        ];
        for (field, port) in ports.into_iter().filter(|(_, p)| *p != 0) {
            let path = subcluster_path(i).child(field);
            if !exposes_node_ports {
                errors.push(FieldError::forbidden(
                    path,
                    port,
                    format!(
                        "{field} can only be specified for service types {SERVICE_TYPE_LOAD_BALANCER} and {SERVICE_TYPE_NODE_PORT}"
                    ),
                ));
            } else if !NODE_PORT_RANGE.contains(&port) {
                errors.push(FieldError::invalid(
                    path,
                    port,
                    format!(
                        "{field} must be 0 or in the range of {}-{}",
                        NODE_PORT_RANGE.start(),
                        NODE_PORT_RANGE.end()
                    ),
                ));
            }
        }
    }
}

fn check_service_types(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let known = [
        SERVICE_TYPE_CLUSTER_IP,
        SERVICE_TYPE_NODE_PORT,
        SERVICE_TYPE_LOAD_BALANCER,
        SERVICE_TYPE_EXTERNAL_NAME,
    ];
    for (i, sc) in spec.subclusters.iter().enumerate() {
        if !known.contains(&sc.service_type.as_str()) {
            errors.push(FieldError::not_supported(
                subcluster_path(i).child("serviceType"),
                &sc.service_type,
                "not a valid service type",
            ));
        }
    }
}

/// Names are compared after mapping to their DNS form, since that is what
/// the generated objects are named after
fn check_duplicate_names(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let names: Vec<String> = spec.subclusters.iter().map(|sc| sc.fqdn_compatible_name()).collect();
    for (j, name) in names.iter().enumerate() {
        if let Some(i) = names[..j].iter().position(|n| n == name) {
            errors.push(FieldError::duplicate(
                subcluster_path(j).child("name"),
                &spec.subclusters[j].name,
                format!("duplicates the name of subcluster[{i}]"),
            ));
        }
    }
}

fn check_volume_names(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    for (i, vol) in spec.volumes.iter().enumerate() {
        if RESERVED_VOLUME_NAMES.contains(&vol.name.as_str()) {
            errors.push(FieldError::invalid(
                FieldPath::spec().child("volumes").index(i).child("name"),
                &vol.name,
                "conflicts with the name of one of the internally generated volumes",
            ));
        }
    }
}

fn check_volume_mounts(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let local = &spec.local;
    let generated = [
        local.data_path.as_str(),
        local.depot_path.as_str(),
        local.catalog_path(),
    ];
    for (i, mount) in spec.volume_mounts.iter().enumerate() {
        let path = FieldPath::spec().child("volumeMounts").index(i).child("mountPath");
        let mount_path = mount.mount_path.as_str();
        if RESERVED_MOUNT_PATHS.contains(&mount_path) || generated.contains(&mount_path) {
            errors.push(FieldError::invalid(
                path.clone(),
                mount_path,
                "conflicts with the mount path of one of the internally generated paths",
            ));
        }
        if mount_path.starts_with(CERTS_ROOT) {
            errors.push(FieldError::invalid(
                path,
                mount_path,
                format!("cannot share the same path prefix as the certs root '{CERTS_ROOT}'"),
            ));
        }
    }
}

/// Kerberos needs the realm, the service name and the keytab secret together
fn check_kerberos(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let config = FieldPath::spec().child("communal").child("additionalConfig");
    let parts = [
        (
            config.key(KERBEROS_REALM_CONFIG),
            spec.kerberos_realm(),
            "kerberosRealm must be set if setting up Kerberos",
        ),
        (
            config.key(KERBEROS_SERVICE_NAME_CONFIG),
            spec.kerberos_service_name(),
            "kerberosServiceName must be set if setting up Kerberos",
        ),
        (
            FieldPath::spec().child("kerberosSecret"),
            spec.kerberos_secret.as_str(),
            "kerberosSecret must be set if setting up Kerberos",
        ),
    ];
    let set = parts.iter().filter(|(_, value, _)| !value.is_empty()).count();
    if set == 0 || set == parts.len() {
        return;
    }
    for (path, _, message) in parts.into_iter().filter(|(_, value, _)| value.is_empty()) {
        errors.push(FieldError::required(path, message));
    }
}

fn check_temporary_routing(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let Some(routing) = spec.temporary_subcluster_routing.as_ref() else {
        return;
    };
    let prefix = FieldPath::spec().child("temporarySubclusterRouting");

    let template = &routing.template;
    if !template.name.is_empty() {
        let tp = prefix.child("template");
        if template.is_primary() {
            errors.push(FieldError::invalid(
                tp.child("type"),
                &template.type_,
                "subcluster template must be a secondary subcluster",
            ));
        }
        if template.size == 0 {
            errors.push(FieldError::invalid(
                tp.child("size"),
                template.size,
                "size of subcluster template must be greater than zero",
            ));
        }
        if spec.find_subcluster(&template.name).is_some_and(|sc| !sc.is_transient()) {
            errors.push(FieldError::invalid(
                tp.child("name"),
                &template.name,
                "cannot choose a name of an existing subcluster",
            ));
        }
    }

    for (i, name) in routing.names.iter().enumerate() {
        if spec.find_subcluster(name).is_none() {
            errors.push(FieldError::invalid(
                prefix.child("names").index(i),
                name,
                "name must be an existing subcluster",
            ));
        }
    }

    if !routing.names.is_empty() && spec.requires_transient_subcluster() {
        errors.push(FieldError::invalid(
            prefix,
            &routing.names,
            "cannot use a template and a list of subcluster names at the same time",
        ));
    }
}

fn check_requeue_times(ext: &DatabaseExtensions, errors: &mut FieldErrorList) {
    let times = [
        (REQUEUE_TIME, ext.requeue_time, "requeueTime cannot be negative"),
        (
            UPGRADE_REQUEUE_TIME,
            ext.upgrade_requeue_time,
            "upgradeRequeueTime cannot be negative",
        ),
    ];
    for (key, value, message) in times {
        if value < 0 {
            errors.push(FieldError::invalid(FieldPath::annotation(key), value, message));
        }
    }
}

fn check_encrypt_spread_comm(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let value = &spec.encrypt_spread_comm;
    if !value.is_empty() && value != ENCRYPT_SPREAD_COMM_WITH_VERTICA {
        errors.push(FieldError::not_supported(
            FieldPath::spec().child("encryptSpreadComm"),
            value,
            format!(
                "encryptSpreadComm can either be an empty string or set to {ENCRYPT_SPREAD_COMM_WITH_VERTICA}"
            ),
        ));
    }
}

fn check_local_storage(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let local = &spec.local;
    let prefix = FieldPath::spec().child("local");
    let paths = [
        ("dataPath", local.data_path.as_str()),
        ("depotPath", local.depot_path.as_str()),
        ("catalogPath", local.catalog_path()),
    ];
    for (field, value) in paths {
        if RESTRICTED_LOCAL_PATHS.contains(&value) {
            errors.push(FieldError::invalid(
                prefix.child(field),
                value,
                format!("{field} cannot be set to {value}. This is a restricted path."),
            ));
        }
    }

    if local.is_depot_volume_empty_dir() && !local.is_depot_path_unique() {
        errors.push(FieldError::invalid(
            prefix.child("depotPath"),
            &local.depot_path,
            "depotPath cannot be equal to dataPath or catalogPath when depotVolume is EmptyDir",
        ));
    }
    if !local.is_known_depot_volume_type() {
        errors.push(FieldError::not_supported(
            prefix.child("depotVolume"),
            &local.depot_volume,
            format!(
                "valid values are {DEPOT_VOLUME_EMPTY_DIR}, {DEPOT_VOLUME_PERSISTENT_VOLUME} or an empty string"
            ),
        ));
    }
}

fn check_http_server_mode(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let known = [
        "",
        HTTP_SERVER_MODE_ENABLED,
        HTTP_SERVER_MODE_DISABLED,
        HTTP_SERVER_MODE_AUTO,
    ];
    if !known.contains(&spec.http_server_mode.as_str()) {
        errors.push(FieldError::not_supported(
            FieldPath::spec().child("httpServerMode"),
            &spec.http_server_mode,
            format!(
                "Valid values are: {HTTP_SERVER_MODE_AUTO}, {HTTP_SERVER_MODE_ENABLED}, {HTTP_SERVER_MODE_DISABLED} or an empty string"
            ),
        ));
    }
}

fn check_shard_count(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    if spec.shard_count <= 0 {
        errors.push(FieldError::invalid(
            FieldPath::spec().child("shardCount"),
            spec.shard_count,
            "Shard count must be > 0",
        ));
    }
}

fn check_probe_overrides(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let probes = [
        ("readinessProbeOverride", &spec.readiness_probe_override),
        ("startupProbeOverride", &spec.startup_probe_override),
        ("livenessProbeOverride", &spec.liveness_probe_override),
    ];
    for (field, probe) in probes {
        if probe.as_ref().is_some_and(|p| handler_count(p) > 1) {
            errors.push(FieldError::invalid(
                FieldPath::spec().child(field),
                probe,
                "can only specify one handler in the override",
            ));
        }
    }
}

fn handler_count(probe: &Probe) -> usize {
    [
        probe.exec.is_some(),
        probe.tcp_socket.is_some(),
        probe.grpc.is_some(),
        probe.http_get.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count()
}
