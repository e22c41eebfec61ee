//! VerticaDB conversion
//!
//! Only legacy to current is implemented. Current objects cannot be written
//! back in the legacy shape.

use serde_json::Value;

use super::{convert_value, Converter, VersionConverter};
use crate::annotations::{DatabaseExtensions, API_CONVERSION};
use crate::crd::v1::database::{KERBEROS_REALM_CONFIG, KERBEROS_SERVICE_NAME_CONFIG};
use crate::crd::{v1, v1beta1, ResourceKind};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct DatabaseConverter;

impl Converter<v1beta1::VerticaDB, v1::VerticaDB> for DatabaseConverter {
    fn to_current(&self, legacy: &v1beta1::VerticaDB) -> v1::VerticaDB {
        let mut metadata = legacy.metadata.clone();
        let annotations = metadata.annotations.get_or_insert_with(Default::default);
        annotations
            .entry(API_CONVERSION.to_string())
            .or_insert_with(|| v1beta1::VERSION.to_string());
        extensions_of(&legacy.spec).encode_into(annotations);

        v1::VerticaDB {
            metadata,
            spec: spec_to_current(&legacy.spec),
            status: legacy.status.clone(),
        }
    }

    fn to_legacy(&self, _current: &v1::VerticaDB) -> Result<v1beta1::VerticaDB> {
        Err(Error::unsupported_conversion(
            ResourceKind::VerticaDB.as_str(),
            v1::API_VERSION,
            v1beta1::API_VERSION,
        ))
    }
}

impl VersionConverter for DatabaseConverter {
    fn kind(&self) -> ResourceKind {
        ResourceKind::VerticaDB
    }

    fn convert(&self, object: Value, desired_api_version: &str) -> Result<Value> {
        convert_value::<v1beta1::VerticaDB, v1::VerticaDB, _>(
            self,
            ResourceKind::VerticaDB,
            v1beta1::VERSION,
            v1::VERSION,
            object,
            desired_api_version,
        )
    }
}

/// Legacy fields that move to annotations
fn extensions_of(spec: &v1beta1::VerticaDBSpec) -> DatabaseExtensions {
    DatabaseExtensions {
        k_safety: spec.k_safety.clone(),
        requeue_time: spec.requeue_time,
        upgrade_requeue_time: spec.upgrade_requeue_time,
        restart_timeout: spec.restart_timeout,
        ignore_cluster_lease: spec.ignore_cluster_lease,
        ignore_upgrade_path: spec.ignore_upgrade_path,
        include_uid_in_path: spec.communal.include_uid_in_path,
        ssh_secret: spec.ssh_secret.clone(),
    }
}

fn spec_to_current(src: &v1beta1::VerticaDBSpec) -> v1::VerticaDBSpec {
    v1::VerticaDBSpec {
        image_pull_policy: src.image_pull_policy.clone(),
        image_pull_secrets: src.image_pull_secrets.clone(),
        image: src.image.clone(),
        labels: src.labels.clone(),
        annotations: src.annotations.clone(),
        auto_restart_vertica: src.auto_restart_vertica,
        db_name: src.db_name.clone(),
        shard_count: src.shard_count,
        password_secret: src.superuser_password_secret.clone(),
        license_secret: src.license_secret.clone(),
        init_policy: src.init_policy.clone(),
        restore_point: src.restore_point.clone(),
        upgrade_policy: src.upgrade_policy.clone(),
        revive_order: src.revive_order.clone(),
        communal: communal_to_current(&src.communal),
        local: src.local.clone(),
        subclusters: src.subclusters.iter().map(subcluster_to_current).collect(),
        hadoop_config: src.communal.hadoop_config.clone(),
        temporary_subcluster_routing: routing_to_current(&src.temporary_subcluster_routing),
        sidecars: src.sidecars.clone(),
        volumes: src.volumes.clone(),
        volume_mounts: src.volume_mounts.clone(),
        cert_secrets: src.cert_secrets.clone(),
        kerberos_secret: src.kerberos_secret.clone(),
        encrypt_spread_comm: src.encrypt_spread_comm.clone(),
        security_context: src.security_context.clone(),
        pod_security_context: src.pod_security_context.clone(),
        nma_tls_secret: src.http_server_tls_secret.clone(),
        readiness_probe_override: src.readiness_probe_override.clone(),
        liveness_probe_override: src.liveness_probe_override.clone(),
        startup_probe_override: src.startup_probe_override.clone(),
        service_account_name: src.service_account_name.clone(),
        http_server_mode: src.http_server_mode.clone(),
    }
}

/// Kerberos settings become server config parameters
fn communal_to_current(src: &v1beta1::CommunalStorage) -> v1::CommunalStorage {
    let mut additional_config = src.additional_config.clone();
    if !src.kerberos_realm.is_empty() {
        additional_config.insert(KERBEROS_REALM_CONFIG.to_string(), src.kerberos_realm.clone());
    }
    if !src.kerberos_service_name.is_empty() {
        additional_config.insert(
            KERBEROS_SERVICE_NAME_CONFIG.to_string(),
            src.kerberos_service_name.clone(),
        );
    }
    v1::CommunalStorage {
        path: src.path.clone(),
        endpoint: src.endpoint.clone(),
        credential_secret: src.credential_secret.clone(),
        ca_file: src.ca_file.clone(),
        region: src.region.clone(),
        s3_server_side_encryption: src.s3_server_side_encryption.clone(),
        s3_sse_customer_key_secret: src.s3_sse_customer_key_secret.clone(),
        additional_config,
    }
}

/// An all-empty legacy routing block means "not set"
fn routing_to_current(src: &v1beta1::SubclusterSelection) -> Option<v1::SubclusterSelection> {
    let template_set = !src.template.name.is_empty() || src.template.size > 0;
    if src.names.is_empty() && !template_set {
        return None;
    }
    Some(v1::SubclusterSelection {
        names: src.names.clone(),
        template: subcluster_to_current(&src.template),
    })
}

pub(crate) fn subcluster_to_current(src: &v1beta1::Subcluster) -> v1::Subcluster {
    v1::Subcluster {
        name: src.name.clone(),
        size: src.size,
        type_: legacy_role(src).as_str().to_string(),
        image_override: src.image_override.clone(),
        node_selector: src.node_selector.clone(),
        affinity: src.affinity.clone(),
        priority_class_name: src.priority_class_name.clone(),
        tolerations: src.tolerations.clone(),
        resources: src.resources.clone(),
        service_type: src.service_type.clone(),
        service_name: src.service_name.clone(),
        client_node_port: src.node_port,
        vertica_http_node_port: src.vertica_http_node_port,
        external_ips: src.external_ips.clone(),
        load_balancer_ip: src.load_balancer_ip.clone(),
        service_annotations: src.service_annotations.clone(),
        annotations: src.annotations.clone(),
    }
}

/// Collapses the three legacy flags into one role.
///
/// Four flag sets have no exact current form and do not survive a round
/// trip: `isPrimary + isTransient` becomes a plain primary, while
/// `isSandboxPrimary` without `isPrimary` (alone, with `isTransient`, or
/// with all three flags set) comes back as `isPrimary + isSandboxPrimary`.
fn legacy_role(src: &v1beta1::Subcluster) -> v1::SubclusterType {
    if src.is_sandbox_primary {
        v1::SubclusterType::SandboxPrimary
    } else if src.is_primary {
        v1::SubclusterType::Primary
    } else if src.is_transient {
        v1::SubclusterType::Transient
    } else {
        v1::SubclusterType::Secondary
    }
}

/// Inverse of [`legacy_role`]. An empty or unknown role maps to secondary.
pub(crate) fn subcluster_to_legacy(src: &v1::Subcluster) -> v1beta1::Subcluster {
    let role = src.role().unwrap_or(v1::SubclusterType::Secondary);
    v1beta1::Subcluster {
        name: src.name.clone(),
        size: src.size,
        is_primary: matches!(
            role,
            v1::SubclusterType::Primary | v1::SubclusterType::SandboxPrimary
        ),
        is_transient: role == v1::SubclusterType::Transient,
        is_sandbox_primary: role == v1::SubclusterType::SandboxPrimary,
        image_override: src.image_override.clone(),
        node_selector: src.node_selector.clone(),
        affinity: src.affinity.clone(),
        priority_class_name: src.priority_class_name.clone(),
        tolerations: src.tolerations.clone(),
        resources: src.resources.clone(),
        service_type: src.service_type.clone(),
        service_name: src.service_name.clone(),
        node_port: src.client_node_port,
        vertica_http_node_port: src.vertica_http_node_port,
        external_ips: src.external_ips.clone(),
        load_balancer_ip: src.load_balancer_ip.clone(),
        service_annotations: src.service_annotations.clone(),
        annotations: src.annotations.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{self, K_SAFETY, REQUEUE_TIME, SSH_SECRET};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    fn legacy_db() -> v1beta1::VerticaDB {
        let mut spec = v1beta1::VerticaDBSpec {
            superuser_password_secret: "su-pw".into(),
            http_server_tls_secret: "http-tls".into(),
            k_safety: "0".into(),
            requeue_time: 15,
            ssh_secret: "ssh-keys".into(),
            ..Default::default()
        };
        spec.communal.path = "hdfs://nn:8020/db".into();
        spec.communal.include_uid_in_path = true;
        spec.communal.hadoop_config = "hadoop-cm".into();
        spec.communal.kerberos_realm = "EXAMPLE.COM".into();
        spec.communal.kerberos_service_name = "vertica".into();
        spec.subclusters = vec![
            v1beta1::Subcluster {
                name: "main".into(),
                size: 3,
                node_port: 30001,
                ..Default::default()
            },
            v1beta1::Subcluster {
                name: "analytics".into(),
                size: 2,
                is_primary: false,
                ..Default::default()
            },
        ];
        let mut db = v1beta1::VerticaDB::new("vertdb", spec);
        db.metadata.namespace = Some("default".into());
        db
    }

    #[test]
    fn legacy_fields_move_to_annotations_and_renamed_slots() {
        let current = DatabaseConverter.to_current(&legacy_db());
        let ann = current.metadata.annotations.clone().unwrap_or_default();

        assert_eq!(ann.get(K_SAFETY).map(String::as_str), Some("0"));
        assert_eq!(ann.get(REQUEUE_TIME).map(String::as_str), Some("15"));
        assert_eq!(ann.get(SSH_SECRET).map(String::as_str), Some("ssh-keys"));
        assert_eq!(
            ann.get(annotations::INCLUDE_UID_IN_PATH).map(String::as_str),
            Some("true")
        );
        assert_eq!(ann.get(API_CONVERSION).map(String::as_str), Some("v1beta1"));

        assert_eq!(current.spec.password_secret, "su-pw");
        assert_eq!(current.spec.nma_tls_secret, "http-tls");
        assert_eq!(current.spec.hadoop_config, "hadoop-cm");
        assert_eq!(current.spec.kerberos_realm(), "EXAMPLE.COM");
        assert_eq!(current.spec.kerberos_service_name(), "vertica");
        assert!(current.spec.temporary_subcluster_routing.is_none());
    }

    #[test]
    fn subcluster_flags_collapse_to_role() {
        let current = DatabaseConverter.to_current(&legacy_db());
        assert_eq!(current.spec.subclusters[0].type_, "primary");
        assert_eq!(current.spec.subclusters[0].client_node_port, 30001);
        assert_eq!(current.spec.subclusters[1].type_, "secondary");
    }

    #[test]
    fn role_mapping_round_trips_for_every_role() {
        for role in v1::SubclusterType::ALL {
            let sc = v1::Subcluster {
                name: "sc".into(),
                type_: role.as_str().into(),
                ..Default::default()
            };
            let back = subcluster_to_current(&subcluster_to_legacy(&sc));
            assert_eq!(back.type_, role.as_str());
        }
    }

    #[test]
    fn existing_api_conversion_annotation_is_kept() {
        let mut db = legacy_db();
        db.metadata = ObjectMeta {
            annotations: Some([(API_CONVERSION.to_string(), "v1alpha9".to_string())].into()),
            ..db.metadata
        };
        let current = DatabaseConverter.to_current(&db);
        let ann = current.metadata.annotations.unwrap_or_default();
        assert_eq!(ann.get(API_CONVERSION).map(String::as_str), Some("v1alpha9"));
    }

    #[test]
    fn routing_with_template_is_carried() {
        let mut db = legacy_db();
        db.spec.temporary_subcluster_routing.template = v1beta1::Subcluster {
            name: "transient".into(),
            size: 1,
            is_primary: false,
            is_transient: true,
            ..Default::default()
        };
        let current = DatabaseConverter.to_current(&db);
        let routing = current.spec.temporary_subcluster_routing.unwrap();
        assert_eq!(routing.template.type_, "transient");
        assert_eq!(routing.template.size, 1);
    }

    #[test]
    fn current_to_legacy_is_refused() {
        let current = DatabaseConverter.to_current(&legacy_db());
        let err = DatabaseConverter.to_legacy(&current).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConversion { .. }));
        assert_eq!(err.reason(), "UnsupportedConversion");
    }

    #[test]
    fn json_conversion_sets_api_version() {
        let object = serde_json::to_value(legacy_db()).unwrap();
        assert_eq!(object["apiVersion"], "vertica.com/v1beta1");

        let converted = DatabaseConverter
            .convert(object, "vertica.com/v1")
            .unwrap();
        assert_eq!(converted["apiVersion"], "vertica.com/v1");
        assert_eq!(converted["kind"], "VerticaDB");
        assert_eq!(converted["spec"]["passwordSecret"], "su-pw");

        let err = DatabaseConverter
            .convert(converted, "vertica.com/v1beta1")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedConversion { .. }));
    }

    #[test]
    fn foreign_group_is_rejected() {
        let err = DatabaseConverter
            .convert(json!({"apiVersion": "example.com/v1", "kind": "VerticaDB"}), "vertica.com/v1")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownVersion { .. }));
    }

    #[test]
    fn ambiguous_flag_sets_collapse_to_one_role() {
        // (isPrimary, isTransient, isSandboxPrimary) -> role -> flags on the way back
        let cases = [
            ((true, true, false), "primary", (true, false, false)),
            ((false, false, true), "sandboxprimary", (true, false, true)),
            ((false, true, true), "sandboxprimary", (true, false, true)),
            ((true, true, true), "sandboxprimary", (true, false, true)),
        ];
        for ((p, t, s), role, back) in cases {
            let legacy = v1beta1::Subcluster {
                name: "sc".into(),
                size: 3,
                is_primary: p,
                is_transient: t,
                is_sandbox_primary: s,
                ..Default::default()
            };
            let current = subcluster_to_current(&legacy);
            assert_eq!(current.type_, role, "flags {:?}", (p, t, s));

            let again = subcluster_to_legacy(&current);
            assert_eq!(
                (again.is_primary, again.is_transient, again.is_sandbox_primary),
                back,
                "flags {:?}",
                (p, t, s)
            );
        }
    }
}
