//! Unit tests for the resource schemas
//!
//! Cover wire names, serde defaults and the small helper methods the
//! validators lean on.

#[cfg(test)]
mod schema {
    use serde_json::json;

    use crate::crd::v1::{SubclusterType, VerticaDBSpec};
    use crate::crd::v1beta1;
    use crate::crd::{split_api_version, ResourceKind};

    #[test]
    fn current_spec_fills_serde_defaults() {
        let spec: VerticaDBSpec = serde_json::from_value(json!({
            "communal": {"path": "s3://bucket/db"},
            "subclusters": [{"name": "sc1", "size": 3}]
        }))
        .unwrap();

        assert_eq!(spec.db_name, "vertdb");
        assert_eq!(spec.shard_count, 6);
        assert_eq!(spec.init_policy, "Create");
        assert_eq!(spec.local.data_path, "/data");
        assert_eq!(spec.local.catalog_path(), "/data");
        assert_eq!(spec.subclusters[0].type_, "primary");
        assert_eq!(spec.subclusters[0].service_type, "ClusterIP");
        assert!(spec.temporary_subcluster_routing.is_none());
    }

    #[test]
    fn current_spec_uses_kubernetes_wire_names() {
        let mut spec = VerticaDBSpec::default();
        spec.nma_tls_secret = "nma-tls".into();
        spec.subclusters.push(crate::crd::v1::Subcluster {
            name: "sc1".into(),
            size: 3,
            client_node_port: 30001,
            external_ips: vec!["10.0.0.1".into()],
            load_balancer_ip: "10.0.0.2".into(),
            ..Default::default()
        });
        let v = serde_json::to_value(&spec).unwrap();

        assert_eq!(v["nmaTLSSecret"], "nma-tls");
        assert_eq!(v["subclusters"][0]["type"], "primary");
        assert_eq!(v["subclusters"][0]["clientNodePort"], 30001);
        assert_eq!(v["subclusters"][0]["externalIPs"][0], "10.0.0.1");
        assert_eq!(v["subclusters"][0]["loadBalancerIP"], "10.0.0.2");
    }

    #[test]
    fn legacy_spec_defaults_to_primary_and_k_safety_one() {
        let spec: v1beta1::VerticaDBSpec = serde_json::from_value(json!({
            "subclusters": [{"name": "sc1", "size": 3, "nodePort": 30000}]
        }))
        .unwrap();

        assert_eq!(spec.k_safety, "1");
        assert!(spec.subclusters[0].is_primary);
        assert!(!spec.subclusters[0].is_transient);
        assert_eq!(spec.subclusters[0].node_port, 30000);
    }

    #[test]
    fn subcluster_type_parses_known_roles_only() {
        assert_eq!(SubclusterType::parse("primary"), Some(SubclusterType::Primary));
        assert_eq!(
            SubclusterType::parse("sandboxprimary"),
            Some(SubclusterType::SandboxPrimary)
        );
        assert_eq!(SubclusterType::parse("Primary"), None);
        assert_eq!(SubclusterType::parse(""), None);
    }

    #[test]
    fn service_name_falls_back_to_fqdn_compatible_name() {
        let sc = crate::crd::v1::Subcluster {
            name: "sc_main".into(),
            ..Default::default()
        };
        assert_eq!(sc.service_name(), "sc-main");

        let named = crate::crd::v1::Subcluster {
            name: "sc_main".into(),
            service_name: "front".into(),
            ..Default::default()
        };
        assert_eq!(named.service_name(), "front");
    }

    #[test]
    fn resource_kind_parses_names_and_plurals() {
        assert_eq!(
            "verticadb".parse::<ResourceKind>().unwrap(),
            ResourceKind::VerticaDB
        );
        assert_eq!(
            "verticaautoscalers".parse::<ResourceKind>().unwrap(),
            ResourceKind::VerticaAutoscaler
        );
        assert!("VerticaCluster".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn api_version_splits_group_and_version() {
        assert_eq!(split_api_version("vertica.com/v1"), ("vertica.com", "v1"));
        assert_eq!(split_api_version("v1"), ("", "v1"));
    }

    #[test]
    fn multi_version_crds_serve_both_versions() {
        let crd = ResourceKind::VerticaDB.crd().unwrap();
        let names: Vec<&str> = crd.spec.versions.iter().map(|v| v.name.as_str()).collect();
        assert!(names.contains(&"v1"));
        assert!(names.contains(&"v1beta1"));

        let stored: Vec<&str> = crd
            .spec
            .versions
            .iter()
            .filter(|v| v.storage)
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(stored, vec!["v1"]);

        let et = ResourceKind::EventTrigger.crd().unwrap();
        assert_eq!(et.spec.versions.len(), 1);
        assert_eq!(et.spec.names.kind, "EventTrigger");
    }
}
