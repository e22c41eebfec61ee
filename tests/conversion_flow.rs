//! Whole-object conversion between served versions, and the generated CRDs

use std::sync::Arc;

use serde_json::{json, Value};
use vertica_k8s_admission::admission::{
    AdmissionPipeline, AdmissionRequest, Operation, SchemeRegistry,
};
use vertica_k8s_admission::crd::ResourceKind;

fn pipeline() -> AdmissionPipeline {
    AdmissionPipeline::new(Arc::new(SchemeRegistry::new()))
}

fn legacy_database() -> Value {
    json!({
        "apiVersion": "vertica.com/v1beta1",
        "kind": "VerticaDB",
        "metadata": {"name": "vertdb", "namespace": "default"},
        "spec": {
            "image": "vertica/vertica-k8s:12.0.4",
            "kSafety": "0",
            "requeueTime": 30,
            "communal": {"path": "s3://nimbusdb/db", "endpoint": "https://s3.amazonaws.com"},
            "subclusters": [
                {"name": "main", "size": 1, "isPrimary": true},
                {"name": "analytics", "size": 2, "isPrimary": false}
            ]
        }
    })
}

#[test]
fn legacy_database_converts_and_is_admissible() {
    let converted = pipeline()
        .convert(legacy_database(), "vertica.com/v1")
        .unwrap();

    assert_eq!(converted["apiVersion"], "vertica.com/v1");
    assert_eq!(converted["spec"]["subclusters"][0]["type"], "primary");
    assert_eq!(converted["spec"]["subclusters"][1]["type"], "secondary");
    let annotations = &converted["metadata"]["annotations"];
    assert_eq!(annotations["vertica.com/k-safety"], "0");
    assert_eq!(annotations["vertica.com/requeue-time"], "30");

    let verdict = pipeline()
        .admit(AdmissionRequest {
            kind: ResourceKind::VerticaDB,
            operation: Operation::Create,
            object: Some(converted),
            old_object: None,
        })
        .unwrap();
    assert!(verdict.is_allowed(), "{:?}", verdict.message());
    assert!(verdict.warnings.is_empty(), "{:?}", verdict.warnings);
}

#[test]
fn current_database_cannot_go_back() {
    let current = pipeline()
        .convert(legacy_database(), "vertica.com/v1")
        .unwrap();
    let err = pipeline().convert(current, "vertica.com/v1beta1").unwrap_err();
    assert_eq!(err.reason(), "UnsupportedConversion");
}

#[test]
fn converting_to_the_same_version_is_identity() {
    let object = legacy_database();
    let same = pipeline()
        .convert(object.clone(), "vertica.com/v1beta1")
        .unwrap();
    assert_eq!(same, object);
}

#[test]
fn unknown_kind_is_reported() {
    let object = json!({"apiVersion": "vertica.com/v1", "kind": "VerticaCluster"});
    let err = pipeline().convert(object, "vertica.com/v1beta1").unwrap_err();
    assert_eq!(err.reason(), "UnknownKind");
}

#[test]
fn autoscaler_survives_a_round_trip_through_the_legacy_schema() {
    let current = json!({
        "apiVersion": "vertica.com/v1",
        "kind": "VerticaAutoscaler",
        "metadata": {"name": "vas", "namespace": "default"},
        "spec": {
            "verticaDBName": "vertdb",
            "scalingGranularity": "Pod",
            "serviceName": "sc1",
            "customAutoscaler": {
                "type": "HPA",
                "hpa": {"minReplicas": 3, "maxReplicas": 6}
            }
        }
    });

    let legacy = pipeline()
        .convert(current.clone(), "vertica.com/v1beta1")
        .unwrap();
    assert_eq!(legacy["apiVersion"], "vertica.com/v1beta1");
    assert!(legacy["spec"].get("customAutoscaler").is_none());
    assert_eq!(
        legacy["metadata"]["annotations"]["vertica.com/vas-hpa-max-replicas"],
        "6"
    );

    let back = pipeline().convert(legacy, "vertica.com/v1").unwrap();
    assert_eq!(back["spec"]["customAutoscaler"], current["spec"]["customAutoscaler"]);
    assert_eq!(back["spec"]["serviceName"], "sc1");
}

#[test]
fn single_version_kinds_have_no_converter() {
    let registry = SchemeRegistry::new();
    for kind in [
        ResourceKind::EventTrigger,
        ResourceKind::VerticaRestorePointsQuery,
        ResourceKind::VerticaScrutinize,
        ResourceKind::VerticaReplicator,
    ] {
        assert!(registry.converter(kind).is_none(), "{kind}");
        assert_eq!(
            registry.served_api_versions(kind),
            vec!["vertica.com/v1beta1".to_string()]
        );
    }
}

#[test]
fn every_kind_generates_a_crd() {
    for kind in ResourceKind::ALL {
        let crd = kind.crd().unwrap();
        assert_eq!(crd.spec.group, "vertica.com");
        assert_eq!(crd.spec.names.kind, kind.as_str());
        assert_eq!(crd.spec.names.plural, kind.plural());
    }

    let db = ResourceKind::VerticaDB.crd().unwrap();
    let versions: Vec<&str> = db.spec.versions.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(versions.len(), 2);
    assert!(versions.contains(&"v1") && versions.contains(&"v1beta1"));
    let storage: Vec<&str> = db
        .spec
        .versions
        .iter()
        .filter(|v| v.storage)
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(storage, vec!["v1"]);
}
