//! Cross-field agreement between subclusters
//!
//! Subclusters that share a service name are fronted by one Kubernetes
//! service, so every service-affecting attribute must agree across the group.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{FieldError, FieldErrorList, FieldPath};
use crate::crd::v1::{Subcluster, VerticaDBSpec};

/// The attributes compared inside a service group
const SERVICE_ATTRIBUTES: [&str; 6] = [
    "serviceType",
    "clientNodePort",
    "verticaHTTPNodePort",
    "externalIPs",
    "loadBalancerIP",
    "serviceAnnotations",
];

fn service_attribute(sc: &Subcluster, attribute: &str) -> Value {
    match attribute {
        "serviceType" => Value::from(sc.service_type.as_str()),
        "clientNodePort" => Value::from(sc.client_node_port),
        "verticaHTTPNodePort" => Value::from(sc.vertica_http_node_port),
        "externalIPs" => Value::from(sc.external_ips.clone()),
        "loadBalancerIP" => Value::from(sc.load_balancer_ip.as_str()),
        "serviceAnnotations" => Value::Object(
            sc.service_annotations
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect(),
        ),
        _ => Value::Null,
    }
}

/// Checks service groups and transient subclusters against the routing
/// template
pub fn check_database_consistency(spec: &VerticaDBSpec) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    check_service_groups(spec, &mut errors);
    check_transient_matches_template(spec, &mut errors);
    errors
}

/// For each group, the first member is the reference. Only the first member
/// that disagrees on a given attribute is reported.
fn check_service_groups(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, sc) in spec.subclusters.iter().enumerate() {
        groups.entry(sc.service_name()).or_default().push(i);
    }

    let mut group_list: Vec<(&String, &Vec<usize>)> = groups.iter().collect();
    group_list.sort_by_key(|(_, members)| members[0]);

    for (service, members) in group_list {
        let Some((&first, rest)) = members.split_first() else {
            continue;
        };
        let reference = &spec.subclusters[first];
        for attribute in SERVICE_ATTRIBUTES {
            let expected = service_attribute(reference, attribute);
            let mismatch = rest
                .iter()
                .find(|&&j| service_attribute(&spec.subclusters[j], attribute) != expected);
            if let Some(&j) = mismatch {
                errors.push(FieldError::invalid(
                    FieldPath::spec().child("subclusters").index(j).child(attribute),
                    service_attribute(&spec.subclusters[j], attribute),
                    format!(
                        "{attribute} doesn't match subcluster[{first}] which shares the serviceName {service:?}"
                    ),
                ));
            }
        }
    }
}

fn check_transient_matches_template(spec: &VerticaDBSpec, errors: &mut FieldErrorList) {
    let template_name = spec
        .temporary_subcluster_routing
        .as_ref()
        .map(|r| r.template.name.as_str())
        .unwrap_or_default();
    for (i, sc) in spec.subclusters.iter().enumerate() {
        if sc.is_transient() && sc.name != template_name {
            errors.push(FieldError::invalid(
                FieldPath::spec().child("subclusters").index(i).child("name"),
                &sc.name,
                "transient subcluster name doesn't match the temporarySubclusterRouting template",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::v1::SubclusterSelection;

    fn sc(name: &str, service: &str) -> Subcluster {
        Subcluster {
            name: name.into(),
            size: 1,
            service_name: service.into(),
            ..Default::default()
        }
    }

    #[test]
    fn differing_load_balancer_ip_is_rejected_until_equalized() {
        let mut spec = VerticaDBSpec {
            subclusters: vec![sc("a", "shared"), sc("b", "shared")],
            ..Default::default()
        };
        spec.subclusters[0].load_balancer_ip = "10.0.0.1".into();
        spec.subclusters[1].load_balancer_ip = "10.0.0.2".into();

        let errors = check_database_consistency(&spec);
        assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        assert_eq!(err.path.as_str(), "spec.subclusters[1].loadBalancerIP");
        assert!(err.message.contains("subcluster[0]"));

        spec.subclusters[1].load_balancer_ip = "10.0.0.1".into();
        assert!(check_database_consistency(&spec).is_empty());
    }

    #[test]
    fn only_first_mismatch_per_attribute_is_reported() {
        let mut spec = VerticaDBSpec {
            subclusters: vec![sc("a", "s"), sc("b", "s"), sc("c", "s")],
            ..Default::default()
        };
        spec.subclusters[1].service_type = "NodePort".into();
        spec.subclusters[2].service_type = "LoadBalancer".into();
        spec.subclusters[2].external_ips = vec!["1.2.3.4".into()];

        let errors = check_database_consistency(&spec);
        assert_eq!(errors.len(), 2, "{errors}");
        assert!(errors.has_path("spec.subclusters[1].serviceType"));
        assert!(errors.has_path("spec.subclusters[2].externalIPs"));
    }

    #[test]
    fn every_group_is_checked() {
        let mut spec = VerticaDBSpec {
            subclusters: vec![sc("a", "x"), sc("b", "y"), sc("c", "x"), sc("d", "y")],
            ..Default::default()
        };
        spec.subclusters[2].client_node_port = 30001;
        spec.subclusters[3].service_annotations.insert("k".into(), "v".into());

        let errors = check_database_consistency(&spec);
        assert!(errors.has_path("spec.subclusters[2].clientNodePort"));
        assert!(errors.has_path("spec.subclusters[3].serviceAnnotations"));
    }

    #[test]
    fn service_annotations_are_compared_by_content() {
        let mut spec = VerticaDBSpec {
            subclusters: vec![sc("a", "s"), sc("b", "s")],
            ..Default::default()
        };
        spec.subclusters[0].service_annotations.insert("lb".into(), "internal".into());
        spec.subclusters[1].service_annotations.insert("lb".into(), "external".into());
        let errors = check_database_consistency(&spec);
        assert_eq!(errors.len(), 1, "{errors}");
        assert!(errors.has_path("spec.subclusters[1].serviceAnnotations"));

        spec.subclusters[1].service_annotations.insert("lb".into(), "internal".into());
        assert!(check_database_consistency(&spec).is_empty());
    }

    #[test]
    fn distinct_services_may_differ() {
        let mut spec = VerticaDBSpec {
            subclusters: vec![sc("a", ""), sc("b", "")],
            ..Default::default()
        };
        // Empty service names fall back to each subcluster's own name
        spec.subclusters[1].service_type = "NodePort".into();
        assert!(check_database_consistency(&spec).is_empty());
    }

    #[test]
    fn transient_subcluster_must_be_the_template() {
        let mut spec = VerticaDBSpec {
            subclusters: vec![sc("main", ""), Subcluster {
                type_: "transient".into(),
                ..sc("tmp", "")
            }],
            ..Default::default()
        };
        assert!(check_database_consistency(&spec).has_path("spec.subclusters[1].name"));

        spec.temporary_subcluster_routing = Some(SubclusterSelection {
            names: vec![],
            template: Subcluster {
                name: "tmp".into(),
                size: 1,
                type_: "transient".into(),
                ..Default::default()
            },
        });
        assert!(check_database_consistency(&spec).is_empty());
    }
}
