//! Defaulting applied before validation
//!
//! Every function here only fills gaps and never fails. Applying a function
//! twice gives the same result as applying it once.

use tracing::debug;

use crate::crd::v1::database::{
    DEFAULT_GCLOUD_ENDPOINT, DEFAULT_GCLOUD_REGION, DEFAULT_S3_REGION,
};
use crate::crd::v1::{SubclusterType, VerticaAutoscalerSpec, VerticaDBSpec};

pub const PULL_POLICY_ALWAYS: &str = "Always";
const LATEST_TAG_SUFFIX: &str = ":latest";

pub fn default_database(spec: &mut VerticaDBSpec) {
    if spec.image.ends_with(LATEST_TAG_SUFFIX) {
        spec.image_pull_policy = PULL_POLICY_ALWAYS.to_string();
    }

    if spec.communal.region.is_empty() {
        if spec.is_s3() {
            spec.communal.region = DEFAULT_S3_REGION.to_string();
        } else if spec.is_gcloud() {
            spec.communal.region = DEFAULT_GCLOUD_REGION.to_string();
        }
    }
    if spec.communal.endpoint.is_empty() && spec.is_gcloud() {
        spec.communal.endpoint = DEFAULT_GCLOUD_ENDPOINT.to_string();
    }

    // The routing template can only ever describe a transient subcluster
    if let Some(routing) = spec.temporary_subcluster_routing.as_mut() {
        routing.template.type_ = SubclusterType::Transient.as_str().to_string();
    }

    for sc in spec.subclusters.iter_mut() {
        if sc.service_name.is_empty() {
            sc.service_name = sc.fqdn_compatible_name();
        }
    }
    debug!(db = %spec.db_name, "Applied VerticaDB defaults");
}

pub fn default_autoscaler(spec: &mut VerticaAutoscalerSpec) {
    if spec.template.type_.is_empty() {
        spec.template.type_ = spec.template.effective_type().to_string();
        // An empty role has no effective type of its own
        if spec.template.type_.is_empty() {
            spec.template.type_ = SubclusterType::Secondary.as_str().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::v1::{Subcluster, SubclusterSelection};
    use proptest::prelude::*;

    #[test]
    fn latest_tag_forces_always_pull() {
        let mut spec = VerticaDBSpec {
            image: "opentext/vertica-k8s:latest".into(),
            ..Default::default()
        };
        default_database(&mut spec);
        assert_eq!(spec.image_pull_policy, "Always");

        let mut pinned = VerticaDBSpec::default();
        default_database(&mut pinned);
        assert_eq!(pinned.image_pull_policy, "IfNotPresent");
    }

    #[test]
    fn region_and_endpoint_follow_path_scheme() {
        let mut s3 = VerticaDBSpec::default();
        s3.communal.path = "s3://bucket/db".into();
        default_database(&mut s3);
        assert_eq!(s3.communal.region, "us-east-1");
        assert!(s3.communal.endpoint.is_empty());

        let mut gs = VerticaDBSpec::default();
        gs.communal.path = "gs://bucket/db".into();
        default_database(&mut gs);
        assert_eq!(gs.communal.region, "US-EAST1");
        assert_eq!(gs.communal.endpoint, "https://storage.googleapis.com");

        let mut kept = VerticaDBSpec::default();
        kept.communal.path = "s3://bucket/db".into();
        kept.communal.region = "eu-west-1".into();
        default_database(&mut kept);
        assert_eq!(kept.communal.region, "eu-west-1");
    }

    #[test]
    fn routing_template_is_forced_transient() {
        let mut spec = VerticaDBSpec {
            temporary_subcluster_routing: Some(SubclusterSelection {
                names: vec![],
                template: Subcluster {
                    name: "tmp".into(),
                    size: 1,
                    type_: "primary".into(),
                    ..Default::default()
                },
            }),
            ..Default::default()
        };
        default_database(&mut spec);
        let routing = spec.temporary_subcluster_routing.unwrap();
        assert_eq!(routing.template.type_, "transient");
    }

    #[test]
    fn service_name_defaults_to_fqdn_name() {
        let mut spec = VerticaDBSpec {
            subclusters: vec![Subcluster {
                name: "sc_1".into(),
                size: 3,
                ..Default::default()
            }],
            ..Default::default()
        };
        default_database(&mut spec);
        assert_eq!(spec.subclusters[0].service_name, "sc-1");
    }

    #[test]
    fn autoscaler_template_type_is_filled() {
        let mut spec = VerticaAutoscalerSpec::default();
        spec.template.type_ = String::new();
        default_autoscaler(&mut spec);
        assert_eq!(spec.template.type_, "secondary");

        let mut kept = VerticaAutoscalerSpec::default();
        kept.template.type_ = "primary".into();
        default_autoscaler(&mut kept);
        assert_eq!(kept.template.type_, "primary");
    }

    fn arb_spec() -> impl Strategy<Value = VerticaDBSpec> {
        (
            prop_oneof![Just("img:latest"), Just("img:24.1.0"), Just("")],
            prop_oneof![Just("s3://b/p"), Just("gs://b/p"), Just("azb://a/b"), Just("")],
            prop_oneof![Just(""), Just("r1")],
            prop::collection::vec(("[a-z_]{1,6}", "[a-z]{0,4}"), 0..4),
            any::<bool>(),
        )
            .prop_map(|(image, path, region, scs, routing)| {
                let mut spec = VerticaDBSpec {
                    image: image.to_string(),
                    ..Default::default()
                };
                spec.communal.path = path.to_string();
                spec.communal.region = region.to_string();
                spec.subclusters = scs
                    .into_iter()
                    .map(|(name, service_name)| Subcluster {
                        name,
                        service_name,
                        ..Default::default()
                    })
                    .collect();
                if routing {
                    spec.temporary_subcluster_routing = Some(SubclusterSelection::default());
                }
                spec
            })
    }

    proptest! {
        #[test]
        fn database_defaulting_is_idempotent(spec in arb_spec()) {
            let mut once = spec;
            default_database(&mut once);
            let mut twice = once.clone();
            default_database(&mut twice);
            prop_assert_eq!(once, twice);
        }
    }
}
