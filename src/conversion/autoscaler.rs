//! VerticaAutoscaler conversion
//!
//! Bidirectional. The current-only `customAutoscaler` block rides along in
//! `vas-*` annotations on legacy objects and is folded back on the way up.
//! The template role maps through the same flag collapse as VerticaDB
//! subclusters; an empty role comes back as `secondary`.

use serde_json::Value;

use super::database::{subcluster_to_current, subcluster_to_legacy};
use super::{convert_value, Converter, VersionConverter};
use crate::annotations::{AutoscalerExtensions, Decoded};
use crate::crd::{v1, v1beta1, ResourceKind};
use crate::error::Result;

#[derive(Clone, Copy, Debug, Default)]
pub struct AutoscalerConverter;

impl AutoscalerConverter {
    /// Legacy to current, also reporting annotation values that had to be
    /// replaced by defaults
    pub fn to_current_decoded(&self, legacy: &v1beta1::VerticaAutoscaler) -> Decoded<v1::VerticaAutoscaler> {
        let mut metadata = legacy.metadata.clone();
        let decoded = metadata
            .annotations
            .as_ref()
            .map(AutoscalerExtensions::decode)
            .unwrap_or_else(|| Decoded {
                value: AutoscalerExtensions::default(),
                recovered: Vec::new(),
            });
        if let Some(annotations) = metadata.annotations.as_mut() {
            AutoscalerExtensions::clear(annotations);
        }

        let src = &legacy.spec;
        let current = v1::VerticaAutoscaler {
            metadata,
            spec: v1::VerticaAutoscalerSpec {
                vertica_db_name: src.vertica_db_name.clone(),
                scaling_granularity: src.scaling_granularity.clone(),
                service_name: src.service_name.clone(),
                template: subcluster_to_current(&src.template),
                target_size: src.target_size,
                custom_autoscaler: decoded.value.custom_autoscaler,
            },
            status: legacy.status.clone(),
        };
        Decoded {
            value: current,
            recovered: decoded.recovered,
        }
    }
}

impl Converter<v1beta1::VerticaAutoscaler, v1::VerticaAutoscaler> for AutoscalerConverter {
    fn to_current(&self, legacy: &v1beta1::VerticaAutoscaler) -> v1::VerticaAutoscaler {
        self.to_current_decoded(legacy).value
    }

    fn to_legacy(&self, current: &v1::VerticaAutoscaler) -> Result<v1beta1::VerticaAutoscaler> {
        let mut metadata = current.metadata.clone();
        let ext = AutoscalerExtensions {
            custom_autoscaler: current.spec.custom_autoscaler.clone(),
        };
        match metadata.annotations.as_mut() {
            Some(annotations) => ext.encode_into(annotations),
            None if ext.custom_autoscaler.is_some() => {
                let mut annotations = Default::default();
                ext.encode_into(&mut annotations);
                metadata.annotations = Some(annotations);
            }
            None => {}
        }

        let src = &current.spec;
        Ok(v1beta1::VerticaAutoscaler {
            metadata,
            spec: v1beta1::VerticaAutoscalerSpec {
                vertica_db_name: src.vertica_db_name.clone(),
                scaling_granularity: src.scaling_granularity.clone(),
                service_name: src.service_name.clone(),
                template: subcluster_to_legacy(&src.template),
                target_size: src.target_size,
            },
            status: current.status.clone(),
        })
    }
}

impl VersionConverter for AutoscalerConverter {
    fn kind(&self) -> ResourceKind {
        ResourceKind::VerticaAutoscaler
    }

    fn convert(&self, object: Value, desired_api_version: &str) -> Result<Value> {
        convert_value::<v1beta1::VerticaAutoscaler, v1::VerticaAutoscaler, _>(
            self,
            ResourceKind::VerticaAutoscaler,
            v1beta1::VERSION,
            v1::VERSION,
            object,
            desired_api_version,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{VAS_CUSTOM_AUTOSCALER_TYPE, VAS_HPA_MAX_REPLICAS, VAS_HPA_METRICS};
    use crate::crd::v1::{CustomAutoscalerSpec, HPASpec, MetricDefinition};
    use k8s_openapi::api::autoscaling::v2::{MetricSpec, MetricTarget, ResourceMetricSource};
    use proptest::prelude::*;

    fn current_vas() -> v1::VerticaAutoscaler {
        let mut vas = v1::VerticaAutoscaler::new(
            "vertica-vas-sample",
            v1::VerticaAutoscalerSpec {
                vertica_db_name: "vertdb".into(),
                scaling_granularity: "Pod".into(),
                service_name: "sc1".into(),
                ..Default::default()
            },
        );
        vas.spec.custom_autoscaler = Some(CustomAutoscalerSpec {
            type_: "HPA".into(),
            hpa: Some(HPASpec {
                min_replicas: Some(3),
                max_replicas: 6,
                metrics: vec![MetricDefinition {
                    metric: MetricSpec {
                        type_: "Resource".into(),
                        resource: Some(ResourceMetricSource {
                            name: "cpu".into(),
                            target: MetricTarget {
                                type_: "Utilization".into(),
                                average_utilization: Some(80),
                                ..Default::default()
                            },
                        }),
                        ..Default::default()
                    },
                    scale_in_threshold: None,
                }],
                behavior: None,
            }),
            scaled_object: None,
        });
        vas
    }

    #[test]
    fn custom_autoscaler_is_smuggled_through_annotations() {
        let legacy = AutoscalerConverter.to_legacy(&current_vas()).unwrap();
        let ann = legacy.metadata.annotations.clone().unwrap_or_default();
        assert_eq!(ann.get(VAS_CUSTOM_AUTOSCALER_TYPE).map(String::as_str), Some("HPA"));
        assert_eq!(ann.get(VAS_HPA_MAX_REPLICAS).map(String::as_str), Some("6"));
        assert!(ann.contains_key(VAS_HPA_METRICS));

        let back = AutoscalerConverter.to_current(&legacy);
        assert_eq!(back.spec.custom_autoscaler, current_vas().spec.custom_autoscaler);
        let back_ann = back.metadata.annotations.unwrap_or_default();
        assert!(!back_ann.keys().any(|k| k.starts_with("vertica.com/vas-")));
    }

    #[test]
    fn bad_annotation_is_recovered_not_fatal() {
        let mut legacy = AutoscalerConverter.to_legacy(&current_vas()).unwrap();
        if let Some(a) = legacy.metadata.annotations.as_mut() {
            a.insert(VAS_HPA_MAX_REPLICAS.into(), "six".into());
        }
        let decoded = AutoscalerConverter.to_current_decoded(&legacy);
        assert_eq!(decoded.recovered.len(), 1);
        let hpa = decoded.value.spec.custom_autoscaler.and_then(|c| c.hpa).unwrap();
        assert_eq!(hpa.max_replicas, 0);
    }

    #[test]
    fn empty_template_role_comes_back_as_secondary() {
        let mut vas = current_vas();
        vas.spec.template.type_ = String::new();
        let legacy = AutoscalerConverter.to_legacy(&vas).unwrap();
        assert!(!legacy.spec.template.is_primary);
        let back = AutoscalerConverter.to_current(&legacy);
        assert_eq!(back.spec.template.type_, "secondary");
    }

    #[test]
    fn json_conversion_goes_both_ways() {
        let object = serde_json::to_value(current_vas()).unwrap();
        let legacy = AutoscalerConverter.convert(object.clone(), "vertica.com/v1beta1").unwrap();
        assert_eq!(legacy["apiVersion"], "vertica.com/v1beta1");
        assert!(legacy["spec"].get("customAutoscaler").is_none());

        let current = AutoscalerConverter.convert(legacy, "vertica.com/v1").unwrap();
        assert_eq!(current["spec"]["customAutoscaler"], object["spec"]["customAutoscaler"]);
    }

    fn legacy_template() -> impl Strategy<Value = v1beta1::Subcluster> {
        // The collapsing flag sets are covered by the database converter tests
        (
            "[a-z][a-z0-9]{0,8}",
            0..10i32,
            prop_oneof![
                Just((true, false, false)),
                Just((false, false, false)),
                Just((false, true, false)),
                Just((true, false, true)),
            ],
            "[a-z]{0,6}",
            prop_oneof![Just("ClusterIP"), Just("NodePort"), Just("LoadBalancer")],
            0..40000i32,
        )
            .prop_map(|(name, size, (p, t, s), svc, svc_type, port)| v1beta1::Subcluster {
                name,
                size,
                is_primary: p,
                is_transient: t,
                is_sandbox_primary: s,
                service_name: svc,
                service_type: svc_type.to_string(),
                node_port: port,
                ..Default::default()
            })
    }

    fn custom_block() -> impl Strategy<Value = Option<CustomAutoscalerSpec>> {
        prop_oneof![
            Just(None),
            (prop::option::of(0..5i32), 0..20i32).prop_map(|(min, max)| Some(CustomAutoscalerSpec {
                type_: "HPA".into(),
                hpa: Some(HPASpec {
                    min_replicas: min,
                    max_replicas: max,
                    ..Default::default()
                }),
                scaled_object: None,
            })),
            (prop::option::of(0..5i32), prop::option::of(30..120i32)).prop_map(|(min, poll)| {
                Some(CustomAutoscalerSpec {
                    type_: "ScaledObject".into(),
                    hpa: None,
                    scaled_object: Some(v1::ScaledObjectSpec {
                        min_replicas: min,
                        polling_interval: poll,
                        ..Default::default()
                    }),
                })
            }),
        ]
    }

    proptest! {
        #[test]
        fn legacy_round_trip_is_lossless(
            db in "[a-z]{1,10}",
            granularity in prop_oneof![Just("Pod"), Just("Subcluster")],
            service in "[a-z]{0,8}",
            template in legacy_template(),
            target in 0..20i32,
            custom in custom_block(),
        ) {
            let mut legacy = v1beta1::VerticaAutoscaler::new(
                "vas",
                v1beta1::VerticaAutoscalerSpec {
                    vertica_db_name: db,
                    scaling_granularity: granularity.to_string(),
                    service_name: service,
                    template,
                    target_size: target,
                },
            );
            // Seed the side channel the way a previous downgrade would have
            if custom.is_some() {
                let mut ann = Default::default();
                AutoscalerExtensions { custom_autoscaler: custom }.encode_into(&mut ann);
                legacy.metadata.annotations = Some(ann);
            }

            let current = AutoscalerConverter.to_current(&legacy);
            let back = AutoscalerConverter.to_legacy(&current).unwrap();
            prop_assert_eq!(back, legacy);
        }
    }
}
