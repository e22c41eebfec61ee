//! VerticaAutoscaler, current schema version (`vertica.com/v1`)

use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscalerBehavior, MetricSpec, MetricTarget};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::database::Subcluster;
use crate::crd::types::Condition;

pub const SCALING_GRANULARITY_POD: &str = "Pod";
pub const SCALING_GRANULARITY_SUBCLUSTER: &str = "Subcluster";

pub const CUSTOM_AUTOSCALER_HPA: &str = "HPA";
pub const CUSTOM_AUTOSCALER_SCALED_OBJECT: &str = "ScaledObject";

pub const TRIGGER_TYPE_CPU: &str = "cpu";
pub const TRIGGER_TYPE_MEMORY: &str = "memory";
pub const TRIGGER_TYPE_PROMETHEUS: &str = "prometheus";

pub const METRIC_TYPE_UTILIZATION: &str = "Utilization";
pub const METRIC_TYPE_VALUE: &str = "Value";
pub const METRIC_TYPE_AVERAGE_VALUE: &str = "AverageValue";

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1",
    kind = "VerticaAutoscaler",
    namespaced,
    status = "VerticaAutoscalerStatus",
    shortname = "vas",
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.targetSize","statusReplicasPath":".status.currentSize","labelSelectorPath":".status.selector"}"#,
    printcolumn = r#"{"name":"Granularity","type":"string","jsonPath":".spec.scalingGranularity"}"#,
    printcolumn = r#"{"name":"Current Size","type":"integer","jsonPath":".status.currentSize"}"#,
    printcolumn = r#"{"name":"Target Size","type":"integer","jsonPath":".spec.targetSize"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaAutoscalerSpec {
    #[serde(rename = "verticaDBName")]
    pub vertica_db_name: String,

    /// Pod or Subcluster
    #[serde(default)]
    pub scaling_granularity: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,

    /// Shape of new subclusters when scaling by subcluster
    #[serde(default)]
    pub template: Subcluster,

    #[serde(default)]
    pub target_size: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_autoscaler: Option<CustomAutoscalerSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomAutoscalerSpec {
    /// HPA, ScaledObject or empty
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpa: Option<HPASpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaled_object: Option<ScaledObjectSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HPASpec {
    #[serde(default)]
    pub min_replicas: Option<i32>,

    #[serde(default)]
    pub max_replicas: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub behavior: Option<HorizontalPodAutoscalerBehavior>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    #[serde(default)]
    #[schemars(with = "serde_json::Value")]
    pub metric: MetricSpec,

    /// Lower bound that triggers a scale in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub scale_in_threshold: Option<MetricTarget>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    #[serde(default)]
    pub min_replicas: Option<i32>,

    #[serde(default)]
    pub max_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period: Option<i32>,

    #[serde(default)]
    pub metrics: Vec<ScaleTrigger>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Value>")]
    pub behavior: Option<HorizontalPodAutoscalerBehavior>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTrigger {
    /// cpu, memory or prometheus
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_secret: String,

    /// Utilization, Value or AverageValue
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<CPUMemorySpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusSpec {
    #[serde(default)]
    pub server_address: String,

    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub threshold: i32,

    #[serde(default, skip_serializing_if = "super::database::is_zero")]
    pub scale_in_threshold: i32,

    /// basic, bearer, tls, custom or "tls,basic"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_modes: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unsafe_ssl: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_cached_metrics: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CPUMemorySpec {
    #[serde(default)]
    pub threshold: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaAutoscalerStatus {
    #[serde(default)]
    pub scaling_count: i32,

    #[serde(default)]
    pub current_size: i32,

    #[serde(default)]
    pub selector: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl VerticaAutoscalerSpec {
    /// The template is only used when it asks for at least one pod
    pub fn can_use_template(&self) -> bool {
        self.template.size > 0
    }

    pub fn is_custom_autoscaler_set(&self) -> bool {
        self.custom_autoscaler
            .as_ref()
            .is_some_and(|c| !c.type_.is_empty())
    }

    pub fn is_hpa_type(&self) -> bool {
        self.is_custom_autoscaler_set()
            && self
                .custom_autoscaler
                .as_ref()
                .is_some_and(|c| c.type_ == CUSTOM_AUTOSCALER_HPA)
    }

    pub fn is_scaled_object_type(&self) -> bool {
        self.is_custom_autoscaler_set()
            && self
                .custom_autoscaler
                .as_ref()
                .is_some_and(|c| c.type_ == CUSTOM_AUTOSCALER_SCALED_OBJECT)
    }

    /// True when any HPA metric carries a scale-in threshold
    pub fn has_scale_in_threshold(&self) -> bool {
        self.custom_autoscaler
            .as_ref()
            .and_then(|c| c.hpa.as_ref())
            .is_some_and(|hpa| hpa.metrics.iter().any(|m| m.scale_in_threshold.is_some()))
    }
}

impl HPASpec {
    /// Scale-down stabilization window, when the behavior sets one
    pub fn scale_down_window(&self) -> Option<i32> {
        self.behavior
            .as_ref()
            .and_then(|b| b.scale_down.as_ref())
            .and_then(|sd| sd.stabilization_window_seconds)
    }
}
