//! VerticaAutoscaler, legacy schema version (`vertica.com/v1beta1`)
//!
//! The legacy shape has no custom autoscaler block. When a current object is
//! served in this version, that block travels in `vas-*` annotations.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::database::Subcluster;
use crate::crd::v1::autoscaler::VerticaAutoscalerStatus;

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaAutoscaler",
    namespaced,
    status = "VerticaAutoscalerStatus",
    shortname = "vas",
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.targetSize","statusReplicasPath":".status.currentSize","labelSelectorPath":".status.selector"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaAutoscalerSpec {
    #[serde(default, rename = "verticaDBName")]
    pub vertica_db_name: String,

    #[serde(default)]
    pub scaling_granularity: String,

    #[serde(default)]
    pub service_name: String,

    #[serde(default)]
    pub template: Subcluster,

    #[serde(default)]
    pub target_size: i32,
}
