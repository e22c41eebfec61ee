//! Current schema version (`vertica.com/v1`), the conversion hub

pub mod autoscaler;
pub mod database;

pub use autoscaler::{
    CPUMemorySpec, CustomAutoscalerSpec, HPASpec, MetricDefinition, PrometheusSpec,
    ScaleTrigger, ScaledObjectSpec, VerticaAutoscaler, VerticaAutoscalerSpec,
    VerticaAutoscalerStatus,
};
pub use database::{
    CommunalStorage, LocalStorage, RestorePointPolicy, Subcluster, SubclusterPodCount,
    SubclusterSelection, SubclusterStatus, SubclusterType, VerticaDB, VerticaDBPodStatus,
    VerticaDBSpec, VerticaDBStatus,
};

pub const VERSION: &str = "v1";
pub const API_VERSION: &str = "vertica.com/v1";
