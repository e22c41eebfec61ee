//! Legacy schema version (`vertica.com/v1beta1`) and the single-version
//! satellite kinds

pub mod autoscaler;
pub mod database;
pub mod event_trigger;
pub mod replicator;
pub mod restore_point_query;
pub mod scrutinize;

pub use autoscaler::{VerticaAutoscaler, VerticaAutoscalerSpec};
pub use database::{CommunalStorage, Subcluster, SubclusterSelection, VerticaDB, VerticaDBSpec};
pub use event_trigger::{
    ETCondition, ETMatch, ETRefObject, ETReference, EventTrigger, EventTriggerSpec,
    EventTriggerStatus, JobTemplate,
};
pub use replicator::{
    VerticaReplicator, VerticaReplicatorDatabaseInfo, VerticaReplicatorSourceDatabaseInfo,
    VerticaReplicatorSpec, VerticaReplicatorStatus, VerticaReplicatorTargetDatabaseInfo,
};
pub use restore_point_query::{
    RestorePointFilterOptions, VerticaRestorePointsQuery, VerticaRestorePointsQuerySpec,
    VerticaRestorePointsQueryStatus,
};
pub use scrutinize::{VerticaScrutinize, VerticaScrutinizeSpec, VerticaScrutinizeStatus};

pub const VERSION: &str = "v1beta1";
pub const API_VERSION: &str = "vertica.com/v1beta1";
