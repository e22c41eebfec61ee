//! Admission rules for every resource kind
//!
//! Rules never short-circuit. Each one pushes into a shared
//! [`FieldErrorList`] so a rejected request reports every violation.

mod autoscaler;
mod consistency;
mod database;
mod event_trigger;
pub mod field;
mod immutable;
mod replicator;
mod restore_point_query;
mod scrutinize;
pub mod timestamp;

pub use autoscaler::validate_autoscaler;
pub use consistency::check_database_consistency;
pub use database::{validate_database, DB_NAME_LENGTH_LIMIT, NODE_PORT_RANGE};
pub use event_trigger::validate_event_trigger;
pub use field::{FieldError, FieldErrorKind, FieldErrorList, FieldPath};
pub use immutable::check_database_immutable;
pub use replicator::validate_replicator;
pub use restore_point_query::validate_restore_points_query;
pub use scrutinize::validate_scrutinize;

use crate::annotations::DatabaseExtensions;
use crate::crd::v1::{VerticaDBSpec, VerticaDBStatus};

/// A VerticaDB as the rules see it: its desired spec, the observed status and the
/// fields that only live in annotations
#[derive(Clone, Copy, Debug)]
pub struct DatabaseView<'a> {
    pub spec: &'a VerticaDBSpec,
    pub status: Option<&'a VerticaDBStatus>,
    pub extensions: &'a DatabaseExtensions,
}

impl<'a> DatabaseView<'a> {
    pub fn new(
        spec: &'a VerticaDBSpec,
        status: Option<&'a VerticaDBStatus>,
        extensions: &'a DatabaseExtensions,
    ) -> Self {
        Self {
            spec,
            status,
            extensions,
        }
    }

    fn is_upgrade_in_progress(&self) -> bool {
        self.status.is_some_and(VerticaDBStatus::is_upgrade_in_progress)
    }

    fn is_db_initialized(&self) -> bool {
        self.status.is_some_and(VerticaDBStatus::is_db_initialized)
    }
}
