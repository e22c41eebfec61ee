//! [`Admissible`] for each kind's hub type

use super::{Admissible, AdmissionContext};
use crate::annotations::{Annotations, AutoscalerExtensions, DatabaseExtensions, RecoveredField};
use crate::crd::{v1, v1beta1, ResourceKind};
use crate::defaults::{default_autoscaler, default_database};
use crate::validation::{
    check_database_consistency, check_database_immutable, validate_autoscaler, validate_database,
    validate_event_trigger, validate_replicator, validate_restore_points_query,
    validate_scrutinize, DatabaseView, FieldErrorList,
};

fn database_extensions(db: &v1::VerticaDB) -> (DatabaseExtensions, Vec<RecoveredField>) {
    match db.metadata.annotations.as_ref() {
        Some(annotations) => {
            let decoded = DatabaseExtensions::decode(annotations);
            (decoded.value, decoded.recovered)
        }
        None => (DatabaseExtensions::default(), Vec::new()),
    }
}

impl Admissible for v1::VerticaDB {
    const KIND: ResourceKind = ResourceKind::VerticaDB;

    fn apply_defaults(&mut self) {
        default_database(&mut self.spec);
    }

    fn check_structure(&self, _ctx: &AdmissionContext) -> FieldErrorList {
        let (extensions, _) = database_extensions(self);
        validate_database(DatabaseView::new(&self.spec, self.status.as_ref(), &extensions))
    }

    fn check_consistency(&self) -> FieldErrorList {
        check_database_consistency(&self.spec)
    }

    fn check_immutable(&self, old: &Self) -> FieldErrorList {
        let (old_ext, _) = database_extensions(old);
        let (new_ext, _) = database_extensions(self);
        check_database_immutable(
            DatabaseView::new(&old.spec, old.status.as_ref(), &old_ext),
            DatabaseView::new(&self.spec, self.status.as_ref(), &new_ext),
        )
    }

    fn advisories(&self) -> Vec<String> {
        if self.spec.http_server_mode.is_empty() {
            return Vec::new();
        }
        vec!["spec.httpServerMode is deprecated and will be removed in a future release".to_string()]
    }

    fn recovered_fields(&self) -> Vec<RecoveredField> {
        database_extensions(self).1
    }
}

impl Admissible for v1::VerticaAutoscaler {
    const KIND: ResourceKind = ResourceKind::VerticaAutoscaler;

    fn apply_defaults(&mut self) {
        default_autoscaler(&mut self.spec);
    }

    fn check_structure(&self, _ctx: &AdmissionContext) -> FieldErrorList {
        validate_autoscaler(&self.spec)
    }

    fn recovered_legacy_fields(annotations: &Annotations) -> Vec<RecoveredField> {
        AutoscalerExtensions::decode(annotations).recovered
    }
}

impl Admissible for v1beta1::EventTrigger {
    const KIND: ResourceKind = ResourceKind::EventTrigger;

    fn check_structure(&self, ctx: &AdmissionContext) -> FieldErrorList {
        validate_event_trigger(&self.spec, &ctx.served_db_api_versions)
    }
}

impl Admissible for v1beta1::VerticaRestorePointsQuery {
    const KIND: ResourceKind = ResourceKind::VerticaRestorePointsQuery;

    fn check_structure(&self, _ctx: &AdmissionContext) -> FieldErrorList {
        validate_restore_points_query(&self.spec)
    }
}

impl Admissible for v1beta1::VerticaScrutinize {
    const KIND: ResourceKind = ResourceKind::VerticaScrutinize;

    fn check_structure(&self, ctx: &AdmissionContext) -> FieldErrorList {
        validate_scrutinize(&self.spec, ctx.now)
    }
}

impl Admissible for v1beta1::VerticaReplicator {
    const KIND: ResourceKind = ResourceKind::VerticaReplicator;

    fn check_structure(&self, _ctx: &AdmissionContext) -> FieldErrorList {
        validate_replicator(&self.spec)
    }
}
