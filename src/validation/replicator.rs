//! VerticaReplicator rules

use super::{FieldError, FieldErrorList, FieldPath};
use crate::crd::v1beta1::replicator::{REPLICATION_MODE_ASYNC, REPLICATION_MODE_SYNC};
use crate::crd::v1beta1::VerticaReplicatorSpec;

pub fn validate_replicator(spec: &VerticaReplicatorSpec) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let source = FieldPath::spec().child("source");
    let target = FieldPath::spec().child("target");

    if spec.source.database.vertica_db.is_empty() {
        errors.push(FieldError::required(source.child("verticaDB"), "source verticaDB must be set"));
    }
    if spec.target.database.vertica_db.is_empty() {
        errors.push(FieldError::required(target.child("verticaDB"), "target verticaDB must be set"));
    }

    let mode = spec.mode.as_str();
    if !mode.is_empty() && mode != REPLICATION_MODE_SYNC && mode != REPLICATION_MODE_ASYNC {
        errors.push(FieldError::not_supported(
            FieldPath::spec().child("mode"),
            mode,
            format!("Mode must be either '{REPLICATION_MODE_SYNC}' or '{REPLICATION_MODE_ASYNC}'"),
        ));
    }

    let src = &spec.source;
    // Object filters only exist for async replication
    if mode == REPLICATION_MODE_SYNC {
        let filters = [
            (source.child("includePattern"), &src.include_pattern, "Include pattern"),
            (source.child("excludePattern"), &src.exclude_pattern, "Exclude pattern"),
            (source.child("objectName"), &src.object_name, "Object name"),
            (target.child("namespace"), &spec.target.namespace, "Target namespace"),
        ];
        for (path, value, label) in filters {
            if !value.is_empty() {
                errors.push(FieldError::forbidden(
                    path,
                    value,
                    format!("{label} cannot be used in replication mode '{REPLICATION_MODE_SYNC}'"),
                ));
            }
        }
    }

    if !src.object_name.is_empty() && !src.include_pattern.is_empty() {
        errors.push(FieldError::forbidden(
            source.child("includePattern"),
            &src.include_pattern,
            "Object name and include pattern cannot be used together",
        ));
    }
    if !src.object_name.is_empty() && !src.exclude_pattern.is_empty() {
        errors.push(FieldError::forbidden(
            source.child("excludePattern"),
            &src.exclude_pattern,
            "Object name and exclude pattern cannot be used together",
        ));
    }
    if !src.exclude_pattern.is_empty() && src.include_pattern.is_empty() {
        errors.push(FieldError::invalid(
            source.child("excludePattern"),
            &src.exclude_pattern,
            "Exclude pattern cannot be used without include pattern",
        ));
    }
    errors
}
