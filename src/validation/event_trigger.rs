//! EventTrigger rules

use super::{FieldError, FieldErrorList, FieldPath};
use crate::crd::v1beta1::EventTriggerSpec;
use crate::crd::ResourceKind;

pub const ALLOWED_REFERENCES: usize = 1;
pub const ALLOWED_MATCHES: usize = 1;

/// `served_db_versions` lists every full apiVersion the VerticaDB kind is
/// served under, e.g. `vertica.com/v1`
pub fn validate_event_trigger(spec: &EventTriggerSpec, served_db_versions: &[String]) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let db_kind = ResourceKind::VerticaDB.as_str();

    for (i, reference) in spec.references.iter().enumerate() {
        let path = FieldPath::spec().child("references").index(i).child("object");
        let Some(object) = reference.object.as_ref() else {
            errors.push(FieldError::required(path, "object must be set"));
            continue;
        };
        if object.kind != db_kind {
            errors.push(FieldError::invalid(
                path.child("kind"),
                &object.kind,
                format!("object.kind must be: {db_kind}"),
            ));
        }
        if !served_db_versions.contains(&object.api_version) {
            errors.push(FieldError::invalid(
                path.child("apiVersion"),
                &object.api_version,
                format!("object.apiVersion must be one of: {}", served_db_versions.join(", ")),
            ));
        }
    }

    if spec.references.len() > ALLOWED_REFERENCES {
        errors.push(FieldError::invalid(
            FieldPath::spec().child("references"),
            spec.references.len(),
            format!(
                "only {ALLOWED_REFERENCES} reference object allowed, number received: {}",
                spec.references.len()
            ),
        ));
    }
    if spec.matches.len() > ALLOWED_MATCHES {
        errors.push(FieldError::invalid(
            FieldPath::spec().child("matches"),
            spec.matches.len(),
            format!(
                "only {ALLOWED_MATCHES} matches object allowed, number received: {}",
                spec.matches.len()
            ),
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldErrorKind;
    use serde_json::json;

    fn served() -> Vec<String> {
        vec!["vertica.com/v1".into(), "vertica.com/v1beta1".into()]
    }

    fn spec(value: serde_json::Value) -> EventTriggerSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn single_database_reference_is_valid() {
        let et = spec(json!({
            "references": [{"object": {"apiVersion": "vertica.com/v1", "kind": "VerticaDB", "name": "db"}}],
            "matches": [{"condition": {"type": "DBInitialized", "status": "True"}}],
        }));
        let errors = validate_event_trigger(&et, &served());
        assert!(errors.is_empty(), "{errors}");
    }

    #[test]
    fn wrong_kind_and_version() {
        let et = spec(json!({
            "references": [{"object": {"apiVersion": "apps/v1", "kind": "Deployment", "name": "x"}}]
        }));
        let errors = validate_event_trigger(&et, &served());
        assert!(errors.has_path("spec.references[0].object.kind"));
        assert!(errors.has_path("spec.references[0].object.apiVersion"));
        assert!(errors.mentions("object.kind must be: VerticaDB"));
        assert!(errors.iter().all(|e| e.kind == FieldErrorKind::Invalid));
    }

    #[test]
    fn unserved_database_version_is_invalid() {
        let et = spec(json!({
            "references": [{"object": {"apiVersion": "vertica.com/v2", "kind": "VerticaDB", "name": "db"}}]
        }));
        let errors = validate_event_trigger(&et, &served());
        assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        assert_eq!(err.kind, FieldErrorKind::Invalid);
        assert_eq!(err.path.as_str(), "spec.references[0].object.apiVersion");
        assert!(err.message.contains("vertica.com/v1, vertica.com/v1beta1"));
    }

    #[test]
    fn missing_object_and_too_many_entries() {
        let et = spec(json!({
            "references": [{}, {"object": {"apiVersion": "vertica.com/v1beta1", "kind": "VerticaDB", "name": "b"}}],
            "matches": [{}, {}]
        }));
        let errors = validate_event_trigger(&et, &served());
        assert!(errors.has_path("spec.references[0].object"));
        assert!(errors.mentions("only 1 reference object allowed, number received: 2"));
        assert!(errors.mentions("only 1 matches object allowed, number received: 2"));
        assert_eq!(errors.len(), 3);
    }
}
