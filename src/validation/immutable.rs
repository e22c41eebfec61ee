//! Update-time rules: fields that may be set at creation but not changed

use std::collections::BTreeMap;

use serde::Serialize;

use super::{DatabaseView, FieldError, FieldErrorList, FieldPath};
use crate::annotations::K_SAFETY;
use crate::crd::v1::database::{HTTP_SERVER_MODE_AUTO, HTTP_SERVER_MODE_DISABLED, HTTP_SERVER_MODE_ENABLED};

/// Compares an update against the stored object
pub fn check_database_immutable(old: DatabaseView<'_>, new: DatabaseView<'_>) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    check_always_immutable(old, new, &mut errors);
    check_frozen_during_upgrade(old, new, &mut errors);
    check_frozen_after_init(old, new, &mut errors);
    check_http_server_mode_transition(old, new, &mut errors);
    check_subcluster_renames(old, new, &mut errors);
    check_subcluster_roles(old, new, &mut errors);

    errors
}

fn push_if_changed<T: PartialEq + Serialize>(
    errors: &mut FieldErrorList,
    path: FieldPath,
    old: &T,
    new: &T,
    message: &str,
) {
    if old != new {
        errors.push(FieldError::immutable(path, new, message));
    }
}

fn check_always_immutable(old: DatabaseView<'_>, new: DatabaseView<'_>, errors: &mut FieldErrorList) {
    let (o, n) = (old.spec, new.spec);
    let communal = FieldPath::spec().child("communal");

    push_if_changed(
        errors,
        FieldPath::annotation(K_SAFETY),
        &old.extensions.k_safety,
        &new.extensions.k_safety,
        "kSafety cannot change after creation.",
    );
    push_if_changed(
        errors,
        FieldPath::spec().child("initPolicy"),
        &o.init_policy,
        &n.init_policy,
        "initPolicy cannot change after creation.",
    );
    push_if_changed(
        errors,
        FieldPath::spec().child("dbName"),
        &o.db_name,
        &n.db_name,
        "dbName cannot change after creation.",
    );
    push_if_changed(
        errors,
        communal.child("path"),
        &o.communal.path,
        &n.communal.path,
        "communal.path cannot change after creation",
    );
    push_if_changed(
        errors,
        communal.child("endpoint"),
        &o.communal.endpoint,
        &n.communal.endpoint,
        "communal.endpoint cannot change after creation",
    );
    push_if_changed(
        errors,
        communal.child("s3ServerSideEncryption"),
        &o.communal.s3_server_side_encryption,
        &n.communal.s3_server_side_encryption,
        "communal.s3ServerSideEncryption cannot change after creation",
    );
    push_if_changed(
        errors,
        FieldPath::spec().child("local").child("storageClass"),
        &o.local.storage_class,
        &n.local.storage_class,
        "local.storageClass cannot change after creation",
    );
    push_if_changed(
        errors,
        FieldPath::spec().child("encryptSpreadComm"),
        &o.encrypt_spread_comm,
        &n.encrypt_spread_comm,
        "encryptSpreadComm cannot change after creation",
    );
}

/// While an upgrade runs the reconciler relies on the routing setup and
/// policy it started with
fn check_frozen_during_upgrade(old: DatabaseView<'_>, new: DatabaseView<'_>, errors: &mut FieldErrorList) {
    if !old.is_upgrade_in_progress() {
        return;
    }
    let (o, n) = (old.spec, new.spec);
    push_if_changed(
        errors,
        FieldPath::spec().child("upgradePolicy"),
        &o.upgrade_policy,
        &n.upgrade_policy,
        "upgradePolicy cannot change because upgrade is in progress",
    );

    let routing = FieldPath::spec().child("temporarySubclusterRouting");
    let old_routing = o.temporary_subcluster_routing.clone().unwrap_or_default();
    let new_routing = n.temporary_subcluster_routing.clone().unwrap_or_default();
    push_if_changed(
        errors,
        routing.child("names"),
        &old_routing.names,
        &new_routing.names,
        "subcluster names for temporarySubclusterRouting cannot change when an upgrade is in progress",
    );
    push_if_changed(
        errors,
        routing.child("template"),
        &old_routing.template,
        &new_routing.template,
        "template for temporarySubclusterRouting cannot change when an upgrade is in progress",
    );
}

fn check_frozen_after_init(old: DatabaseView<'_>, new: DatabaseView<'_>, errors: &mut FieldErrorList) {
    if !old.is_db_initialized() {
        return;
    }
    let (o, n) = (&old.spec.local, &new.spec.local);
    let local = FieldPath::spec().child("local");

    push_if_changed(
        errors,
        local.child("dataPath"),
        &o.data_path,
        &n.data_path,
        "dataPath cannot change after the DB has been initialized.",
    );
    push_if_changed(
        errors,
        local.child("depotPath"),
        &o.depot_path,
        &n.depot_path,
        "depotPath cannot change after the DB has been initialized.",
    );
    push_if_changed(
        errors,
        local.child("catalogPath"),
        &o.catalog_path(),
        &n.catalog_path(),
        "catalogPath cannot change after the DB has been initialized.",
    );
    push_if_changed(
        errors,
        local.child("depotVolume"),
        &o.depot_volume,
        &n.depot_volume,
        "depotVolume cannot change after the DB has been initialized.",
    );
    push_if_changed(
        errors,
        FieldPath::spec().child("shardCount"),
        &old.spec.shard_count,
        &new.spec.shard_count,
        "shardCount cannot change after creation.",
    );
}

/// Leaving `Enabled`, or going from `Auto` straight to `Disabled`, would
/// take the HTTPS service away from a running database
fn check_http_server_mode_transition(
    old: DatabaseView<'_>,
    new: DatabaseView<'_>,
    errors: &mut FieldErrorList,
) {
    let (from, to) = (&old.spec.http_server_mode, &new.spec.http_server_mode);
    if from == to {
        return;
    }
    let auto_to_disabled = from == HTTP_SERVER_MODE_AUTO && to == HTTP_SERVER_MODE_DISABLED;
    if from == HTTP_SERVER_MODE_ENABLED || auto_to_disabled {
        errors.push(FieldError::immutable(
            FieldPath::spec().child("httpServerMode"),
            to,
            format!("transition from '{from}' to '{to}' not allowed"),
        ));
    }
}

/// Renaming is allowed one subcluster at a time once any of them has been
/// added to the database
fn check_subcluster_renames(old: DatabaseView<'_>, new: DatabaseView<'_>, errors: &mut FieldErrorList) {
    let Some(status) = old.status else {
        return;
    };
    let provisioned: Vec<&str> = old
        .spec
        .subclusters
        .iter()
        .filter(|sc| status.subcluster(&sc.name).is_some_and(|s| s.added_to_db_count > 0))
        .map(|sc| sc.name.as_str())
        .collect();
    if provisioned.is_empty() {
        return;
    }
    let kept = new
        .spec
        .subclusters
        .iter()
        .any(|sc| provisioned.contains(&sc.name.as_str()));
    if !kept {
        let names: Vec<&str> = new.spec.subclusters.iter().map(|sc| sc.name.as_str()).collect();
        errors.push(FieldError::invalid(
            FieldPath::spec().child("subclusters"),
            names,
            "at least one subcluster name should match its old name",
        ));
    }
}

fn check_subcluster_roles(old: DatabaseView<'_>, new: DatabaseView<'_>, errors: &mut FieldErrorList) {
    let was_primary: BTreeMap<&str, bool> = old
        .spec
        .subclusters
        .iter()
        .map(|sc| (sc.name.as_str(), sc.is_primary()))
        .collect();
    for (i, sc) in new.spec.subclusters.iter().enumerate() {
        if was_primary.get(sc.name.as_str()).is_some_and(|p| *p != sc.is_primary()) {
            errors.push(FieldError::immutable(
                FieldPath::spec().child("subclusters").index(i).child("type"),
                &sc.type_,
                format!("subcluster {} cannot have its primary or secondary role change", sc.name),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::DatabaseExtensions;
    use crate::crd::types::Condition;
    use crate::crd::v1::database::{CONDITION_DB_INITIALIZED, CONDITION_UPGRADE_IN_PROGRESS};
    use crate::crd::v1::{Subcluster, SubclusterSelection, SubclusterStatus, VerticaDBSpec, VerticaDBStatus};

    fn spec() -> VerticaDBSpec {
        let mut spec = VerticaDBSpec {
            subclusters: vec![
                Subcluster {
                    name: "main".into(),
                    size: 3,
                    ..Default::default()
                },
                Subcluster {
                    name: "analytics".into(),
                    size: 2,
                    type_: "secondary".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        spec.communal.path = "s3://bucket/db".into();
        spec
    }

    fn status_with(condition: &str) -> VerticaDBStatus {
        VerticaDBStatus {
            conditions: vec![Condition::new(condition, true, "Test")],
            ..Default::default()
        }
    }

    fn check(
        old: &VerticaDBSpec,
        new: &VerticaDBSpec,
        status: Option<&VerticaDBStatus>,
    ) -> FieldErrorList {
        let ext = DatabaseExtensions::default();
        check_database_immutable(
            DatabaseView::new(old, status, &ext),
            DatabaseView::new(new, status, &ext),
        )
    }

    #[test]
    fn unchanged_update_is_accepted() {
        assert!(check(&spec(), &spec(), None).is_empty());
    }

    #[test]
    fn communal_path_change_is_rejected() {
        let mut new = spec();
        new.communal.path = "s3://other/db".into();
        let errors = check(&spec(), &new, None);
        assert_eq!(errors.len(), 1);
        assert!(errors.mentions("communal.path cannot change after creation"));
    }

    #[test]
    fn k_safety_annotation_is_immutable() {
        let old_ext = DatabaseExtensions::default();
        let new_ext = DatabaseExtensions {
            k_safety: "0".into(),
            ..Default::default()
        };
        let s = spec();
        let errors = check_database_immutable(
            DatabaseView::new(&s, None, &old_ext),
            DatabaseView::new(&s, None, &new_ext),
        );
        assert!(errors.has_path("metadata.annotations[vertica.com/k-safety]"));
    }

    #[test]
    fn each_always_immutable_field() {
        let mut new = spec();
        new.init_policy = "Revive".into();
        new.db_name = "other".into();
        new.communal.endpoint = "https://minio".into();
        new.communal.s3_server_side_encryption = "SSE-S3".into();
        new.local.storage_class = "fast".into();
        new.encrypt_spread_comm = "vertica".into();
        let errors = check(&spec(), &new, None);
        assert_eq!(errors.len(), 6, "{errors}");
    }

    #[test]
    fn routing_is_frozen_only_during_upgrade() {
        let mut new = spec();
        new.upgrade_policy = "Offline".into();
        new.temporary_subcluster_routing = Some(SubclusterSelection {
            names: vec!["analytics".into()],
            ..Default::default()
        });
        assert!(check(&spec(), &new, None).is_empty());

        let upgrading = status_with(CONDITION_UPGRADE_IN_PROGRESS);
        let errors = check(&spec(), &new, Some(&upgrading));
        assert!(errors.has_path("spec.upgradePolicy"));
        assert!(errors.has_path("spec.temporarySubclusterRouting.names"));
        assert!(!errors.has_path("spec.temporarySubclusterRouting.template"));
    }

    #[test]
    fn local_layout_is_frozen_once_initialized() {
        let mut new = spec();
        new.local.data_path = "/vdata".into();
        new.local.depot_volume = "EmptyDir".into();
        new.shard_count = 12;
        assert!(check(&spec(), &new, None).is_empty());

        let initialized = status_with(CONDITION_DB_INITIALIZED);
        let errors = check(&spec(), &new, Some(&initialized));
        assert!(errors.has_path("spec.local.dataPath"));
        assert!(errors.has_path("spec.local.depotVolume"));
        assert!(errors.has_path("spec.shardCount"));
        // catalogPath follows dataPath only when it is unset; here it is set
        assert!(!errors.has_path("spec.local.catalogPath"));
    }

    #[test]
    fn http_server_mode_transitions() {
        for (from, to, ok) in [
            ("Enabled", "Disabled", false),
            ("Enabled", "", false),
            ("Auto", "Disabled", false),
            ("Auto", "Enabled", true),
            ("", "Enabled", true),
            ("Disabled", "Auto", true),
        ] {
            let mut old = spec();
            old.http_server_mode = from.into();
            let mut new = spec();
            new.http_server_mode = to.into();
            assert_eq!(check(&old, &new, None).is_empty(), ok, "{from} -> {to}");
        }
    }

    #[test]
    fn renaming_every_provisioned_subcluster_is_rejected() {
        let status = VerticaDBStatus {
            subclusters: vec![SubclusterStatus {
                name: "main".into(),
                added_to_db_count: 3,
                ..Default::default()
            }],
            ..Default::default()
        };

        // analytics was never added, so renaming it alone is fine
        let mut new = spec();
        new.subclusters[1].name = "reports".into();
        assert!(check(&spec(), &new, Some(&status)).is_empty());

        new.subclusters[0].name = "primary".into();
        let errors = check(&spec(), &new, Some(&status));
        assert!(errors.mentions("at least one subcluster name should match its old name"));
    }

    #[test]
    fn role_flip_is_rejected_for_existing_subclusters() {
        let mut new = spec();
        new.subclusters[1].type_ = "primary".into();
        new.subclusters.push(Subcluster {
            name: "fresh".into(),
            size: 1,
            type_: "secondary".into(),
            ..Default::default()
        });
        let errors = check(&spec(), &new, None);
        assert_eq!(errors.len(), 1);
        assert!(errors.has_path("spec.subclusters[1].type"));
    }
}
