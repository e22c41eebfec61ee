//! VerticaRestorePointsQuery rules

use super::timestamp::{parse_filter_timestamp, RangeBound, FILTER_FORMAT_HINT};
use super::{FieldError, FieldErrorList, FieldPath};
use crate::crd::v1beta1::VerticaRestorePointsQuerySpec;

pub fn validate_restore_points_query(spec: &VerticaRestorePointsQuerySpec) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    if spec.vertica_db_name.is_empty() {
        errors.push(FieldError::required(
            FieldPath::spec().child("verticaDBName"),
            "verticaDBName must be set",
        ));
    }

    let Some(filter) = spec.filter_options.as_ref() else {
        return errors;
    };
    let prefix = FieldPath::spec().child("filterOptions");

    let mut parse = |field: &str, label: &str, raw: &str, bound| {
        if raw.is_empty() {
            return None;
        }
        match parse_filter_timestamp(raw, bound) {
            Ok(t) => Some(t),
            Err(reason) => {
                errors.push(FieldError::invalid(
                    prefix.child(field),
                    raw,
                    format!("{label} timestamp {raw:?} is invalid: {reason}; {FILTER_FORMAT_HINT}"),
                ));
                None
            }
        }
    };
    let start = parse("startTimestamp", "start", &filter.start_timestamp, RangeBound::Start);
    let end = parse("endTimestamp", "end", &filter.end_timestamp, RangeBound::End);

    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.push(FieldError::invalid(
                prefix.child("startTimestamp"),
                &filter.start_timestamp,
                "start timestamp must be before end timestamp",
            ));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::v1beta1::RestorePointFilterOptions;

    fn query(start: &str, end: &str) -> VerticaRestorePointsQuerySpec {
        VerticaRestorePointsQuerySpec {
            vertica_db_name: "vertdb".into(),
            filter_options: Some(RestorePointFilterOptions {
                archive_name: "nightly".into(),
                start_timestamp: start.into(),
                end_timestamp: end.into(),
            }),
        }
    }

    #[test]
    fn start_after_end_is_rejected_and_swap_is_accepted() {
        let precise = "2006-01-02 23:59:59.123456789";
        let coarse = "2006-01-02 23:59:59";
        let errors = validate_restore_points_query(&query(precise, coarse));
        assert!(errors.mentions("start timestamp must be before end timestamp"));

        assert!(validate_restore_points_query(&query(coarse, precise)).is_empty());
    }

    #[test]
    fn equal_bounds_are_accepted() {
        let t = "2024-05-01 12:00:00";
        assert!(validate_restore_points_query(&query(t, t)).is_empty());
    }

    #[test]
    fn date_only_bounds_cover_the_whole_day() {
        assert!(validate_restore_points_query(&query("2024-05-01", "2024-05-01")).is_empty());
        // A date-only end reaches the last instant of the day
        assert!(validate_restore_points_query(&query("2024-05-01 23:59:59.5", "2024-05-01")).is_empty());
    }

    #[test]
    fn offsets_are_compared_as_instants() {
        // 10:00 at +05 is 05:00 UTC, which is before 06:00 UTC
        assert!(validate_restore_points_query(&query("2024-05-01 10:00:00 +05", "2024-05-01 06:00:00")).is_empty());
    }

    #[test]
    fn unparsable_timestamp_names_the_accepted_formats() {
        let errors = validate_restore_points_query(&query("May 1st", ""));
        assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        assert_eq!(err.path.as_str(), "spec.filterOptions.startTimestamp");
        assert!(err.message.contains("YYYY-MM-DD HH:MM:SS"));
    }

    #[test]
    fn database_name_is_required() {
        let spec = VerticaRestorePointsQuerySpec::default();
        assert!(validate_restore_points_query(&spec).has_path("spec.verticaDBName"));
    }
}
