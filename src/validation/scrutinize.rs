//! VerticaScrutinize rules
//!
//! Log collection defaults to the last 24 hours. The window can be moved by
//! giving explicit times, or widened with `logAgeHours`, but not both.

use chrono::{DateTime, Duration, Utc};

use super::timestamp::{parse_log_age_time, LogAgeTimeError};
use super::{FieldError, FieldErrorList, FieldPath};
use crate::crd::v1beta1::VerticaScrutinizeSpec;

const DEFAULT_LOG_AGE_WINDOW_HOURS: i64 = 24;

pub fn validate_scrutinize(spec: &VerticaScrutinizeSpec, now: DateTime<Utc>) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let oldest_path = FieldPath::spec().child("logAgeOldestTime");
    let newest_path = FieldPath::spec().child("logAgeNewestTime");
    let hours_path = FieldPath::spec().child("logAgeHours");

    let has_times = !spec.log_age_oldest_time.is_empty() || !spec.log_age_newest_time.is_empty();
    if spec.log_age_hours != 0 && has_times {
        errors.push(FieldError::forbidden(
            hours_path.clone(),
            spec.log_age_hours,
            "log-age-hours cannot be set alongside log-age-oldest-time and log-age-newest-time",
        ));
    }
    if spec.log_age_hours < 0 {
        errors.push(FieldError::invalid(
            hours_path,
            spec.log_age_hours,
            "log-age-hours cannot be negative",
        ));
    }

    let mut parse = |path: &FieldPath, raw: &str| -> Option<DateTime<Utc>> {
        if raw.is_empty() {
            return None;
        }
        match parse_log_age_time(raw) {
            Ok(t) => Some(t),
            Err(LogAgeTimeError::Format) => {
                errors.push(FieldError::invalid(
                    path.clone(),
                    raw,
                    format!("{raw} {}", LogAgeTimeError::Format),
                ));
                None
            }
            Err(LogAgeTimeError::Parse(reason)) => {
                errors.push(FieldError::invalid(
                    path.clone(),
                    raw,
                    format!("failed to parse log-age-*-time: {reason}"),
                ));
                None
            }
        }
    };
    let oldest = parse(&oldest_path, &spec.log_age_oldest_time);
    let newest = parse(&newest_path, &spec.log_age_newest_time);

    let newest = newest.unwrap_or(now);
    let oldest = oldest.unwrap_or(now - Duration::hours(DEFAULT_LOG_AGE_WINDOW_HOURS));
    if oldest > now {
        errors.push(FieldError::invalid(
            oldest_path.clone(),
            &spec.log_age_oldest_time,
            "log-age-oldest-time cannot be set after current time",
        ));
    }
    if oldest > newest {
        errors.push(FieldError::invalid(
            newest_path,
            &spec.log_age_newest_time,
            "log-age-oldest-time cannot be set after log-age-newest-time",
        ));
    }
    errors
}
