//! Human-entered timestamps used by filter and log-age fields
//!
//! Two grammars are accepted:
//!
//! * restore point filters: `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS[.fffffffff]`,
//!   either optionally followed by a UTC offset (`+05`, `-0330`, `+05:30`)
//! * scrutinize log ages: `YYYY-MM-DD HH [+/-XX]`
//!
//! A timestamp without an offset is read as UTC.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const FILTER_FORMAT_HINT: &str =
    "expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS[.fffffffff], optionally followed by a UTC offset such as +05 or -03:30";

pub const LOG_AGE_FORMAT: &str = "YYYY-MM-DD HH [+/-XX]";

static FILTER_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2})(?: (\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?))?(?: ?([+-])(\d{2})(?::?(\d{2}))?)?$",
    )
    .expect("constant pattern")
});

static LOG_AGE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}) (\d{1,2})(?: ?([+-])(\d{2}))?$").expect("constant pattern")
});

/// Which end of a range a date-only value stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeBound {
    /// Date-only means the first instant of the day
    Start,
    /// Date-only means the last representable instant of the day
    End,
}

/// Parses a restore point filter timestamp. The error is the reason only;
/// callers add the field name and [`FILTER_FORMAT_HINT`].
pub fn parse_filter_timestamp(raw: &str, bound: RangeBound) -> Result<DateTime<Utc>, String> {
    let caps = FILTER_TIMESTAMP
        .captures(raw.trim())
        .ok_or_else(|| "does not match any accepted format".to_string())?;

    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").map_err(|e| e.to_string())?;
    let time = match caps.get(2) {
        Some(t) => NaiveTime::parse_from_str(t.as_str(), "%H:%M:%S%.f").map_err(|e| e.to_string())?,
        None => match bound {
            RangeBound::Start => NaiveTime::from_hms_opt(0, 0, 0),
            RangeBound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999),
        }
        .ok_or_else(|| "day boundary is not representable".to_string())?,
    };

    let offset = match caps.get(3) {
        Some(sign) => {
            let minutes = caps.get(5).map_or("00", |m| m.as_str());
            offset_from(sign.as_str(), &caps[4], minutes)?
        }
        None => utc_offset()?,
    };
    to_utc(date.and_time(time), offset)
}

/// Why a log-age time was refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogAgeTimeError {
    /// The text does not follow [`LOG_AGE_FORMAT`]
    Format,
    /// The text has the right shape but names an impossible instant
    Parse(String),
}

impl fmt::Display for LogAgeTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogAgeTimeError::Format => write!(f, "should be formatted as: {LOG_AGE_FORMAT}."),
            LogAgeTimeError::Parse(reason) => f.write_str(reason),
        }
    }
}

/// Parses `YYYY-MM-DD HH [+/-XX]`, where the hour is local to the offset
pub fn parse_log_age_time(raw: &str) -> Result<DateTime<Utc>, LogAgeTimeError> {
    let caps = LOG_AGE_TIME.captures(raw.trim()).ok_or(LogAgeTimeError::Format)?;

    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
        .map_err(|e| LogAgeTimeError::Parse(e.to_string()))?;
    let hour: u32 = caps[2]
        .parse()
        .map_err(|e: std::num::ParseIntError| LogAgeTimeError::Parse(e.to_string()))?;
    let time = NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| LogAgeTimeError::Parse(format!("hour {hour} is out of range")))?;

    let offset = match caps.get(3) {
        Some(sign) => offset_from(sign.as_str(), &caps[4], "00"),
        None => utc_offset(),
    }
    .map_err(LogAgeTimeError::Parse)?;
    to_utc(date.and_time(time), offset).map_err(LogAgeTimeError::Parse)
}

fn offset_from(sign: &str, hours: &str, minutes: &str) -> Result<FixedOffset, String> {
    let h: i32 = hours.parse().map_err(|_| format!("invalid offset hours {hours:?}"))?;
    let m: i32 = minutes
        .parse()
        .map_err(|_| format!("invalid offset minutes {minutes:?}"))?;
    if m >= 60 {
        return Err(format!("invalid offset minutes {minutes:?}"));
    }
    let seconds = (h * 3600 + m * 60) * if sign == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds).ok_or_else(|| format!("offset {sign}{hours} is out of range"))
}

fn utc_offset() -> Result<FixedOffset, String> {
    FixedOffset::east_opt(0).ok_or_else(|| "UTC offset is not representable".to_string())
}

fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> Result<DateTime<Utc>, String> {
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("{local} is ambiguous at offset {offset}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn date_only_expands_by_bound() {
        let start = parse_filter_timestamp("2006-01-02", RangeBound::Start).unwrap();
        assert_eq!(start.to_rfc3339(), "2006-01-02T00:00:00+00:00");

        let end = parse_filter_timestamp("2006-01-02", RangeBound::End).unwrap();
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.nanosecond(), 999_999_999);
    }

    #[test]
    fn fractional_seconds_and_offsets() {
        let t = parse_filter_timestamp("2006-01-02 23:59:59.123456789", RangeBound::Start).unwrap();
        assert_eq!(t.nanosecond(), 123_456_789);

        let shifted = parse_filter_timestamp("2006-01-02 10:00:00 +05:30", RangeBound::Start).unwrap();
        assert_eq!(shifted.to_rfc3339(), "2006-01-02T04:30:00+00:00");

        let compact = parse_filter_timestamp("2006-01-02 10:00:00-03", RangeBound::Start).unwrap();
        assert_eq!(compact.hour(), 13);
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in ["", "2006/01/02", "2006-01-02T10:00:00", "2006-13-02", "2006-01-02 25:00:00", "yesterday"] {
            assert!(parse_filter_timestamp(bad, RangeBound::Start).is_err(), "{bad}");
        }
    }

    #[test]
    fn log_age_time_applies_offset() {
        let t = parse_log_age_time("2024-03-01 10").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let east = parse_log_age_time("2024-03-01 10 +02").unwrap();
        assert_eq!(east.hour(), 8);

        let west = parse_log_age_time("2024-03-01 1-05").unwrap();
        assert_eq!(west.hour(), 6);
    }

    #[test]
    fn log_age_time_errors_are_distinguished() {
        assert_eq!(parse_log_age_time("2024-03-01"), Err(LogAgeTimeError::Format));
        assert_eq!(parse_log_age_time("2024-03-01 10:00"), Err(LogAgeTimeError::Format));
        assert!(matches!(parse_log_age_time("2024-03-01 24"), Err(LogAgeTimeError::Parse(_))));
        assert!(matches!(parse_log_age_time("2024-02-30 10"), Err(LogAgeTimeError::Parse(_))));
    }
}
