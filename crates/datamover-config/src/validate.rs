//! Parsing helpers for environment values.

use std::time::Duration;

use humantime::DurationError;

use crate::error::{ConfigError, ConfigResult};
use crate::model::TrackingMode;

const DNS_LABEL_MAX_LENGTH: usize = 63;

/// Interprets an optional flag value; `1`, `true`, `yes` and `on` are truthy.
#[must_use]
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "t" | "true" | "yes" | "on"
        )
    })
}

/// Parses a duration such as `10m`, `90s`, `1h 30m` or `2days`.
///
/// Accepts the unit suffixes understood by [`humantime::parse_duration`]. A bare
/// `0` is accepted; any other number needs a unit.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for empty, negative, unit-less or
/// overflowing values.
pub fn parse_duration(field: &'static str, raw: &str) -> ConfigResult<Duration> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::invalid(field, raw, "empty_duration"));
    }
    if value.starts_with('-') {
        return Err(ConfigError::invalid(field, raw, "negative_duration"));
    }
    if value == "0" {
        return Ok(Duration::ZERO);
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::invalid(field, raw, "missing_unit"));
    }

    humantime::parse_duration(value).map_err(|err| {
        let reason = match err {
            DurationError::UnknownUnit { .. } => "unknown_unit",
            DurationError::NumberOverflow => "duration_overflow",
            _ => "invalid_duration",
        };
        ConfigError::invalid(field, raw, reason)
    })
}

/// Parses the tracking mode (`async` / `sync`, case-insensitive).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for any other value.
pub fn parse_tracking(field: &'static str, raw: &str) -> ConfigResult<TrackingMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "async" | "asynchronous" => Ok(TrackingMode::Asynchronous),
        "sync" | "synchronous" => Ok(TrackingMode::Synchronous),
        _ => Err(ConfigError::invalid(field, raw, "unknown_tracking_mode")),
    }
}

/// Checks that a namespace is a valid DNS-1123 label.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when it is not.
pub fn validate_namespace(field: &'static str, raw: &str) -> ConfigResult<String> {
    let value = raw.trim();
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = !value.starts_with('-') && !value.ends_with('-');
    if value.is_empty() || value.len() > DNS_LABEL_MAX_LENGTH || !valid_chars || !valid_edges {
        return Err(ConfigError::invalid(field, raw, "invalid_namespace"));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: &str = "DATAMOVER_TIMEOUT";

    #[test]
    fn flags_accept_common_truthy_spellings() {
        assert!(parse_flag(Some("TrUe")));
        assert!(parse_flag(Some(" 1 ")));
        assert!(parse_flag(Some("on")));
        assert!(!parse_flag(Some("no")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn durations_accept_unit_suffixes() -> ConfigResult<()> {
        assert_eq!(parse_duration(FIELD, "10m")?, Duration::from_secs(600));
        assert_eq!(parse_duration(FIELD, "1h 30m")?, Duration::from_secs(5_400));
        assert_eq!(parse_duration(FIELD, "250ms")?, Duration::from_millis(250));
        assert_eq!(parse_duration(FIELD, "2us")?, Duration::from_micros(2));
        assert_eq!(parse_duration(FIELD, "2days")?, Duration::from_secs(172_800));
        assert_eq!(parse_duration(FIELD, " 0 ")?, Duration::ZERO);
        Ok(())
    }

    #[test]
    fn malformed_durations_report_a_reason() {
        let reason = |raw: &str| match parse_duration(FIELD, raw) {
            Err(ConfigError::InvalidField { reason, .. }) => reason,
            Ok(_) => "ok",
        };
        assert_eq!(reason(""), "empty_duration");
        assert_eq!(reason("-5m"), "negative_duration");
        assert_eq!(reason("600"), "missing_unit");
        assert_eq!(reason("10fortnights"), "unknown_unit");
        assert_eq!(reason("1..5s"), "invalid_duration");
        assert_eq!(reason("m"), "invalid_duration");
    }

    #[test]
    fn tracking_mode_is_case_insensitive() -> ConfigResult<()> {
        assert_eq!(parse_tracking(FIELD, "SYNC")?, TrackingMode::Synchronous);
        assert_eq!(parse_tracking(FIELD, "async")?, TrackingMode::Asynchronous);
        assert!(parse_tracking(FIELD, "later").is_err());
        Ok(())
    }

    #[test]
    fn namespaces_must_be_dns_labels() {
        assert!(validate_namespace(FIELD, "openshift-adp").is_ok());
        assert!(validate_namespace(FIELD, "OpenShift").is_err());
        assert!(validate_namespace(FIELD, "-adp").is_err());
        assert!(validate_namespace(FIELD, &"a".repeat(64)).is_err());
    }
}
