//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Environment variable that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: Some(value.to_string()),
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_keeps_context() {
        let err = ConfigError::invalid("DATAMOVER_TIMEOUT", "ten", "invalid_duration");
        assert_eq!(err.to_string(), "invalid configuration field");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "DATAMOVER_TIMEOUT",
                value: Some(ref value),
                reason: "invalid_duration",
            } if value == "ten"
        ));
    }
}
