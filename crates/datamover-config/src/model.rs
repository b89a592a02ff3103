//! Typed settings consumed by the coordinator.

use std::time::Duration;

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};

/// Whether backup items are routed through the data mover at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataMoverMode {
    /// Items pass through untouched.
    #[default]
    Disabled,
    /// Snapshot data is moved by transfer requests.
    Enabled,
}

impl DataMoverMode {
    /// Maps a boolean flag to a mode.
    #[must_use]
    pub const fn from_flag(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    /// Whether the data mover path is active.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// How item actions report completion of the transfers they start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Block inside the action until the transfer has produced its status data.
    Synchronous,
    /// Return a handle and let the host poll for progress.
    #[default]
    Asynchronous,
}

/// Interval and budget for reconciliation polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollSettings {
    /// Interval between fetches.
    pub interval: Duration,
    /// Overall budget.
    pub timeout: Duration,
}

impl PollSettings {
    /// Validates and builds poll settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when either duration is zero or the
    /// interval exceeds the budget.
    pub fn new(interval: Duration, timeout: Duration) -> ConfigResult<Self> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: crate::defaults::POLL_INTERVAL_ENV,
                value: None,
                reason: "must_be_positive",
            });
        }
        if timeout.is_zero() {
            return Err(ConfigError::InvalidField {
                field: crate::defaults::TIMEOUT_ENV,
                value: None,
                reason: "must_be_positive",
            });
        }
        if interval > timeout {
            return Err(ConfigError::InvalidField {
                field: crate::defaults::POLL_INTERVAL_ENV,
                value: None,
                reason: "exceeds_timeout",
            });
        }
        Ok(Self { interval, timeout })
    }
}

/// Fully resolved coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataMoverConfig {
    /// Data mover routing.
    pub mode: DataMoverMode,
    /// Completion tracking.
    pub tracking: TrackingMode,
    /// Reconciliation poll settings.
    pub poll: PollSettings,
    /// Namespace of the transfer worker and its credential secrets.
    pub protected_namespace: String,
}
