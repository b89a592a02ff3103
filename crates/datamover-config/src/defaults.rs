//! Environment variable names and default values.
//!
//! # Design
//! - Keep every recognised variable name in one place for the loader and the CLI help.
//! - Defaults are stored in their textual form so they go through the same parser as
//!   operator input.

/// Enables the data mover path (`1`, `true`, `yes`, `on`).
pub const ENABLED_ENV: &str = "DATAMOVER_ENABLED";
/// Overall wait budget for reconciliation polls.
pub const TIMEOUT_ENV: &str = "DATAMOVER_TIMEOUT";
/// Interval between reconciliation fetches.
pub const POLL_INTERVAL_ENV: &str = "DATAMOVER_POLL_INTERVAL";
/// `async` or `sync` completion tracking.
pub const TRACKING_ENV: &str = "DATAMOVER_TRACKING";
/// Namespace where the transfer worker and its secrets live.
pub const PROTECTED_NAMESPACE_ENV: &str = "DATAMOVER_PROTECTED_NAMESPACE";

/// Default reconciliation wait budget.
pub const DEFAULT_TIMEOUT: &str = "10m";
/// Default interval between reconciliation fetches.
pub const DEFAULT_POLL_INTERVAL: &str = "5s";
/// Default protected namespace.
pub const DEFAULT_PROTECTED_NAMESPACE: &str = "openshift-adp";
