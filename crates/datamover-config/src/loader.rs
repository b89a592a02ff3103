//! Loads [`DataMoverConfig`] from an environment source.
//!
//! # Design
//! - The environment is read once, at startup, through [`EnvSource`] so tests can
//!   supply a map instead of mutating process state.
//! - Empty values fall back to defaults, matching how unset variables behave.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::defaults::{
    DEFAULT_POLL_INTERVAL, DEFAULT_PROTECTED_NAMESPACE, DEFAULT_TIMEOUT, ENABLED_ENV,
    POLL_INTERVAL_ENV, PROTECTED_NAMESPACE_ENV, TIMEOUT_ENV, TRACKING_ENV,
};
use crate::error::ConfigResult;
use crate::model::{DataMoverConfig, DataMoverMode, PollSettings, TrackingMode};
use crate::validate::{parse_duration, parse_flag, parse_tracking, validate_namespace};

/// Read-only view of environment variables.
pub trait EnvSource {
    /// Value of `name`, if set.
    fn var(&self, name: &str) -> Option<String>;
}

/// The current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Loads configuration from the process environment.
///
/// # Errors
///
/// Propagates validation failures from [`load_with`].
pub fn load_from_env() -> ConfigResult<DataMoverConfig> {
    load_with(&ProcessEnv)
}

/// Loads configuration from `env`.
///
/// # Errors
///
/// Returns [`crate::ConfigError::InvalidField`] when a duration, tracking mode or
/// namespace cannot be parsed, or the poll settings are inconsistent.
pub fn load_with<S: EnvSource + ?Sized>(env: &S) -> ConfigResult<DataMoverConfig> {
    let mode = DataMoverMode::from_flag(parse_flag(env.var(ENABLED_ENV).as_deref()));

    let timeout = parse_duration(TIMEOUT_ENV, &value_or(env, TIMEOUT_ENV, DEFAULT_TIMEOUT))?;
    let interval = parse_duration(
        POLL_INTERVAL_ENV,
        &value_or(env, POLL_INTERVAL_ENV, DEFAULT_POLL_INTERVAL),
    )?;
    let poll = PollSettings::new(interval, timeout)?;

    let tracking = match non_empty(env, TRACKING_ENV) {
        Some(raw) => parse_tracking(TRACKING_ENV, &raw)?,
        None => TrackingMode::default(),
    };

    let protected_namespace = validate_namespace(
        PROTECTED_NAMESPACE_ENV,
        &value_or(env, PROTECTED_NAMESPACE_ENV, DEFAULT_PROTECTED_NAMESPACE),
    )?;

    let config = DataMoverConfig {
        mode,
        tracking,
        poll,
        protected_namespace,
    };
    debug!(
        enabled = config.mode.is_enabled(),
        tracking = ?config.tracking,
        timeout_secs = config.poll.timeout.as_secs(),
        interval_secs = config.poll.interval.as_secs(),
        protected_namespace = %config.protected_namespace,
        "loaded data mover configuration"
    );
    Ok(config)
}

fn non_empty<S: EnvSource + ?Sized>(env: &S, name: &str) -> Option<String> {
    env.var(name).filter(|value| !value.trim().is_empty())
}

fn value_or<S: EnvSource + ?Sized>(env: &S, name: &str, default: &str) -> String {
    non_empty(env, name).unwrap_or_else(|| default.to_string())
}
