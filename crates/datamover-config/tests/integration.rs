use std::collections::HashMap;
use std::time::Duration;

use datamover_config::defaults::{
    ENABLED_ENV, POLL_INTERVAL_ENV, PROTECTED_NAMESPACE_ENV, TIMEOUT_ENV, TRACKING_ENV,
};
use datamover_config::{ConfigError, DataMoverMode, TrackingMode, load_with};

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn operator_overrides_are_applied() -> anyhow::Result<()> {
    let config = load_with(&env(&[
        (ENABLED_ENV, "true"),
        (TIMEOUT_ENV, "1h30m"),
        (POLL_INTERVAL_ENV, "10s"),
        (TRACKING_ENV, "sync"),
        (PROTECTED_NAMESPACE_ENV, "oadp-operator"),
    ]))?;

    assert_eq!(config.mode, DataMoverMode::Enabled);
    assert_eq!(config.tracking, TrackingMode::Synchronous);
    assert_eq!(config.poll.timeout, Duration::from_secs(5_400));
    assert_eq!(config.poll.interval, Duration::from_secs(10));
    assert_eq!(config.protected_namespace, "oadp-operator");

    let rendered = serde_json::to_value(&config)?;
    assert_eq!(rendered["mode"], "enabled");
    assert_eq!(rendered["tracking"], "synchronous");
    Ok(())
}

#[test]
fn invalid_timeout_names_the_variable() {
    let err = load_with(&env(&[(TIMEOUT_ENV, "ten minutes")])).err();
    assert_eq!(
        err,
        Some(ConfigError::InvalidField {
            field: TIMEOUT_ENV,
            value: Some("ten minutes".to_string()),
            reason: "invalid_duration",
        })
    );
}

#[test]
fn unknown_tracking_mode_is_rejected() {
    let result = load_with(&env(&[(TRACKING_ENV, "eventually")]));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidField {
            field: TRACKING_ENV,
            ..
        })
    ));
}
