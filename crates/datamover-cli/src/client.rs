//! Error types and dependency bootstrap for the CLI.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use anyhow::anyhow;
use datamover_config::{ConfigError, DataMoverConfig, load_from_env};
use datamover_coordinator::{CoordinatorDeps, CoordinatorError, PluginRegistry};
use datamover_core::Poller;
use datamover_kube::{
    KubeCredentialLookup, KubePlaceholderClassProvisioner, KubeSnapshotReadiness,
    KubeTransferStore,
};
use datamover_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::debug;

/// Environment variable selecting `json` or `pretty` log output.
pub(crate) const LOG_FORMAT_ENV: &str = "DATAMOVER_LOG_FORMAT";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidField {
                field,
                value,
                reason,
            } => Self::validation(match value {
                Some(value) => format!("{field}={value:?} is invalid: {reason}"),
                None => format!("{field} is invalid: {reason}"),
            }),
        }
    }
}

impl From<CoordinatorError> for CliError {
    fn from(err: CoordinatorError) -> Self {
        if err.is_invalid_operation_id() {
            Self::validation(format!("{:#}", anyhow::Error::new(err)))
        } else {
            Self::failure(err)
        }
    }
}

/// Dependencies shared by every command handler.
pub(crate) struct AppContext {
    pub(crate) deps: CoordinatorDeps,
    pub(crate) registry: PluginRegistry,
}

impl AppContext {
    /// Wires the registry over already-built collaborators.
    pub(crate) fn new(deps: CoordinatorDeps) -> Self {
        let registry = PluginRegistry::new(&deps);
        Self { deps, registry }
    }

    /// Loads configuration, installs logging and connects to the cluster.
    pub(crate) async fn from_env(log_format: Option<&str>) -> CliResult<Self> {
        let format = LogFormat::from_name(
            log_format
                .map(str::to_string)
                .or_else(|| std::env::var(LOG_FORMAT_ENV).ok())
                .as_deref(),
        );
        init_logging(&LoggingConfig {
            format,
            ..LoggingConfig::default()
        })
        .map_err(|err| CliError::failure(anyhow!("failed to install logging: {err}")))?;

        let config = load_from_env()?;
        debug!(
            mode = ?config.mode,
            tracking = ?config.tracking,
            namespace = %config.protected_namespace,
            "loaded configuration"
        );

        let client = datamover_kube::connect().await.map_err(|err| {
            CliError::failure(anyhow!("failed to connect to the cluster: {err}"))
        })?;
        let metrics = Metrics::new()
            .map_err(|err| CliError::failure(anyhow!("failed to build metrics: {err}")))?;

        Ok(Self::new(cluster_deps(client, config, metrics)))
    }
}

fn cluster_deps(
    client: kube::Client,
    config: DataMoverConfig,
    metrics: Metrics,
) -> CoordinatorDeps {
    let poller = Poller::new(config.poll.interval, config.poll.timeout);
    CoordinatorDeps {
        store: Arc::new(KubeTransferStore::new(client.clone())),
        credentials: Arc::new(KubeCredentialLookup::new(client.clone())),
        readiness: Arc::new(KubeSnapshotReadiness::new(client.clone(), poller)),
        placeholder: Arc::new(KubePlaceholderClassProvisioner::new(client)),
        config,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_validation_failures() {
        let err = CliError::from(ConfigError::InvalidField {
            field: "DATAMOVER_TIMEOUT",
            value: Some("soon".into()),
            reason: "unparseable duration",
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "DATAMOVER_TIMEOUT=\"soon\" is invalid: unparseable duration"
        );
    }

    #[test]
    fn failures_carry_their_context_chain() {
        let err = CliError::failure(anyhow!("inner").context("outer"));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.display_message(), "outer: inner");
    }
}
