//! Shared dependencies every action is built from.

use std::sync::Arc;

use datamover_config::DataMoverConfig;
use datamover_core::{
    CredentialLookup, PlaceholderClassProvisioner, Poller, SnapshotReadiness, TransferStore,
};
use datamover_telemetry::Metrics;

use crate::lifecycle::ResourceLifecycleManager;
use crate::progress::ProgressReporter;
use crate::restore_wait::RestoreWaiter;

/// Collaborators and settings handed to the plugin registry.
#[derive(Clone)]
pub struct CoordinatorDeps {
    /// Transfer request store.
    pub store: Arc<dyn TransferStore>,
    /// Credential secret lookup.
    pub credentials: Arc<dyn CredentialLookup>,
    /// Snapshot content readiness.
    pub readiness: Arc<dyn SnapshotReadiness>,
    /// Placeholder snapshot class provisioning.
    pub placeholder: Arc<dyn PlaceholderClassProvisioner>,
    /// Resolved configuration.
    pub config: DataMoverConfig,
    /// Metrics registry.
    pub metrics: Metrics,
}

impl CoordinatorDeps {
    /// Poller configured from the poll settings.
    #[must_use]
    pub const fn poller(&self) -> Poller {
        Poller::new(self.config.poll.interval, self.config.poll.timeout)
    }

    /// Lifecycle manager over the shared store.
    #[must_use]
    pub fn lifecycle(&self) -> ResourceLifecycleManager {
        ResourceLifecycleManager::new(
            Arc::clone(&self.store),
            self.poller(),
            self.metrics.clone(),
        )
    }

    /// Progress reporter over the shared store.
    #[must_use]
    pub fn progress_reporter(&self) -> ProgressReporter {
        ProgressReporter::new(Arc::clone(&self.store), self.metrics.clone())
    }

    /// Restore waiter over the shared store.
    #[must_use]
    pub fn restore_waiter(&self) -> RestoreWaiter {
        RestoreWaiter::new(Arc::clone(&self.store), self.poller(), self.metrics.clone())
    }
}
