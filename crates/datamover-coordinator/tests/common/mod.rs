#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use datamover_config::{DataMoverConfig, DataMoverMode, PollSettings, TrackingMode};
use datamover_coordinator::{BackupContext, CoordinatorDeps, RestoreContext};
use datamover_core::{
    OperationRef, OwnerKey, TransferKind, TransferRequest, TransferSource, TransferSpec,
    TransferStatus,
};
use datamover_telemetry::Metrics;
use datamover_test_support::fixtures::{BACKUP_NAMESPACE, STORAGE_LOCATION};
use datamover_test_support::mocks::{
    FixedReadiness, MemoryTransferStore, RecordingPlaceholders, StaticCredentials,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub const BACKUP_NAME: &str = "nightly";
pub const RESTORE_NAME: &str = "nightly-restore";
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Harness {
    pub store: MemoryTransferStore,
    pub readiness: FixedReadiness,
    pub placeholders: RecordingPlaceholders,
    pub metrics: Metrics,
    pub deps: CoordinatorDeps,
}

pub fn config(mode: DataMoverMode, tracking: TrackingMode) -> DataMoverConfig {
    DataMoverConfig {
        mode,
        tracking,
        poll: PollSettings {
            interval: POLL_INTERVAL,
            timeout: POLL_TIMEOUT,
        },
        protected_namespace: BACKUP_NAMESPACE.to_string(),
    }
}

pub fn harness_with(
    store: MemoryTransferStore,
    mode: DataMoverMode,
    tracking: TrackingMode,
) -> anyhow::Result<Harness> {
    let readiness = FixedReadiness::new(true);
    let placeholders = RecordingPlaceholders::default();
    let metrics = Metrics::new()?;
    let deps = CoordinatorDeps {
        store: Arc::new(store.clone()),
        credentials: Arc::new(StaticCredentials::for_locations(&[STORAGE_LOCATION])),
        readiness: Arc::new(readiness.clone()),
        placeholder: Arc::new(placeholders.clone()),
        config: config(mode, tracking),
        metrics: metrics.clone(),
    };
    Ok(Harness {
        store,
        readiness,
        placeholders,
        metrics,
        deps,
    })
}

pub fn harness(tracking: TrackingMode) -> anyhow::Result<Harness> {
    harness_with(MemoryTransferStore::new(), DataMoverMode::Enabled, tracking)
}

pub fn backup() -> BackupContext {
    BackupContext {
        name: BACKUP_NAME.to_string(),
        namespace: BACKUP_NAMESPACE.to_string(),
        storage_location: STORAGE_LOCATION.to_string(),
    }
}

pub fn restore() -> RestoreContext {
    RestoreContext {
        name: RESTORE_NAME.to_string(),
        ..RestoreContext::default()
    }
}

pub fn content_spec(content: &str) -> TransferSpec {
    TransferSpec {
        source: TransferSource::SnapshotContent {
            name: content.to_string(),
        },
        credential_secret: format!("{STORAGE_LOCATION}-volsync-restic"),
        protected_namespace: BACKUP_NAMESPACE.to_string(),
    }
}

/// A stored request owned by `owner`, as the cluster would return it.
pub fn stored_request(
    owner: &OwnerKey,
    namespace: &str,
    name: &str,
    status: TransferStatus,
) -> TransferRequest {
    TransferRequest {
        kind: owner.kind(),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(owner.labels()),
            ..ObjectMeta::default()
        },
        spec: content_spec(&owner.source),
        status,
    }
}

pub fn backup_owner(content: &str) -> OwnerKey {
    OwnerKey::new(OperationRef::backup(BACKUP_NAME), content)
}

pub fn restore_owner(volume: &str) -> OwnerKey {
    OwnerKey::new(OperationRef::restore(RESTORE_NAME), volume)
}

pub fn only_request(store: &MemoryTransferStore, kind: TransferKind) -> Option<TransferRequest> {
    let mut requests = store.requests(kind);
    (requests.len() == 1).then(|| requests.remove(0))
}
