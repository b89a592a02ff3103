//! Restore item actions.

use async_trait::async_trait;
use datamover_config::{DataMoverConfig, TrackingMode};
use datamover_core::bridge::{self, SOURCE_VOLUME_NAME_ANNOTATION};
use datamover_core::model::crd::VolumeSnapshotBackup;
use datamover_core::{OperationRef, OwnerKey, TransferKind, TransferSource, TransferSpec};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    ResourceSelector, RestoreContext, RestoreExecuteOutput, RestoreItemAction, decode_item,
};
use crate::deps::CoordinatorDeps;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::lifecycle::{CreatePolicy, ResourceLifecycleManager};
use crate::progress::{OperationProgress, ProgressReporter};

/// Registered name of [`TransferRequestRestoreAction`].
pub const DATAMOVER_RESTORER: &str = "velero.io/vsm-datamover-restorer";
/// Registered name of [`SnapshotContentRestoreAction`].
pub const SNAPSHOT_CONTENT_RESTORER: &str = "velero.io/vsm-volumesnapshotcontent-restorer";

/// Turns each backed up transfer request into a restore transfer request.
///
/// Restores are created unconditionally; a retried restore item starts a new
/// transfer unless the store itself reports a conflict. The credential secret and
/// worker namespace are the ones recorded on the backed up request.
pub struct TransferRequestRestoreAction {
    config: DataMoverConfig,
    lifecycle: ResourceLifecycleManager,
    reporter: ProgressReporter,
}

impl TransferRequestRestoreAction {
    /// Builds the action from shared dependencies.
    #[must_use]
    pub fn new(deps: &CoordinatorDeps) -> Self {
        Self {
            config: deps.config.clone(),
            lifecycle: deps.lifecycle(),
            reporter: deps.progress_reporter(),
        }
    }
}

#[async_trait]
impl RestoreItemAction for TransferRequestRestoreAction {
    fn name(&self) -> &'static str {
        DATAMOVER_RESTORER
    }

    fn applies_to(&self) -> ResourceSelector {
        ResourceSelector::resource(TransferKind::Backup.group_resource())
    }

    async fn execute(
        &self,
        item: Value,
        restore: &RestoreContext,
    ) -> CoordinatorResult<RestoreExecuteOutput> {
        if !self.config.mode.is_enabled() {
            debug!(restore = %restore.name, "data mover disabled; restoring item as-is");
            return Ok(RestoreExecuteOutput::passthrough(item));
        }

        let backed_up: VolumeSnapshotBackup =
            decode_item("restore.execute", "VolumeSnapshotBackup", &item)?;
        let snapshot = bridge::extract(&backed_up.metadata);
        let missing = |field| CoordinatorError::MissingState {
            field,
            value: backed_up.metadata.name.clone(),
        };
        let source_volume = snapshot
            .source_volume_name
            .clone()
            .ok_or_else(|| missing(SOURCE_VOLUME_NAME_ANNOTATION))?;
        let source_namespace = backed_up
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| missing("metadata.namespace"))?;
        let namespace = restore.target_namespace(source_namespace);

        let owner = OwnerKey::new(OperationRef::restore(&restore.name), source_volume.clone());
        let spec = TransferSpec {
            source: TransferSource::BackedUpVolume(snapshot.backup_reference()),
            credential_secret: backed_up.spec.restic_secret_ref.name.clone(),
            protected_namespace: backed_up.spec.protected_namespace.clone(),
        };
        let provisioned = self
            .lifecycle
            .provision(CreatePolicy::Always, &owner, namespace, spec)
            .await?;
        let key = provisioned.key()?;

        let operation_handle = match self.config.tracking {
            TrackingMode::Asynchronous => Some(provisioned.handle()?),
            TrackingMode::Synchronous => {
                self.lifecycle
                    .wait_for_status_data(TransferKind::Restore, &key)
                    .await?;
                None
            }
        };

        info!(
            restore = %restore.name,
            source_volume = %source_volume,
            request = %key,
            "restore transfer requested"
        );
        Ok(RestoreExecuteOutput {
            item,
            skip_restore: true,
            operation_handle,
        })
    }

    async fn progress(
        &self,
        handle: &str,
        _restore: &RestoreContext,
    ) -> CoordinatorResult<OperationProgress> {
        self.reporter.progress(TransferKind::Restore, handle).await
    }

    async fn cancel(&self, handle: &str, restore: &RestoreContext) -> CoordinatorResult<()> {
        debug!(restore = %restore.name, handle, "cancel requested; transfer keeps running");
        Ok(())
    }
}

/// Keeps snapshot contents out of a restore; the data mover recreates the volume.
pub struct SnapshotContentRestoreAction {
    config: DataMoverConfig,
}

impl SnapshotContentRestoreAction {
    /// Builds the action from shared dependencies.
    #[must_use]
    pub fn new(deps: &CoordinatorDeps) -> Self {
        Self {
            config: deps.config.clone(),
        }
    }
}

#[async_trait]
impl RestoreItemAction for SnapshotContentRestoreAction {
    fn name(&self) -> &'static str {
        SNAPSHOT_CONTENT_RESTORER
    }

    fn applies_to(&self) -> ResourceSelector {
        ResourceSelector::resource("volumesnapshotcontents.snapshot.storage.k8s.io")
    }

    async fn execute(
        &self,
        item: Value,
        restore: &RestoreContext,
    ) -> CoordinatorResult<RestoreExecuteOutput> {
        if self.config.mode.is_enabled() {
            info!(restore = %restore.name, "skipping snapshot content restore");
        }
        Ok(RestoreExecuteOutput {
            item,
            skip_restore: true,
            operation_handle: None,
        })
    }
}
