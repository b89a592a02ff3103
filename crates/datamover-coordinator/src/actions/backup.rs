//! Backup item actions: start a transfer per snapshot content, then persist the
//! transfer request with its status copied into annotations.

use std::sync::Arc;

use async_trait::async_trait;
use datamover_config::{DataMoverConfig, TrackingMode};
use datamover_core::bridge::{self, StatusSnapshot};
use datamover_core::model::crd::{
    VolumeSnapshotBackup, VolumeSnapshotBackupStatus, VolumeSnapshotContent,
};
use datamover_core::model::has_operation_label;
use datamover_core::{
    CredentialLookup, ObjectKey, OperationRef, OwnerKey, PlaceholderClassProvisioner,
    ResourceIdentifier, SnapshotReadiness, TransferKind, TransferSource, TransferSpec,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{BackupContext, BackupExecuteOutput, BackupItemAction, ResourceSelector, decode_item};
use crate::deps::CoordinatorDeps;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::lifecycle::ResourceLifecycleManager;
use crate::progress::{OperationProgress, ProgressReporter};

/// Registered name of [`SnapshotContentBackupAction`].
pub const SNAPSHOT_CONTENT_BACKUPPER: &str = "velero.io/vsm-volumesnapshotcontent-backupper";
/// Registered name of [`TransferRequestBackupAction`].
pub const TRANSFER_REQUEST_BACKUPPER: &str = "velero.io/vsm-volumesnapshotbackup-backupper";

const SNAPSHOT_CONTENT_RESOURCE: &str = "volumesnapshotcontents.snapshot.storage.k8s.io";

fn request_identifier(kind: TransferKind, key: &ObjectKey) -> ResourceIdentifier {
    ResourceIdentifier {
        group_resource: kind.group_resource(),
        namespace: Some(key.namespace.clone()),
        name: key.name.clone(),
    }
}

/// Starts a backup transfer for each snapshot content of the current backup.
pub struct SnapshotContentBackupAction {
    config: DataMoverConfig,
    lifecycle: ResourceLifecycleManager,
    reporter: ProgressReporter,
    credentials: Arc<dyn CredentialLookup>,
    readiness: Arc<dyn SnapshotReadiness>,
}

impl SnapshotContentBackupAction {
    /// Builds the action from shared dependencies.
    #[must_use]
    pub fn new(deps: &CoordinatorDeps) -> Self {
        Self {
            config: deps.config.clone(),
            lifecycle: deps.lifecycle(),
            reporter: deps.progress_reporter(),
            credentials: Arc::clone(&deps.credentials),
            readiness: Arc::clone(&deps.readiness),
        }
    }
}

#[async_trait]
impl BackupItemAction for SnapshotContentBackupAction {
    fn name(&self) -> &'static str {
        SNAPSHOT_CONTENT_BACKUPPER
    }

    fn applies_to(&self) -> ResourceSelector {
        ResourceSelector::resource(SNAPSHOT_CONTENT_RESOURCE)
    }

    async fn execute(
        &self,
        item: Value,
        backup: &BackupContext,
    ) -> CoordinatorResult<BackupExecuteOutput> {
        if !self.config.mode.is_enabled() {
            debug!(backup = %backup.name, "data mover disabled; passing snapshot content through");
            return Ok(BackupExecuteOutput::passthrough(item));
        }

        let content: VolumeSnapshotContent =
            decode_item("backup.execute", "VolumeSnapshotContent", &item)?;
        let content_name = content.metadata.name.clone().ok_or(CoordinatorError::MissingState {
            field: "metadata.name",
            value: None,
        })?;

        if !has_operation_label(&content.metadata, &OperationRef::backup(&backup.name)) {
            warn!(
                backup = %backup.name,
                content = %content_name,
                "snapshot content does not belong to the current backup; skipping"
            );
            return Ok(BackupExecuteOutput::passthrough(item));
        }

        let ready = self
            .readiness
            .wait_until_ready(&content_name)
            .await
            .map_err(|err| CoordinatorError::collaborator("snapshot_content.wait_ready", err))?;
        if !ready {
            return Err(CoordinatorError::MissingState {
                field: "status.snapshotHandle",
                value: Some(content_name),
            });
        }

        let namespace = content.spec.volume_snapshot_ref.namespace.clone();
        if namespace.is_empty() {
            return Err(CoordinatorError::MissingState {
                field: "spec.volumeSnapshotRef.namespace",
                value: Some(content_name),
            });
        }

        let credential_secret = self
            .credentials
            .credential_secret(&backup.storage_location, &backup.namespace)
            .await
            .map_err(|err| CoordinatorError::collaborator("credential_secret", err))?;

        let owner = OwnerKey::new(OperationRef::backup(&backup.name), content_name.clone());
        let spec = TransferSpec {
            source: TransferSource::SnapshotContent {
                name: content_name.clone(),
            },
            credential_secret,
            protected_namespace: backup.namespace.clone(),
        };
        let provisioned = self
            .lifecycle
            .create_if_absent(&owner, &namespace, spec)
            .await?;
        let key = provisioned.key()?;
        let identifier = request_identifier(TransferKind::Backup, &key);

        let mut output = BackupExecuteOutput::passthrough(item);
        output.items_to_update.push(identifier.clone());
        match self.config.tracking {
            TrackingMode::Asynchronous => {
                output.operation_handle = Some(provisioned.handle()?);
            }
            TrackingMode::Synchronous => {
                self.lifecycle
                    .wait_for_status_data(TransferKind::Backup, &key)
                    .await?;
                output.additional_items.push(identifier);
            }
        }

        info!(
            backup = %backup.name,
            content = %content_name,
            request = %key,
            created = provisioned.created,
            tracking = ?self.config.tracking,
            "snapshot content handed to the data mover"
        );
        Ok(output)
    }

    async fn progress(
        &self,
        handle: &str,
        _backup: &BackupContext,
    ) -> CoordinatorResult<OperationProgress> {
        self.reporter.progress(TransferKind::Backup, handle).await
    }

    async fn cancel(&self, handle: &str, backup: &BackupContext) -> CoordinatorResult<()> {
        debug!(backup = %backup.name, handle, "cancel requested; transfer keeps running");
        Ok(())
    }
}

/// Persists a backup transfer request once its worker has written status data.
pub struct TransferRequestBackupAction {
    config: DataMoverConfig,
    lifecycle: ResourceLifecycleManager,
    placeholder: Arc<dyn PlaceholderClassProvisioner>,
}

impl TransferRequestBackupAction {
    /// Builds the action from shared dependencies.
    #[must_use]
    pub fn new(deps: &CoordinatorDeps) -> Self {
        Self {
            config: deps.config.clone(),
            lifecycle: deps.lifecycle(),
            placeholder: Arc::clone(&deps.placeholder),
        }
    }
}

#[async_trait]
impl BackupItemAction for TransferRequestBackupAction {
    fn name(&self) -> &'static str {
        TRANSFER_REQUEST_BACKUPPER
    }

    fn applies_to(&self) -> ResourceSelector {
        ResourceSelector::resource(TransferKind::Backup.group_resource())
    }

    async fn execute(
        &self,
        item: Value,
        backup: &BackupContext,
    ) -> CoordinatorResult<BackupExecuteOutput> {
        if !self.config.mode.is_enabled() {
            return Ok(BackupExecuteOutput::passthrough(item));
        }

        let mut request: VolumeSnapshotBackup =
            decode_item("backup.execute", "VolumeSnapshotBackup", &item)?;
        let key = ObjectKey::from_meta(&request.metadata).ok_or(CoordinatorError::MissingState {
            field: "metadata.name",
            value: None,
        })?;

        let live = self
            .lifecycle
            .wait_for_status_data(TransferKind::Backup, &key)
            .await?;
        request.status = Some(VolumeSnapshotBackupStatus::from(&live.status));
        bridge::annotate(&mut request.metadata, &StatusSnapshot::from(&live.status));

        let placeholder = self
            .placeholder
            .ensure_placeholder_class(&backup.name)
            .await
            .map_err(|err| CoordinatorError::collaborator("placeholder_class.ensure", err))?;

        let item = serde_json::to_value(&request)
            .map_err(|source| CoordinatorError::item("backup.execute", "VolumeSnapshotBackup", source))?;

        info!(
            backup = %backup.name,
            request = %key,
            placeholder = %placeholder.name,
            "transfer request status bridged into annotations"
        );
        Ok(BackupExecuteOutput {
            item,
            additional_items: vec![placeholder],
            operation_handle: None,
            items_to_update: Vec::new(),
        })
    }
}
