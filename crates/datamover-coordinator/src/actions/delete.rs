//! Cleanup of backup transfer requests when their backup is deleted.

use async_trait::async_trait;
use datamover_core::model::has_operation_label;
use datamover_core::{ObjectKey, OperationRef, TransferKind};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use tracing::{debug, info};

use super::{BackupContext, DeleteItemAction, ResourceSelector};
use crate::deps::CoordinatorDeps;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::lifecycle::ResourceLifecycleManager;

/// Registered name of [`TransferRequestDeleteAction`].
pub const TRANSFER_REQUEST_DELETER: &str = "velero.io/vsm-volumesnapshotbackup-delete";

/// Deletes the live transfer request behind a backed up one.
pub struct TransferRequestDeleteAction {
    lifecycle: ResourceLifecycleManager,
}

impl TransferRequestDeleteAction {
    /// Builds the action from shared dependencies.
    #[must_use]
    pub fn new(deps: &CoordinatorDeps) -> Self {
        Self {
            lifecycle: deps.lifecycle(),
        }
    }
}

#[async_trait]
impl DeleteItemAction for TransferRequestDeleteAction {
    fn name(&self) -> &'static str {
        TRANSFER_REQUEST_DELETER
    }

    fn applies_to(&self) -> ResourceSelector {
        ResourceSelector::resource(TransferKind::Backup.group_resource())
    }

    async fn execute(&self, item: &Value, backup: &BackupContext) -> CoordinatorResult<()> {
        let metadata = item.get("metadata").cloned().unwrap_or(Value::Null);
        let meta: ObjectMeta = serde_json::from_value(metadata)
            .map_err(|source| CoordinatorError::item("delete.execute", "VolumeSnapshotBackup", source))?;

        if !has_operation_label(&meta, &OperationRef::backup(&backup.name)) {
            debug!(
                backup = %backup.name,
                request = ?meta.name,
                "transfer request belongs to another backup; leaving it"
            );
            return Ok(());
        }

        let key = ObjectKey::from_meta(&meta).ok_or(CoordinatorError::MissingState {
            field: "metadata.name",
            value: None,
        })?;
        let deleted = self
            .lifecycle
            .delete_request(TransferKind::Backup, &key)
            .await?;
        info!(backup = %backup.name, request = %key, deleted, "backup transfer request cleaned up");
        Ok(())
    }
}
