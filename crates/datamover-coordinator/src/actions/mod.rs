//! Item actions invoked by the backup/restore host for each item it processes.
//!
//! # Design
//! - Items arrive as unstructured JSON and are decoded into the wire types only
//!   where an action needs their fields; untouched items are handed back as-is.
//! - Every action takes the data mover mode and tracking mode at construction.
//! - `progress` and `cancel` have defaults so actions without asynchronous work
//!   need not implement them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use datamover_core::{OperationHandle, ResourceIdentifier};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::progress::OperationProgress;

mod backup;
mod delete;
mod restore;

pub use backup::{
    SNAPSHOT_CONTENT_BACKUPPER, SnapshotContentBackupAction, TRANSFER_REQUEST_BACKUPPER,
    TransferRequestBackupAction,
};
pub use delete::{TRANSFER_REQUEST_DELETER, TransferRequestDeleteAction};
pub use restore::{
    DATAMOVER_RESTORER, SNAPSHOT_CONTENT_RESTORER, SnapshotContentRestoreAction,
    TransferRequestRestoreAction,
};

/// The backup an action runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupContext {
    /// Backup name.
    pub name: String,
    /// Namespace the backup object lives in.
    pub namespace: String,
    /// Storage location the backup writes to.
    pub storage_location: String,
}

/// The restore an action runs for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreContext {
    /// Restore name.
    pub name: String,
    /// Source namespace to target namespace.
    pub namespace_mapping: BTreeMap<String, String>,
}

impl RestoreContext {
    /// Namespace `namespace` is restored into.
    #[must_use]
    pub fn target_namespace<'a>(&'a self, namespace: &'a str) -> &'a str {
        self.namespace_mapping
            .get(namespace)
            .map_or(namespace, String::as_str)
    }
}

/// Resources an action applies to, as `resource.group` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSelector {
    /// Included resources.
    pub included_resources: Vec<String>,
}

impl ResourceSelector {
    /// Selector for exactly one resource.
    #[must_use]
    pub fn resource(group_resource: impl Into<String>) -> Self {
        Self {
            included_resources: vec![group_resource.into()],
        }
    }
}

/// Result of a backup item action.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupExecuteOutput {
    /// Possibly modified item to persist.
    pub item: Value,
    /// Extra objects to include in the backup.
    pub additional_items: Vec<ResourceIdentifier>,
    /// Handle for asynchronous progress tracking.
    pub operation_handle: Option<OperationHandle>,
    /// Objects the host re-reads once the operation finishes.
    pub items_to_update: Vec<ResourceIdentifier>,
}

impl BackupExecuteOutput {
    /// Hands the item back untouched.
    #[must_use]
    pub const fn passthrough(item: Value) -> Self {
        Self {
            item,
            additional_items: Vec::new(),
            operation_handle: None,
            items_to_update: Vec::new(),
        }
    }
}

/// Result of a restore item action.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreExecuteOutput {
    /// Possibly modified item to restore.
    pub item: Value,
    /// The host must not restore the item itself.
    pub skip_restore: bool,
    /// Handle for asynchronous progress tracking.
    pub operation_handle: Option<OperationHandle>,
}

impl RestoreExecuteOutput {
    /// Hands the item back for a normal restore.
    #[must_use]
    pub const fn passthrough(item: Value) -> Self {
        Self {
            item,
            skip_restore: false,
            operation_handle: None,
        }
    }
}

/// Action run for each backed up item.
#[async_trait]
pub trait BackupItemAction: Send + Sync {
    /// Registered name.
    fn name(&self) -> &'static str;

    /// Resources the action is invoked for.
    fn applies_to(&self) -> ResourceSelector;

    /// Processes one item.
    async fn execute(
        &self,
        item: Value,
        backup: &BackupContext,
    ) -> CoordinatorResult<BackupExecuteOutput>;

    /// Reports progress of an operation started by [`Self::execute`].
    async fn progress(
        &self,
        _handle: &str,
        _backup: &BackupContext,
    ) -> CoordinatorResult<OperationProgress> {
        Err(CoordinatorError::Unsupported {
            operation: "progress",
        })
    }

    /// Cancels an operation started by [`Self::execute`].
    async fn cancel(&self, _handle: &str, _backup: &BackupContext) -> CoordinatorResult<()> {
        Ok(())
    }
}

/// Action run for each restored item.
#[async_trait]
pub trait RestoreItemAction: Send + Sync {
    /// Registered name.
    fn name(&self) -> &'static str;

    /// Resources the action is invoked for.
    fn applies_to(&self) -> ResourceSelector;

    /// Processes one item.
    async fn execute(
        &self,
        item: Value,
        restore: &RestoreContext,
    ) -> CoordinatorResult<RestoreExecuteOutput>;

    /// Reports progress of an operation started by [`Self::execute`].
    async fn progress(
        &self,
        _handle: &str,
        _restore: &RestoreContext,
    ) -> CoordinatorResult<OperationProgress> {
        Err(CoordinatorError::Unsupported {
            operation: "progress",
        })
    }

    /// Cancels an operation started by [`Self::execute`].
    async fn cancel(&self, _handle: &str, _restore: &RestoreContext) -> CoordinatorResult<()> {
        Ok(())
    }
}

/// Action run for each item of a backup being deleted.
#[async_trait]
pub trait DeleteItemAction: Send + Sync {
    /// Registered name.
    fn name(&self) -> &'static str;

    /// Resources the action is invoked for.
    fn applies_to(&self) -> ResourceSelector;

    /// Processes one item.
    async fn execute(&self, item: &Value, backup: &BackupContext) -> CoordinatorResult<()>;
}

pub(crate) fn decode_item<T: DeserializeOwned>(
    operation: &'static str,
    resource: &'static str,
    item: &Value,
) -> CoordinatorResult<T> {
    T::deserialize(item).map_err(|source| CoordinatorError::item(operation, resource, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_mapping_falls_back_to_the_source_namespace() {
        let restore = RestoreContext {
            name: "nightly-restore".into(),
            namespace_mapping: BTreeMap::from([("apps".into(), "apps-restored".into())]),
        };
        assert_eq!(restore.target_namespace("apps"), "apps-restored");
        assert_eq!(restore.target_namespace("db"), "db");
    }

    #[test]
    fn malformed_items_surface_as_item_errors() {
        let result: CoordinatorResult<BTreeMap<String, String>> =
            decode_item("execute", "VolumeSnapshotBackup", &Value::from(7));
        assert!(matches!(
            result,
            Err(CoordinatorError::Item {
                resource: "VolumeSnapshotBackup",
                ..
            })
        ));
    }
}
