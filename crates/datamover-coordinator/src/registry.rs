//! Registry of the item actions exposed to the host.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde::Serialize;

use crate::actions::{
    BackupItemAction, DeleteItemAction, RestoreItemAction, SnapshotContentBackupAction,
    SnapshotContentRestoreAction, TransferRequestBackupAction, TransferRequestDeleteAction,
    TransferRequestRestoreAction,
};
use crate::deps::CoordinatorDeps;

/// Host hook an action is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Backup item action.
    Backup,
    /// Restore item action.
    Restore,
    /// Delete item action.
    Delete,
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::Delete => "delete",
        })
    }
}

/// Name and hook of a registered action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    /// Registered name.
    pub name: &'static str,
    /// Hook it is registered for.
    pub kind: ActionKind,
    /// Resources it applies to.
    pub resources: Vec<String>,
}

/// Every action, constructed once from shared dependencies.
pub struct PluginRegistry {
    backup: Vec<Arc<dyn BackupItemAction>>,
    restore: Vec<Arc<dyn RestoreItemAction>>,
    delete: Vec<Arc<dyn DeleteItemAction>>,
}

impl PluginRegistry {
    /// Builds all actions.
    #[must_use]
    pub fn new(deps: &CoordinatorDeps) -> Self {
        let content_backupper: Arc<dyn BackupItemAction> =
            Arc::new(SnapshotContentBackupAction::new(deps));
        let request_backupper: Arc<dyn BackupItemAction> =
            Arc::new(TransferRequestBackupAction::new(deps));
        let restorer: Arc<dyn RestoreItemAction> =
            Arc::new(TransferRequestRestoreAction::new(deps));
        let content_restorer: Arc<dyn RestoreItemAction> =
            Arc::new(SnapshotContentRestoreAction::new(deps));
        let deleter: Arc<dyn DeleteItemAction> = Arc::new(TransferRequestDeleteAction::new(deps));
        Self {
            backup: vec![content_backupper, request_backupper],
            restore: vec![restorer, content_restorer],
            delete: vec![deleter],
        }
    }

    /// Registered actions in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        let backup = self.backup.iter().map(|action| PluginDescriptor {
            name: action.name(),
            kind: ActionKind::Backup,
            resources: action.applies_to().included_resources,
        });
        let restore = self.restore.iter().map(|action| PluginDescriptor {
            name: action.name(),
            kind: ActionKind::Restore,
            resources: action.applies_to().included_resources,
        });
        let delete = self.delete.iter().map(|action| PluginDescriptor {
            name: action.name(),
            kind: ActionKind::Delete,
            resources: action.applies_to().included_resources,
        });
        backup.chain(restore).chain(delete).collect()
    }

    /// Backup action registered under `name`.
    #[must_use]
    pub fn backup_action(&self, name: &str) -> Option<Arc<dyn BackupItemAction>> {
        self.backup
            .iter()
            .find(|action| action.name() == name)
            .cloned()
    }

    /// Restore action registered under `name`.
    #[must_use]
    pub fn restore_action(&self, name: &str) -> Option<Arc<dyn RestoreItemAction>> {
        self.restore
            .iter()
            .find(|action| action.name() == name)
            .cloned()
    }

    /// Delete action registered under `name`.
    #[must_use]
    pub fn delete_action(&self, name: &str) -> Option<Arc<dyn DeleteItemAction>> {
        self.delete
            .iter()
            .find(|action| action.name() == name)
            .cloned()
    }
}
