//! Transfer request domain types.
//!
//! A transfer request is the durable object that asks the out-of-process worker to
//! move one volume's data. Backup and restore requests share a single shape and are
//! told apart by [`TransferKind`].

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

pub mod crd;
mod owner;

pub use owner::{
    BACKUP_NAME_LABEL, LABEL_VALUE_MAX_LENGTH, LabelSelector, OperationRef, OwnerKey,
    RESTORE_NAME_LABEL, SOURCE_LABEL, has_operation_label, valid_label_value,
};

/// API group shared by both transfer request kinds.
pub const TRANSFER_GROUP: &str = "datamover.oadp.openshift.io";

/// Family of transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Moves snapshot data out of the cluster.
    Backup,
    /// Moves previously backed up data into a fresh volume.
    Restore,
}

impl TransferKind {
    /// Resource kind as registered with the cluster.
    #[must_use]
    pub const fn resource_kind(self) -> &'static str {
        match self {
            Self::Backup => "VolumeSnapshotBackup",
            Self::Restore => "VolumeSnapshotRestore",
        }
    }

    /// Plural resource name.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Backup => "volumesnapshotbackups",
            Self::Restore => "volumesnapshotrestores",
        }
    }

    /// Prefix used when the store generates a name for a new request.
    #[must_use]
    pub const fn name_prefix(self) -> &'static str {
        match self {
            Self::Backup => "vsb-",
            Self::Restore => "vsr-",
        }
    }

    /// Short lowercase label used in logs, metrics and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }

    /// `resource.group` form used when the host tracks an item for update.
    #[must_use]
    pub fn group_resource(self) -> String {
        format!("{}.{TRANSFER_GROUP}", self.plural())
    }
}

impl Display for TransferKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_kind())
    }
}

/// Lifecycle phase reported by the transfer worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Accepted but not yet picked up.
    New,
    /// The worker is moving data.
    InProgress,
    /// Data movement finished.
    Completed,
    /// Data movement failed.
    Failed,
    /// Some of the data could not be moved; treated as a failure.
    PartiallyFailed,
}

impl Phase {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::PartiallyFailed => "PartiallyFailed",
        }
    }

    /// Parses the wire representation; unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "New" => Some(Self::New),
            "InProgress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            "Failed" => Some(Self::Failed),
            "PartiallyFailed" => Some(Self::PartiallyFailed),
            _ => None,
        }
    }

    /// Whether the worker will not touch the request again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::PartiallyFailed)
    }

    /// Whether the phase reports a failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::PartiallyFailed)
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation condition reported by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition type, e.g. `Reconciled`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `True`, `False` or `Unknown`.
    pub status: String,
    /// Machine readable reason.
    #[serde(default)]
    pub reason: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// When the status last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    /// Whether this is the `Reconciled=False` condition with reason `Error`.
    #[must_use]
    pub fn is_reconcile_error(&self) -> bool {
        self.kind == "Reconciled" && self.status == "False" && self.reason == "Error"
    }
}

/// Descriptors of the volume whose data is moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVolume {
    /// Volume claim name.
    pub name: Option<String>,
    /// Requested size.
    pub size: Option<String>,
    /// Storage class name.
    pub storage_class: Option<String>,
}

/// Observed state of a transfer request, written by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    /// Current phase.
    pub phase: Option<Phase>,
    /// Phase exactly as the worker wrote it, including values [`Phase`] does not model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_phase: Option<String>,
    /// Free form batching status.
    pub batching_status: Option<String>,
    /// When the worker started.
    pub start_timestamp: Option<DateTime<Utc>>,
    /// When the worker finished.
    pub completion_timestamp: Option<DateTime<Utc>>,
    /// Repository the data was written to.
    pub repository: Option<String>,
    /// Source volume descriptors.
    pub source_volume: SourceVolume,
    /// Snapshot class used for the source snapshot.
    pub snapshot_class: Option<String>,
    /// Handle of the snapshot produced by a restore.
    pub snapshot_handle: Option<String>,
    /// Reconciliation conditions.
    pub conditions: Vec<Condition>,
}

impl TransferStatus {
    /// Failed phase or a reconcile error condition.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.phase.is_some_and(Phase::is_failure)
            || self.conditions.iter().any(Condition::is_reconcile_error)
    }
}

/// Data a restore needs about the backup it restores from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupReference {
    /// Descriptors of the backed up volume.
    pub source_volume: SourceVolume,
    /// Repository holding the data.
    pub repository: Option<String>,
    /// Snapshot class used at backup time.
    pub snapshot_class: Option<String>,
}

/// What the transfer request moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferSource {
    /// Back up the named snapshot content.
    SnapshotContent {
        /// Snapshot content name.
        name: String,
    },
    /// Restore a volume from an earlier backup.
    BackedUpVolume(BackupReference),
}

/// Desired state of a transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSpec {
    /// Data source.
    pub source: TransferSource,
    /// Secret holding repository credentials.
    pub credential_secret: String,
    /// Namespace where the worker runs.
    pub protected_namespace: String,
}

/// Namespaced object identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Namespace.
    pub namespace: String,
    /// Name.
    pub name: String,
}

impl ObjectKey {
    /// Builds a key from its parts.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reads the identity of an object's metadata when both parts are present.
    #[must_use]
    pub fn from_meta(meta: &ObjectMeta) -> Option<Self> {
        match (meta.namespace.as_deref(), meta.name.as_deref()) {
            (Some(namespace), Some(name)) if !namespace.is_empty() && !name.is_empty() => {
                Some(Self::new(namespace, name))
            }
            _ => None,
        }
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A transfer request as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Request family.
    pub kind: TransferKind,
    /// Object metadata (name, namespace, labels, annotations).
    pub metadata: ObjectMeta,
    /// Desired state.
    pub spec: TransferSpec,
    /// Observed state.
    pub status: TransferStatus,
}

impl TransferRequest {
    /// Stored identity, if the request has been persisted.
    #[must_use]
    pub fn key(&self) -> Option<ObjectKey> {
        ObjectKey::from_meta(&self.metadata)
    }

    /// Value of a label, if set.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }
}

/// A transfer request about to be created; the store picks the final name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransferRequest {
    /// Request family.
    pub kind: TransferKind,
    /// Target namespace.
    pub namespace: String,
    /// Prefix for the generated name.
    pub generate_name: String,
    /// Ownership labels.
    pub labels: BTreeMap<String, String>,
    /// Desired state.
    pub spec: TransferSpec,
}

impl NewTransferRequest {
    /// Metadata to persist for this request.
    #[must_use]
    pub fn metadata(&self) -> ObjectMeta {
        ObjectMeta {
            namespace: Some(self.namespace.clone()),
            generate_name: Some(self.generate_name.clone()),
            labels: Some(self.labels.clone()),
            ..ObjectMeta::default()
        }
    }
}

/// Reference to an extra object the host should include or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// `resource.group`, e.g. `volumesnapshotclasses.snapshot.storage.k8s.io`.
    pub group_resource: String,
    /// Namespace for namespaced resources.
    pub namespace: Option<String>,
    /// Object name.
    pub name: String,
}
