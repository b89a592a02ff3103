//! Wire types for the cluster resources the data mover reads and writes.
//!
//! `VolumeSnapshotBackup` and `VolumeSnapshotRestore` are the two transfer request
//! resources; `VolumeSnapshotContent` is the snapshot the backup path starts from.
//! Conversions to and from [`TransferRequest`] live here so both the store and the
//! item actions agree on the field mapping.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    BackupReference, Condition, NewTransferRequest, Phase, SourceVolume, TransferKind,
    TransferRequest, TransferSource, TransferSpec, TransferStatus,
};

/// Reference to an object by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NameReference {
    /// Object name.
    #[serde(default)]
    pub name: String,
}

impl NameReference {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Volume claim descriptors as stored on the resources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PvcData {
    /// Claim name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Requested size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Storage class name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

/// Condition as stored on the resources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCondition {
    /// Condition type.
    #[serde(rename = "type")]
    pub type_: String,
    /// Condition status.
    pub status: String,
    /// Reason code.
    #[serde(default)]
    pub reason: String,
    /// Message.
    #[serde(default)]
    pub message: String,
    /// Last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

/// Desired state of a `VolumeSnapshotBackup`.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "datamover.oadp.openshift.io",
    version = "v1alpha1",
    kind = "VolumeSnapshotBackup",
    namespaced,
    status = "VolumeSnapshotBackupStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotBackupSpec {
    /// Snapshot content to back up.
    #[serde(default)]
    pub volume_snapshot_content: NameReference,
    /// Namespace the worker runs in.
    #[serde(default)]
    pub protected_namespace: String,
    /// Repository credential secret.
    #[serde(default)]
    pub restic_secret_ref: NameReference,
}

/// Observed state of a `VolumeSnapshotBackup`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotBackupStatus {
    /// Reconciliation conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ResourceCondition>,
    /// Source volume descriptors.
    #[serde(
        rename = "sourcePVCData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_pvc_data: Option<PvcData>,
    /// Repository the data was written to.
    #[serde(
        rename = "resticrepository",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub restic_repository: Option<String>,
    /// Phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Snapshot class of the source snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_snapshot_class_name: Option<String>,
    /// Batching status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batching_status: Option<String>,
    /// Start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Time>,
    /// Completion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<Time>,
}

/// Backup data a restore is built from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRef {
    /// Backed up volume descriptors.
    #[serde(rename = "sourcePVCData", default)]
    pub backed_up_pvc_data: PvcData,
    /// Repository holding the data.
    #[serde(
        rename = "resticrepository",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub restic_repository: Option<String>,
    /// Snapshot class used at backup time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_snapshot_class_name: Option<String>,
}

/// Desired state of a `VolumeSnapshotRestore`.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "datamover.oadp.openshift.io",
    version = "v1alpha1",
    kind = "VolumeSnapshotRestore",
    namespaced,
    status = "VolumeSnapshotRestoreStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotRestoreSpec {
    /// Repository credential secret.
    #[serde(default)]
    pub restic_secret_ref: NameReference,
    /// Backup to restore from.
    #[serde(default)]
    pub volume_snapshot_mover_backup_ref: BackupRef,
    /// Namespace the worker runs in.
    #[serde(default)]
    pub protected_namespace: String,
}

/// Observed state of a `VolumeSnapshotRestore`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotRestoreStatus {
    /// Reconciliation conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ResourceCondition>,
    /// Phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Batching status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batching_status: Option<String>,
    /// Handle of the restored snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_handle: Option<String>,
    /// Start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Time>,
    /// Completion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<Time>,
}

/// Namespaced reference from a snapshot content to its snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnapshotReference {
    /// Snapshot name.
    #[serde(default)]
    pub name: String,
    /// Snapshot namespace.
    #[serde(default)]
    pub namespace: String,
}

/// Desired state of a `VolumeSnapshotContent`, reduced to the fields used here.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "snapshot.storage.k8s.io",
    version = "v1",
    kind = "VolumeSnapshotContent",
    status = "VolumeSnapshotContentStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotContentSpec {
    /// Snapshot bound to this content.
    #[serde(default)]
    pub volume_snapshot_ref: SnapshotReference,
    /// CSI driver.
    #[serde(default)]
    pub driver: String,
}

/// Observed state of a `VolumeSnapshotContent`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshotContentStatus {
    /// Whether the snapshot can be used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_to_use: Option<bool>,
    /// Storage system handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_handle: Option<String>,
}

impl VolumeSnapshotContent {
    /// Ready to use and carrying a snapshot handle.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|status| {
            status.ready_to_use == Some(true)
                && status
                    .snapshot_handle
                    .as_deref()
                    .is_some_and(|handle| !handle.is_empty())
        })
    }
}

/// Raised when a new request's source does not fit its kind.
#[derive(Debug, Error)]
#[error("transfer source does not match transfer kind")]
pub struct SourceMismatch {
    /// Kind of the rejected request.
    pub kind: TransferKind,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_phase(value: Option<&str>) -> Option<Phase> {
    value.and_then(Phase::parse)
}

fn to_conditions(conditions: &[ResourceCondition]) -> Vec<Condition> {
    conditions
        .iter()
        .map(|condition| Condition {
            kind: condition.type_.clone(),
            status: condition.status.clone(),
            reason: condition.reason.clone(),
            message: condition.message.clone(),
            last_transition_time: condition.last_transition_time.as_ref().map(|time| time.0),
        })
        .collect()
}

fn from_conditions(conditions: &[Condition]) -> Vec<ResourceCondition> {
    conditions
        .iter()
        .map(|condition| ResourceCondition {
            type_: condition.kind.clone(),
            status: condition.status.clone(),
            reason: condition.reason.clone(),
            message: condition.message.clone(),
            last_transition_time: condition.last_transition_time.map(Time),
        })
        .collect()
}

impl From<&PvcData> for SourceVolume {
    fn from(data: &PvcData) -> Self {
        Self {
            name: non_empty(data.name.as_deref()),
            size: non_empty(data.size.as_deref()),
            storage_class: non_empty(data.storage_class_name.as_deref()),
        }
    }
}

impl From<&SourceVolume> for PvcData {
    fn from(volume: &SourceVolume) -> Self {
        Self {
            name: volume.name.clone(),
            size: volume.size.clone(),
            storage_class_name: volume.storage_class.clone(),
        }
    }
}

impl From<&VolumeSnapshotBackupStatus> for TransferStatus {
    fn from(status: &VolumeSnapshotBackupStatus) -> Self {
        Self {
            phase: parse_phase(status.phase.as_deref()),
            reported_phase: non_empty(status.phase.as_deref()),
            batching_status: non_empty(status.batching_status.as_deref()),
            start_timestamp: status.start_timestamp.as_ref().map(|time| time.0),
            completion_timestamp: status.completion_timestamp.as_ref().map(|time| time.0),
            repository: non_empty(status.restic_repository.as_deref()),
            source_volume: status
                .source_pvc_data
                .as_ref()
                .map(SourceVolume::from)
                .unwrap_or_default(),
            snapshot_class: non_empty(status.volume_snapshot_class_name.as_deref()),
            snapshot_handle: None,
            conditions: to_conditions(&status.conditions),
        }
    }
}

impl From<&TransferStatus> for VolumeSnapshotBackupStatus {
    fn from(status: &TransferStatus) -> Self {
        let volume = &status.source_volume;
        let has_volume =
            volume.name.is_some() || volume.size.is_some() || volume.storage_class.is_some();
        Self {
            conditions: from_conditions(&status.conditions),
            source_pvc_data: has_volume.then(|| PvcData::from(volume)),
            restic_repository: status.repository.clone(),
            phase: status
                .reported_phase
                .clone()
                .or_else(|| status.phase.map(|phase| phase.as_str().to_string())),
            volume_snapshot_class_name: status.snapshot_class.clone(),
            batching_status: status.batching_status.clone(),
            start_timestamp: status.start_timestamp.map(Time),
            completion_timestamp: status.completion_timestamp.map(Time),
        }
    }
}

impl From<&VolumeSnapshotRestoreStatus> for TransferStatus {
    fn from(status: &VolumeSnapshotRestoreStatus) -> Self {
        Self {
            phase: parse_phase(status.phase.as_deref()),
            reported_phase: non_empty(status.phase.as_deref()),
            batching_status: non_empty(status.batching_status.as_deref()),
            start_timestamp: status.start_timestamp.as_ref().map(|time| time.0),
            completion_timestamp: status.completion_timestamp.as_ref().map(|time| time.0),
            snapshot_handle: non_empty(status.snapshot_handle.as_deref()),
            conditions: to_conditions(&status.conditions),
            ..Self::default()
        }
    }
}

impl From<VolumeSnapshotBackup> for TransferRequest {
    fn from(object: VolumeSnapshotBackup) -> Self {
        let status = object
            .status
            .as_ref()
            .map(TransferStatus::from)
            .unwrap_or_default();
        Self {
            kind: TransferKind::Backup,
            metadata: object.metadata,
            spec: TransferSpec {
                source: TransferSource::SnapshotContent {
                    name: object.spec.volume_snapshot_content.name,
                },
                credential_secret: object.spec.restic_secret_ref.name,
                protected_namespace: object.spec.protected_namespace,
            },
            status,
        }
    }
}

impl From<VolumeSnapshotRestore> for TransferRequest {
    fn from(object: VolumeSnapshotRestore) -> Self {
        let status = object
            .status
            .as_ref()
            .map(TransferStatus::from)
            .unwrap_or_default();
        let backup = object.spec.volume_snapshot_mover_backup_ref;
        Self {
            kind: TransferKind::Restore,
            metadata: object.metadata,
            spec: TransferSpec {
                source: TransferSource::BackedUpVolume(BackupReference {
                    source_volume: SourceVolume::from(&backup.backed_up_pvc_data),
                    repository: non_empty(backup.restic_repository.as_deref()),
                    snapshot_class: non_empty(backup.volume_snapshot_class_name.as_deref()),
                }),
                credential_secret: object.spec.restic_secret_ref.name,
                protected_namespace: object.spec.protected_namespace,
            },
            status,
        }
    }
}

impl TryFrom<&NewTransferRequest> for VolumeSnapshotBackup {
    type Error = SourceMismatch;

    fn try_from(request: &NewTransferRequest) -> Result<Self, Self::Error> {
        let (TransferKind::Backup, TransferSource::SnapshotContent { name }) =
            (request.kind, &request.spec.source)
        else {
            return Err(SourceMismatch { kind: request.kind });
        };
        Ok(Self {
            metadata: request.metadata(),
            spec: VolumeSnapshotBackupSpec {
                volume_snapshot_content: NameReference::new(name.as_str()),
                protected_namespace: request.spec.protected_namespace.clone(),
                restic_secret_ref: NameReference::new(request.spec.credential_secret.as_str()),
            },
            status: None,
        })
    }
}

impl TryFrom<&NewTransferRequest> for VolumeSnapshotRestore {
    type Error = SourceMismatch;

    fn try_from(request: &NewTransferRequest) -> Result<Self, Self::Error> {
        let (TransferKind::Restore, TransferSource::BackedUpVolume(backup)) =
            (request.kind, &request.spec.source)
        else {
            return Err(SourceMismatch { kind: request.kind });
        };
        Ok(Self {
            metadata: request.metadata(),
            spec: VolumeSnapshotRestoreSpec {
                restic_secret_ref: NameReference::new(request.spec.credential_secret.as_str()),
                volume_snapshot_mover_backup_ref: BackupRef {
                    backed_up_pvc_data: PvcData::from(&backup.source_volume),
                    restic_repository: backup.repository.clone(),
                    volume_snapshot_class_name: backup.snapshot_class.clone(),
                },
                protected_namespace: request.spec.protected_namespace.clone(),
            },
            status: None,
        })
    }
}
