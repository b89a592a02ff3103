//! Status bridge.
//!
//! The backup pipeline persists items without their `status`. The handful of status
//! fields a later restore needs are therefore mirrored into annotations before the
//! item is handed back, and read from annotations on the restore side.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::model::{BackupReference, SourceVolume, TransferStatus};

/// Annotation holding the repository the data was written to.
pub const REPOSITORY_ANNOTATION: &str = "datamover.oadp.openshift.io/resticrepository";
/// Annotation holding the source volume claim name.
pub const SOURCE_VOLUME_NAME_ANNOTATION: &str = "datamover.oadp.openshift.io/source-pvc-name";
/// Annotation holding the source volume size.
pub const SOURCE_VOLUME_SIZE_ANNOTATION: &str = "datamover.oadp.openshift.io/source-pvc-size";
/// Annotation holding the source volume storage class.
pub const SOURCE_VOLUME_STORAGE_CLASS_ANNOTATION: &str =
    "datamover.oadp.openshift.io/source-pvc-storageclass";
/// Annotation holding the snapshot class name.
pub const SNAPSHOT_CLASS_ANNOTATION: &str = "datamover.oadp.openshift.io/volumesnapshotclass";
/// Annotation recording which annotation contract wrote the fields.
pub const STATUS_ANNOTATIONS_VERSION_KEY: &str =
    "datamover.oadp.openshift.io/status-annotations-version";
/// Current annotation contract version.
pub const STATUS_ANNOTATIONS_VERSION: &str = "1";

/// One of the whitelisted status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    /// Repository location.
    Repository,
    /// Source volume claim name.
    SourceVolumeName,
    /// Source volume size.
    SourceVolumeSize,
    /// Source volume storage class.
    SourceVolumeStorageClass,
    /// Snapshot class name.
    SnapshotClass,
}

impl StatusField {
    /// Every bridged field, in annotation order.
    pub const ALL: [Self; 5] = [
        Self::Repository,
        Self::SourceVolumeName,
        Self::SourceVolumeSize,
        Self::SourceVolumeStorageClass,
        Self::SnapshotClass,
    ];

    /// Annotation key for the field.
    #[must_use]
    pub const fn annotation_key(self) -> &'static str {
        match self {
            Self::Repository => REPOSITORY_ANNOTATION,
            Self::SourceVolumeName => SOURCE_VOLUME_NAME_ANNOTATION,
            Self::SourceVolumeSize => SOURCE_VOLUME_SIZE_ANNOTATION,
            Self::SourceVolumeStorageClass => SOURCE_VOLUME_STORAGE_CLASS_ANNOTATION,
            Self::SnapshotClass => SNAPSHOT_CLASS_ANNOTATION,
        }
    }
}

/// The bridged subset of a transfer request's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Repository location.
    pub repository: Option<String>,
    /// Source volume claim name.
    pub source_volume_name: Option<String>,
    /// Source volume size.
    pub source_volume_size: Option<String>,
    /// Source volume storage class.
    pub source_volume_storage_class: Option<String>,
    /// Snapshot class name.
    pub snapshot_class: Option<String>,
}

impl StatusSnapshot {
    /// Value of one field.
    #[must_use]
    pub fn get(&self, field: StatusField) -> Option<&str> {
        match field {
            StatusField::Repository => self.repository.as_deref(),
            StatusField::SourceVolumeName => self.source_volume_name.as_deref(),
            StatusField::SourceVolumeSize => self.source_volume_size.as_deref(),
            StatusField::SourceVolumeStorageClass => self.source_volume_storage_class.as_deref(),
            StatusField::SnapshotClass => self.snapshot_class.as_deref(),
        }
    }

    fn slot_mut(&mut self, field: StatusField) -> &mut Option<String> {
        match field {
            StatusField::Repository => &mut self.repository,
            StatusField::SourceVolumeName => &mut self.source_volume_name,
            StatusField::SourceVolumeSize => &mut self.source_volume_size,
            StatusField::SourceVolumeStorageClass => &mut self.source_volume_storage_class,
            StatusField::SnapshotClass => &mut self.snapshot_class,
        }
    }

    /// Every field is set to a non-empty value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        StatusField::ALL
            .iter()
            .all(|field| self.get(*field).is_some_and(|value| !value.is_empty()))
    }

    /// The backup data a restore request is built from.
    #[must_use]
    pub fn backup_reference(&self) -> BackupReference {
        BackupReference {
            source_volume: SourceVolume {
                name: self.source_volume_name.clone(),
                size: self.source_volume_size.clone(),
                storage_class: self.source_volume_storage_class.clone(),
            },
            repository: self.repository.clone(),
            snapshot_class: self.snapshot_class.clone(),
        }
    }
}

impl From<&TransferStatus> for StatusSnapshot {
    fn from(status: &TransferStatus) -> Self {
        Self {
            repository: status.repository.clone(),
            source_volume_name: status.source_volume.name.clone(),
            source_volume_size: status.source_volume.size.clone(),
            source_volume_storage_class: status.source_volume.storage_class.clone(),
            snapshot_class: status.snapshot_class.clone(),
        }
    }
}

/// Writes every bridged field into the object's annotations.
///
/// Unset fields are written as empty strings. Unrelated annotations are kept and
/// the annotation map is created when absent.
pub fn annotate(meta: &mut ObjectMeta, snapshot: &StatusSnapshot) {
    let annotations = meta.annotations.get_or_insert_with(BTreeMap::new);
    for field in StatusField::ALL {
        annotations.insert(
            field.annotation_key().to_string(),
            snapshot.get(field).unwrap_or_default().to_string(),
        );
    }
    annotations.insert(
        STATUS_ANNOTATIONS_VERSION_KEY.to_string(),
        STATUS_ANNOTATIONS_VERSION.to_string(),
    );
}

/// Reads the bridged fields back; absent or empty annotations are reported as unset.
#[must_use]
pub fn extract(meta: &ObjectMeta) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot::default();
    let Some(annotations) = meta.annotations.as_ref() else {
        return snapshot;
    };
    for field in StatusField::ALL {
        *snapshot.slot_mut(field) = annotations
            .get(field.annotation_key())
            .filter(|value| !value.is_empty())
            .cloned();
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_snapshot() -> StatusSnapshot {
        StatusSnapshot {
            repository: Some("s3:s3.amazonaws.com/bucket/apps".into()),
            source_volume_name: Some("data".into()),
            source_volume_size: Some("10Gi".into()),
            source_volume_storage_class: Some("gp3-csi".into()),
            snapshot_class: Some("csi-aws-vsc".into()),
        }
    }

    #[test]
    fn annotate_then_extract_preserves_fields_and_other_annotations() {
        let mut meta = ObjectMeta {
            annotations: Some(BTreeMap::from([(
                "team".to_string(),
                "storage".to_string(),
            )])),
            ..ObjectMeta::default()
        };
        annotate(&mut meta, &full_snapshot());

        assert_eq!(extract(&meta), full_snapshot());
        let annotations = meta.annotations.unwrap_or_default();
        assert_eq!(annotations.get("team").map(String::as_str), Some("storage"));
        assert_eq!(
            annotations
                .get(STATUS_ANNOTATIONS_VERSION_KEY)
                .map(String::as_str),
            Some(STATUS_ANNOTATIONS_VERSION)
        );
    }

    #[test]
    fn annotated_values_come_back_unchanged() {
        let cases = [
            full_snapshot(),
            StatusSnapshot {
                repository: Some("s3:https://minio.local:9000/velero/restic/team a".into()),
                source_volume_name: Some("données-pg".into()),
                source_volume_size: Some("1.5Ti".into()),
                source_volume_storage_class: Some("ceph/rbd fast".into()),
                snapshot_class: Some("クラス-1".into()),
            },
            StatusSnapshot {
                repository: Some("azure:container:/prefix/".into()),
                source_volume_name: Some(" padded ".into()),
                source_volume_size: None,
                source_volume_storage_class: Some("gp3".into()),
                snapshot_class: None,
            },
            StatusSnapshot::default(),
        ];
        for snapshot in cases {
            let mut meta = ObjectMeta::default();
            annotate(&mut meta, &snapshot);
            assert_eq!(extract(&meta), snapshot);
        }
    }

    #[test]
    fn unset_fields_round_trip_as_unset() {
        let mut snapshot = full_snapshot();
        snapshot.source_volume_size = None;
        let mut meta = ObjectMeta::default();
        annotate(&mut meta, &snapshot);

        let written = meta.annotations.as_ref().and_then(|a| a.get(SOURCE_VOLUME_SIZE_ANNOTATION));
        assert_eq!(written.map(String::as_str), Some(""));
        let extracted = extract(&meta);
        assert_eq!(extracted.source_volume_size, None);
        assert!(!extracted.is_complete());
    }

    #[test]
    fn extract_without_annotations_is_empty() {
        assert_eq!(extract(&ObjectMeta::default()), StatusSnapshot::default());
    }

    #[test]
    fn snapshot_from_status_requires_every_field() {
        let mut status = TransferStatus {
            repository: Some("s3:bucket".into()),
            snapshot_class: Some("csi-aws-vsc".into()),
            ..TransferStatus::default()
        };
        status.source_volume.name = Some("data".into());
        status.source_volume.size = Some("1Gi".into());
        assert!(!StatusSnapshot::from(&status).is_complete());

        status.source_volume.storage_class = Some("gp3".into());
        let snapshot = StatusSnapshot::from(&status);
        assert!(snapshot.is_complete());
        assert_eq!(snapshot.backup_reference().source_volume, status.source_volume);
    }
}
