//! Items and statuses shared by coordinator tests.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use datamover_core::bridge::{self, StatusSnapshot};
use datamover_core::model::BACKUP_NAME_LABEL;
use datamover_core::{Phase, SourceVolume, TransferStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{Value, json};

/// Storage location used by fixtures.
pub const STORAGE_LOCATION: &str = "default";
/// Backup namespace used by fixtures.
pub const BACKUP_NAMESPACE: &str = "openshift-adp";

/// Status of a backup whose worker has written every bridged field.
#[must_use]
pub fn completed_backup_status() -> TransferStatus {
    TransferStatus {
        phase: Some(Phase::Completed),
        reported_phase: None,
        batching_status: Some("Completed".into()),
        start_timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single(),
        completion_timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 4, 30).single(),
        repository: Some("s3:s3.amazonaws.com/oadp-backups/apps".into()),
        source_volume: SourceVolume {
            name: Some("postgres-data".into()),
            size: Some("10Gi".into()),
            storage_class: Some("gp3-csi".into()),
        },
        snapshot_class: Some("csi-aws-vsc".into()),
        snapshot_handle: None,
        conditions: Vec::new(),
    }
}

/// A `VolumeSnapshotContent` item as the backup pipeline hands it over.
#[must_use]
pub fn snapshot_content_item(name: &str, backup_name: &str, snapshot_namespace: &str) -> Value {
    json!({
        "apiVersion": "snapshot.storage.k8s.io/v1",
        "kind": "VolumeSnapshotContent",
        "metadata": {
            "name": name,
            "labels": { BACKUP_NAME_LABEL: backup_name }
        },
        "spec": {
            "driver": "ebs.csi.aws.com",
            "volumeSnapshotRef": { "name": format!("velero-{name}"), "namespace": snapshot_namespace }
        },
        "status": { "readyToUse": true, "snapshotHandle": "snap-0a1b2c3d" }
    })
}

/// A `VolumeSnapshotBackup` item without status, as persisted by the pipeline.
#[must_use]
pub fn backup_request_item(namespace: &str, name: &str, backup_name: &str) -> Value {
    json!({
        "apiVersion": "datamover.oadp.openshift.io/v1alpha1",
        "kind": "VolumeSnapshotBackup",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": { BACKUP_NAME_LABEL: backup_name }
        },
        "spec": {
            "volumeSnapshotContent": { "name": "snapcontent-1" },
            "protectedNamespace": BACKUP_NAMESPACE,
            "resticSecretRef": { "name": format!("{STORAGE_LOCATION}-volsync-restic") }
        }
    })
}

/// A `VolumeSnapshotBackup` item carrying bridged status annotations, as a restore reads it.
#[must_use]
pub fn annotated_backup_item(
    namespace: &str,
    name: &str,
    backup_name: &str,
    snapshot: &StatusSnapshot,
) -> Value {
    let mut meta = ObjectMeta::default();
    bridge::annotate(&mut meta, snapshot);
    let annotations = meta.annotations.unwrap_or_default();

    let mut item = backup_request_item(namespace, name, backup_name);
    item["metadata"]["annotations"] = json!(annotations);
    item
}

/// Annotations map written for the completed fixture status.
#[must_use]
pub fn completed_annotations() -> BTreeMap<String, String> {
    let mut meta = ObjectMeta::default();
    bridge::annotate(&mut meta, &StatusSnapshot::from(&completed_backup_status()));
    meta.annotations.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_status_carries_every_bridged_field() {
        assert!(StatusSnapshot::from(&completed_backup_status()).is_complete());
        assert_eq!(completed_annotations().len(), 6);
    }

    #[test]
    fn annotated_items_round_trip_through_the_bridge() -> Result<(), serde_json::Error> {
        let snapshot = StatusSnapshot::from(&completed_backup_status());
        let item = annotated_backup_item("apps", "vsb-1", "nightly", &snapshot);
        let meta: ObjectMeta = serde_json::from_value(item["metadata"].clone())?;
        assert_eq!(bridge::extract(&meta), snapshot);
        Ok(())
    }
}
