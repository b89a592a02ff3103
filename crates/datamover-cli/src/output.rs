//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use datamover_coordinator::{OperationProgress, PluginDescriptor};
use datamover_core::{Phase, TransferRequest};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const UNSET: &str = "-";

pub(crate) fn render_progress(
    handle: &str,
    progress: &OperationProgress,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "handle": handle,
            "state": progress.state(),
            "progress": progress,
        })),
        OutputFormat::Table => {
            print!("{}", progress_table(handle, progress));
            Ok(())
        }
    }
}

pub(crate) fn render_plugins(plugins: &[PluginDescriptor], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(plugins),
        OutputFormat::Table => {
            print!("{}", plugins_table(plugins));
            Ok(())
        }
    }
}

pub(crate) fn render_restore_wait(
    restore: &str,
    completed: usize,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "restore": restore,
            "completed": completed,
        })),
        OutputFormat::Table => {
            println!("restore: {restore}");
            println!("completed requests: {completed}");
            Ok(())
        }
    }
}

pub(crate) fn render_restore_status(
    restore: &str,
    volume: &str,
    request: Option<&TransferRequest>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&restore_status_json(restore, volume, request)),
        OutputFormat::Table => {
            println!("restore: {restore}");
            println!("volume: {volume}");
            match request {
                Some(request) => {
                    let key = request
                        .key()
                        .map_or_else(|| UNSET.to_string(), |key| key.to_string());
                    println!("request: {key}");
                    println!("phase: {}", phase_label(request));
                    println!(
                        "snapshot handle: {}",
                        request.status.snapshot_handle.as_deref().unwrap_or(UNSET)
                    );
                }
                None => println!("request: none listed"),
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn progress_table(handle: &str, progress: &OperationProgress) -> String {
    let mut lines = vec![
        format!("handle: {handle}"),
        format!("state: {}", progress.state()),
    ];
    if !progress.description.is_empty() {
        lines.push(format!("description: {}", progress.description));
    }
    if let Some(error) = &progress.error {
        lines.push(format!("error: {error}"));
    }
    let started = progress
        .started
        .map_or_else(|| UNSET.to_string(), |at| at.to_rfc3339());
    lines.push(format!("started: {started}"));
    lines.push(format!("updated: {}", progress.updated.to_rfc3339()));
    lines.push(String::new());
    lines.join("\n")
}

fn plugins_table(plugins: &[PluginDescriptor]) -> String {
    let mut lines = vec![format!("{:<48} {:<8} RESOURCES", "NAME", "HOOK")];
    for plugin in plugins {
        let hook = plugin.kind.to_string();
        let resources = if plugin.resources.is_empty() {
            UNSET.to_string()
        } else {
            plugin.resources.join(",")
        };
        lines.push(format!("{:<48} {hook:<8} {resources}", plugin.name));
    }
    lines.push(String::new());
    lines.join("\n")
}

fn phase_label(request: &TransferRequest) -> &'static str {
    request.status.phase.map_or(UNSET, Phase::as_str)
}

fn restore_status_json(
    restore: &str,
    volume: &str,
    request: Option<&TransferRequest>,
) -> serde_json::Value {
    json!({
        "restore": restore,
        "volume": volume,
        "request": request.map(|request| json!({
            "namespace": request.metadata.namespace,
            "name": request.metadata.name,
            "phase": request.status.phase.map(Phase::as_str),
            "snapshotHandle": request.status.snapshot_handle,
        })),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use datamover_coordinator::ActionKind;
    use datamover_core::{
        BackupReference, TransferKind, TransferSource, TransferSpec, TransferStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    fn in_progress() -> OperationProgress {
        OperationProgress {
            completed: false,
            error: None,
            description: "Phase: InProgress BatchingStatus: Processing".into(),
            started: None,
            updated: Utc
                .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }

    #[test]
    fn progress_table_lists_state_and_timestamps() {
        let table = progress_table("openshift-adp/vsb-x2k", &in_progress());
        assert!(table.starts_with("handle: openshift-adp/vsb-x2k\nstate: in_progress\n"));
        assert!(table.contains("description: Phase: InProgress BatchingStatus: Processing\n"));
        assert!(table.contains("started: -\n"));
        assert!(table.contains("updated: 2026-03-01T12:00:00+00:00\n"));
        assert!(!table.contains("error:"));
    }

    #[test]
    fn failed_progress_shows_the_error() {
        let progress = OperationProgress {
            completed: true,
            error: Some("VolumeSnapshotBackup has a failed status".into()),
            ..in_progress()
        };
        let table = progress_table("apps/vsb-1", &progress);
        assert!(table.contains("state: failed\n"));
        assert!(table.contains("error: VolumeSnapshotBackup has a failed status\n"));
    }

    #[test]
    fn plugin_table_has_one_row_per_action() {
        let plugins = vec![
            PluginDescriptor {
                name: "velero.io/example-backupper",
                kind: ActionKind::Backup,
                resources: vec!["volumesnapshotcontent.snapshot.storage.k8s.io".into()],
            },
            PluginDescriptor {
                name: "velero.io/example-deleter",
                kind: ActionKind::Delete,
                resources: Vec::new(),
            },
        ];
        let table = plugins_table(&plugins);
        let rows: Vec<&str> = table.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("NAME"));
        assert!(rows[1].contains("backup"));
        assert!(rows[1].ends_with("volumesnapshotcontent.snapshot.storage.k8s.io"));
        assert!(rows[2].contains("delete"));
        assert!(rows[2].ends_with(UNSET));
    }

    #[test]
    fn restore_status_json_reports_the_listed_request() {
        let request = TransferRequest {
            kind: TransferKind::Restore,
            metadata: ObjectMeta {
                namespace: Some("apps".into()),
                name: Some("vsr-1".into()),
                ..ObjectMeta::default()
            },
            spec: TransferSpec {
                source: TransferSource::BackedUpVolume(BackupReference::default()),
                credential_secret: "default-volsync-restic".into(),
                protected_namespace: "openshift-adp".into(),
            },
            status: TransferStatus {
                phase: Some(Phase::Completed),
                snapshot_handle: Some("snap-restored".into()),
                ..TransferStatus::default()
            },
        };
        let value = restore_status_json("nightly-restore", "db", Some(&request));
        assert_eq!(value["request"]["name"], "vsr-1");
        assert_eq!(value["request"]["phase"], "Completed");
        assert_eq!(value["request"]["snapshotHandle"], "snap-restored");
        assert_eq!(phase_label(&request), "Completed");

        let empty = restore_status_json("nightly-restore", "db", None);
        assert!(empty["request"].is_null());
    }
}
