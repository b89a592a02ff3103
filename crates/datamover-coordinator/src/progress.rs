//! Progress reporting for in-flight transfer requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use datamover_core::handle;
use datamover_core::{Phase, TransferKind, TransferRequest, TransferStore};
use datamover_telemetry::Metrics;
use serde::Serialize;
use tracing::debug;

use crate::error::{CoordinatorError, CoordinatorResult};

/// Which clock reading fills [`OperationProgress::updated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatedTimestamp {
    /// The request's completion timestamp when set, otherwise the current time.
    CompletionOrNow,
    /// Always the current time.
    Now,
}

impl UpdatedTimestamp {
    /// Backups report their completion time; restores report the query time.
    #[must_use]
    pub const fn for_kind(kind: TransferKind) -> Self {
        match kind {
            TransferKind::Backup => Self::CompletionOrNow,
            TransferKind::Restore => Self::Now,
        }
    }
}

/// Progress of one asynchronous operation as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationProgress {
    /// The request reached a terminal phase.
    pub completed: bool,
    /// Set when the request failed.
    pub error: Option<String>,
    /// `Phase: <phase> BatchingStatus: <status>`, empty until both are known.
    pub description: String,
    /// When the worker started.
    pub started: Option<DateTime<Utc>>,
    /// See [`UpdatedTimestamp`].
    pub updated: DateTime<Utc>,
}

impl OperationProgress {
    /// Short state label used for metrics and CLI output.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match (self.completed, self.error.is_some()) {
            (_, true) => "failed",
            (true, false) => "completed",
            (false, false) => "in_progress",
        }
    }
}

/// Derives progress from a stored request.
#[must_use]
pub fn progress_from_request(
    request: &TransferRequest,
    updated: UpdatedTimestamp,
    now: DateTime<Utc>,
) -> OperationProgress {
    let status = &request.status;
    let description = match (status.phase, status.batching_status.as_deref()) {
        (Some(phase), Some(batching)) => format!("Phase: {phase} BatchingStatus: {batching}"),
        _ => String::new(),
    };
    let error = status
        .phase
        .filter(|phase| phase.is_failure())
        .map(|_| format!("{} has a failed status", request.kind.resource_kind()));
    let updated = match updated {
        UpdatedTimestamp::CompletionOrNow => status.completion_timestamp.unwrap_or(now),
        UpdatedTimestamp::Now => now,
    };

    OperationProgress {
        completed: status.phase.is_some_and(Phase::is_terminal),
        error,
        description,
        started: status.start_timestamp,
        updated,
    }
}

/// Answers progress queries by reading the request a handle points at.
#[derive(Clone)]
pub struct ProgressReporter {
    store: Arc<dyn TransferStore>,
    metrics: Metrics,
}

impl ProgressReporter {
    /// Builds a reporter over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TransferStore>, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// Reports progress for the request addressed by `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidOperationId`] for an empty or malformed
    /// handle without touching the store, and [`CoordinatorError::Store`] when the
    /// fetch fails (including `NotFound`).
    pub async fn progress(
        &self,
        kind: TransferKind,
        handle: &str,
    ) -> CoordinatorResult<OperationProgress> {
        let key = handle::decode(handle).map_err(|source| CoordinatorError::InvalidOperationId {
            operation: "progress",
            source,
        })?;

        let request = self
            .store
            .get(kind, &key)
            .await
            .map_err(|err| CoordinatorError::store("progress.get", kind, handle, err))?;

        let progress =
            progress_from_request(&request, UpdatedTimestamp::for_kind(kind), Utc::now());
        self.metrics.record_progress(kind.as_str(), progress.state());
        debug!(
            kind = %kind,
            request = %key,
            state = progress.state(),
            description = %progress.description,
            "reported transfer progress"
        );
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use datamover_core::{TransferSource, TransferSpec, TransferStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    fn request(kind: TransferKind, status: TransferStatus) -> TransferRequest {
        TransferRequest {
            kind,
            metadata: ObjectMeta {
                name: Some(format!("{}1", kind.name_prefix())),
                namespace: Some("apps".into()),
                ..ObjectMeta::default()
            },
            spec: TransferSpec {
                source: TransferSource::SnapshotContent {
                    name: "snapcontent-1".into(),
                },
                credential_secret: "default-volsync-restic".into(),
                protected_namespace: "openshift-adp".into(),
            },
            status,
        }
    }

    fn at(hour: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).single()
    }

    #[test]
    fn description_needs_phase_and_batching_status() {
        let now = Utc::now();
        let partial = request(
            TransferKind::Backup,
            TransferStatus {
                phase: Some(Phase::InProgress),
                ..TransferStatus::default()
            },
        );
        let progress = progress_from_request(&partial, UpdatedTimestamp::CompletionOrNow, now);
        assert!(progress.description.is_empty());
        assert!(!progress.completed);
        assert_eq!(progress.updated, now);
        assert_eq!(progress.state(), "in_progress");

        let full = request(
            TransferKind::Backup,
            TransferStatus {
                phase: Some(Phase::InProgress),
                batching_status: Some("Processing".into()),
                start_timestamp: at(9),
                ..TransferStatus::default()
            },
        );
        let progress = progress_from_request(&full, UpdatedTimestamp::CompletionOrNow, now);
        assert_eq!(progress.description, "Phase: InProgress BatchingStatus: Processing");
        assert_eq!(progress.started, at(9));
    }

    #[test]
    fn failed_phases_complete_with_a_kind_specific_error() {
        let now = Utc::now();
        let failed = request(
            TransferKind::Restore,
            TransferStatus {
                phase: Some(Phase::PartiallyFailed),
                completion_timestamp: at(11),
                ..TransferStatus::default()
            },
        );
        let progress = progress_from_request(&failed, UpdatedTimestamp::Now, now);
        assert!(progress.completed);
        assert_eq!(
            progress.error.as_deref(),
            Some("VolumeSnapshotRestore has a failed status")
        );
        assert_eq!(progress.updated, now);
        assert_eq!(progress.state(), "failed");
    }

    #[test]
    fn backups_report_their_completion_time() {
        let done = request(
            TransferKind::Backup,
            TransferStatus {
                phase: Some(Phase::Completed),
                completion_timestamp: at(12),
                ..TransferStatus::default()
            },
        );
        let progress = progress_from_request(
            &done,
            UpdatedTimestamp::for_kind(TransferKind::Backup),
            Utc::now(),
        );
        assert_eq!(Some(progress.updated), at(12));
        assert!(progress.completed);
        assert!(progress.error.is_none());
    }
}
