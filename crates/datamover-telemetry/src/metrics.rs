//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Labels are closed enums so cardinality stays bounded.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// How a create-if-absent call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// A new request was created.
    Created,
    /// An existing request for the same operation was reused.
    Adopted,
    /// A concurrent create won and its request was read back.
    ConflictResolved,
}

impl TransferOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Adopted => "adopted",
            Self::ConflictResolved => "conflict_resolved",
        }
    }
}

/// How a reconciliation poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The object became ready.
    Ready,
    /// The budget elapsed.
    Timeout,
    /// The object reported a terminal failure.
    TerminalFailure,
    /// Fetching the object failed.
    FetchError,
}

impl PollOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Timeout => "timeout",
            Self::TerminalFailure => "terminal_failure",
            Self::FetchError => "fetch_error",
        }
    }
}

/// Prometheus-backed metrics registry shared across the coordinator.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

struct MetricsInner {
    registry: Registry,
    transfer_requests_total: IntCounterVec,
    transfer_requests_deleted_total: IntCounter,
    reconcile_polls_total: IntCounterVec,
    progress_queries_total: IntCounterVec,
}

/// Snapshot of selected counters for health reporting and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests created.
    pub transfer_requests_created: u64,
    /// Existing requests reused.
    pub transfer_requests_adopted: u64,
    /// Create conflicts resolved by reading back the winner.
    pub transfer_conflicts_resolved: u64,
    /// Requests deleted.
    pub transfer_requests_deleted: u64,
    /// Polls that ran out of time.
    pub reconcile_timeouts: u64,
    /// Polls that ended on a terminal failure.
    pub reconcile_terminal_failures: u64,
}

fn collector_error(name: &'static str) -> impl FnOnce(prometheus::Error) -> TelemetryError {
    move |source| TelemetryError::MetricsCollector { name, source }
}

fn register_error(name: &'static str) -> impl FnOnce(prometheus::Error) -> TelemetryError {
    move |source| TelemetryError::MetricsRegister { name, source }
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let transfer_requests_total = IntCounterVec::new(
            Opts::new(
                "datamover_transfer_requests_total",
                "Transfer request create-if-absent outcomes by kind",
            ),
            &["kind", "outcome"],
        )
        .map_err(collector_error("datamover_transfer_requests_total"))?;
        let transfer_requests_deleted_total = IntCounter::with_opts(Opts::new(
            "datamover_transfer_requests_deleted_total",
            "Transfer requests deleted",
        ))
        .map_err(collector_error("datamover_transfer_requests_deleted_total"))?;
        let reconcile_polls_total = IntCounterVec::new(
            Opts::new(
                "datamover_reconcile_polls_total",
                "Reconciliation polls by subject kind and outcome",
            ),
            &["kind", "outcome"],
        )
        .map_err(collector_error("datamover_reconcile_polls_total"))?;
        let progress_queries_total = IntCounterVec::new(
            Opts::new(
                "datamover_progress_queries_total",
                "Progress queries by kind and reported state",
            ),
            &["kind", "state"],
        )
        .map_err(collector_error("datamover_progress_queries_total"))?;

        registry
            .register(Box::new(transfer_requests_total.clone()))
            .map_err(register_error("datamover_transfer_requests_total"))?;
        registry
            .register(Box::new(transfer_requests_deleted_total.clone()))
            .map_err(register_error("datamover_transfer_requests_deleted_total"))?;
        registry
            .register(Box::new(reconcile_polls_total.clone()))
            .map_err(register_error("datamover_reconcile_polls_total"))?;
        registry
            .register(Box::new(progress_queries_total.clone()))
            .map_err(register_error("datamover_progress_queries_total"))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                transfer_requests_total,
                transfer_requests_deleted_total,
                reconcile_polls_total,
                progress_queries_total,
            }),
        })
    }

    /// Record how a create-if-absent call resolved.
    pub fn record_transfer(&self, kind: &str, outcome: TransferOutcome) {
        self.inner
            .transfer_requests_total
            .with_label_values(&[kind, outcome.as_str()])
            .inc();
    }

    /// Record a deleted transfer request.
    pub fn inc_deleted(&self) {
        self.inner.transfer_requests_deleted_total.inc();
    }

    /// Record how a reconciliation poll ended.
    pub fn record_poll(&self, kind: &str, outcome: PollOutcome) {
        self.inner
            .reconcile_polls_total
            .with_label_values(&[kind, outcome.as_str()])
            .inc();
    }

    /// Record a progress query and the state it reported.
    pub fn record_progress(&self, kind: &str, state: &str) {
        self.inner
            .progress_queries_total
            .with_label_values(&[kind, state])
            .inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Capture the current counter values, summed across kinds.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let transfers = |outcome: TransferOutcome| {
            Self::sum_over_kinds(&self.inner.transfer_requests_total, outcome.as_str())
        };
        let polls = |outcome: PollOutcome| {
            Self::sum_over_kinds(&self.inner.reconcile_polls_total, outcome.as_str())
        };
        MetricsSnapshot {
            transfer_requests_created: transfers(TransferOutcome::Created),
            transfer_requests_adopted: transfers(TransferOutcome::Adopted),
            transfer_conflicts_resolved: transfers(TransferOutcome::ConflictResolved),
            transfer_requests_deleted: self.inner.transfer_requests_deleted_total.get(),
            reconcile_timeouts: polls(PollOutcome::Timeout),
            reconcile_terminal_failures: polls(PollOutcome::TerminalFailure),
        }
    }

    fn sum_over_kinds(counter: &IntCounterVec, outcome: &str) -> u64 {
        ["backup", "restore"]
            .into_iter()
            .map(|kind| counter.with_label_values(&[kind, outcome]).get())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_feed_the_snapshot() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.record_transfer("backup", TransferOutcome::Created);
        metrics.record_transfer("restore", TransferOutcome::Created);
        metrics.record_transfer("backup", TransferOutcome::ConflictResolved);
        metrics.record_poll("restore", PollOutcome::Timeout);
        metrics.inc_deleted();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.transfer_requests_created, 2);
        assert_eq!(snapshot.transfer_conflicts_resolved, 1);
        assert_eq!(snapshot.transfer_requests_adopted, 0);
        assert_eq!(snapshot.reconcile_timeouts, 1);
        assert_eq!(snapshot.transfer_requests_deleted, 1);
        Ok(())
    }

    #[test]
    fn render_emits_prometheus_text() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.record_progress("backup", "completed");
        let rendered = metrics.render()?;
        assert!(rendered.contains("datamover_progress_queries_total"));
        assert!(rendered.contains("state=\"completed\""));
        Ok(())
    }
}
