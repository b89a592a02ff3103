//! Waits for the restore transfers started by one restore.
//!
//! # Design
//! - One poller per transfer request, run concurrently on a `JoinSet`.
//! - A failing wait never cancels its siblings; the first error is reported once
//!   every wait has finished.

use std::sync::Arc;

use datamover_core::{
    LabelSelector, ObjectKey, OperationRef, OwnerKey, Phase, PollResult, Poller, StoreError,
    TransferKind, TransferRequest, TransferStore,
};
use datamover_telemetry::{Metrics, PollOutcome};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::lifecycle::poll_outcome;

fn restore_finished(request: &TransferRequest) -> bool {
    request.status.phase == Some(Phase::Completed) && request.status.snapshot_handle.is_some()
}

fn restore_has_status_data(request: &TransferRequest) -> bool {
    request.status.phase.is_some() && request.status.snapshot_handle.is_some()
}

/// Waits on restore transfer requests by restore name.
#[derive(Clone)]
pub struct RestoreWaiter {
    store: Arc<dyn TransferStore>,
    poller: Poller,
    metrics: Metrics,
}

impl RestoreWaiter {
    /// Builds a waiter over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TransferStore>, poller: Poller, metrics: Metrics) -> Self {
        Self {
            store,
            poller,
            metrics,
        }
    }

    /// Waits until every restore transfer of `restore_name` completed; returns how many
    /// were waited on.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Store`] when the initial list fails, otherwise the
    /// first wait error observed once all waits have finished.
    pub async fn wait_for_restores(&self, restore_name: &str) -> CoordinatorResult<usize> {
        let operation = OperationRef::restore(restore_name);
        let selector = LabelSelector::single(operation.label_key(), operation.label_value());
        let requests = self
            .store
            .list(TransferKind::Restore, &selector)
            .await
            .map_err(|err| {
                CoordinatorError::store(
                    "wait_for_restores.list",
                    TransferKind::Restore,
                    selector.to_string(),
                    err,
                )
            })?;

        let mut waits = JoinSet::new();
        for key in requests.iter().filter_map(TransferRequest::key) {
            let waiter = self.clone();
            waits.spawn(async move { waiter.wait_for_completion(key).await });
        }
        let waited = waits.len();
        info!(restore = restore_name, waited, "waiting for restore transfers");

        let mut first_error = None;
        while let Some(joined) = waits.join_next().await {
            let outcome = joined
                .map_err(|source| CoordinatorError::WaitTask { source })
                .and_then(|result| result);
            if let Err(err) = outcome {
                warn!(restore = restore_name, error = %err, "restore transfer did not complete");
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(waited), Err)
    }

    async fn wait_for_completion(&self, key: ObjectKey) -> CoordinatorResult<TransferRequest> {
        let subject = format!("{} {key}", TransferKind::Restore);
        let store = &self.store;
        let result = self
            .poller
            .wait_until(
                &subject,
                || store.get(TransferKind::Restore, &key),
                restore_finished,
                |request: &TransferRequest| request.status.has_failed(),
            )
            .await;
        self.finish("wait_for_restores", result)
    }

    /// Waits until the restore transfer for `source_volume` reports a phase and a
    /// snapshot handle.
    ///
    /// Resolves to `None` when no such transfer has been listed yet.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Poll`] on timeout, failure or a failed list.
    pub async fn wait_for_restore_status_data(
        &self,
        restore_name: &str,
        source_volume: &str,
    ) -> CoordinatorResult<Option<TransferRequest>> {
        let owner = OwnerKey::new(OperationRef::restore(restore_name), source_volume);
        let selector = owner.selector();
        let subject = format!("{} {owner}", TransferKind::Restore);
        let store = &self.store;
        let result = self
            .poller
            .wait_until(
                &subject,
                || store.list(TransferKind::Restore, &selector),
                |requests: &Vec<TransferRequest>| {
                    requests.first().is_none_or(restore_has_status_data)
                },
                |requests: &Vec<TransferRequest>| {
                    requests.iter().any(|request| request.status.has_failed())
                },
            )
            .await;
        self.finish("wait_for_restore_status_data", result)
            .map(|requests| requests.into_iter().next())
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        result: PollResult<T, StoreError>,
    ) -> CoordinatorResult<T> {
        let kind = TransferKind::Restore;
        match result {
            Ok(value) => {
                self.metrics.record_poll(kind.as_str(), PollOutcome::Ready);
                Ok(value)
            }
            Err(err) => {
                self.metrics.record_poll(kind.as_str(), poll_outcome(&err));
                Err(CoordinatorError::poll(operation, kind, err))
            }
        }
    }
}
