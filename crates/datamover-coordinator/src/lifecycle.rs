//! Resource lifecycle manager for transfer requests.
//!
//! # Design
//! - Ownership is expressed purely through labels; there is no in-process lock.
//! - Concurrent creators race at the store. The loser sees `AlreadyExists`, reads
//!   the winner back by owner labels and returns it as not newly created.
//! - Deletes treat a missing object as already deleted.

use std::sync::Arc;

use datamover_core::bridge::StatusSnapshot;
use datamover_core::{
    NewTransferRequest, ObjectKey, OperationHandle, OwnerKey, PollError, Poller, StoreError,
    TransferKind, TransferRequest, TransferSpec, TransferStore,
};
use datamover_telemetry::{Metrics, PollOutcome, TransferOutcome};
use tracing::{debug, info, warn};

use crate::error::{CoordinatorError, CoordinatorResult};

/// Whether a lookup by owner precedes creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePolicy {
    /// Reuse an existing request for the same owner.
    IfAbsent,
    /// Always create; only a store-reported conflict leads to reuse.
    Always,
}

/// A transfer request handed back by the lifecycle manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedRequest {
    /// The stored request, as read back from the store.
    pub request: TransferRequest,
    /// `true` only when this call created it.
    pub created: bool,
}

impl ProvisionedRequest {
    /// Stored identity of the request.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::MissingState`] if the store returned an object
    /// without a namespace or name.
    pub fn key(&self) -> CoordinatorResult<ObjectKey> {
        self.request
            .key()
            .ok_or_else(|| CoordinatorError::MissingState {
                field: "metadata.name",
                value: self.request.metadata.generate_name.clone(),
            })
    }

    /// Handle identifying the request across restarts.
    ///
    /// # Errors
    ///
    /// See [`Self::key`].
    pub fn handle(&self) -> CoordinatorResult<OperationHandle> {
        self.key().map(|key| OperationHandle::for_key(&key))
    }
}

/// Whether a stored request already carries the status data its consumers need.
///
/// Backups need every bridged status field; restores need a phase and a snapshot handle.
#[must_use]
pub fn has_status_data(request: &TransferRequest) -> bool {
    match request.kind {
        TransferKind::Backup => StatusSnapshot::from(&request.status).is_complete(),
        TransferKind::Restore => {
            request.status.phase.is_some() && request.status.snapshot_handle.is_some()
        }
    }
}

pub(crate) const fn poll_outcome<E>(err: &PollError<E>) -> PollOutcome {
    match err {
        PollError::Timeout { .. } => PollOutcome::Timeout,
        PollError::TerminalFailure { .. } => PollOutcome::TerminalFailure,
        PollError::Fetch { .. } => PollOutcome::FetchError,
    }
}

/// Creates, finds, deletes and waits on transfer requests.
#[derive(Clone)]
pub struct ResourceLifecycleManager {
    store: Arc<dyn TransferStore>,
    poller: Poller,
    metrics: Metrics,
}

impl ResourceLifecycleManager {
    /// Builds a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TransferStore>, poller: Poller, metrics: Metrics) -> Self {
        Self {
            store,
            poller,
            metrics,
        }
    }

    /// Whether `request` was created for `owner`, judged by its labels alone.
    #[must_use]
    pub fn is_for_current_operation(request: &TransferRequest, owner: &OwnerKey) -> bool {
        request.kind == owner.kind() && owner.selector().matches(request.metadata.labels.as_ref())
    }

    /// Finds the request created for `owner`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Store`] when the list call fails.
    pub async fn find_for_owner(&self, owner: &OwnerKey) -> CoordinatorResult<Option<TransferRequest>> {
        let kind = owner.kind();
        let requests = self
            .store
            .list(kind, &owner.selector())
            .await
            .map_err(|err| {
                CoordinatorError::store("transfer_request.list", kind, owner.to_string(), err)
            })?;

        let mut found = None;
        for request in requests {
            if Self::is_for_current_operation(&request, owner) {
                if found.is_none() {
                    found = Some(request);
                }
            } else {
                debug!(
                    kind = %kind,
                    request = ?request.key(),
                    owner = %owner,
                    "ignoring transfer request owned by another operation"
                );
            }
        }
        Ok(found)
    }

    /// Creates a request for `owner` unless one already exists.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Store`] when the store fails, or
    /// [`CoordinatorError::ConflictUnresolved`] when a reported conflict cannot be
    /// read back.
    pub async fn create_if_absent(
        &self,
        owner: &OwnerKey,
        namespace: &str,
        spec: TransferSpec,
    ) -> CoordinatorResult<ProvisionedRequest> {
        if let Some(existing) = self.find_for_owner(owner).await? {
            self.metrics
                .record_transfer(owner.kind().as_str(), TransferOutcome::Adopted);
            info!(
                kind = %owner.kind(),
                request = ?existing.key(),
                owner = %owner,
                "reusing existing transfer request"
            );
            return Ok(ProvisionedRequest {
                request: existing,
                created: false,
            });
        }
        self.create(owner, namespace, spec).await
    }

    /// Creates a request for `owner` without looking for an existing one first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_if_absent`].
    pub async fn create(
        &self,
        owner: &OwnerKey,
        namespace: &str,
        spec: TransferSpec,
    ) -> CoordinatorResult<ProvisionedRequest> {
        let kind = owner.kind();
        let request = NewTransferRequest {
            kind,
            namespace: namespace.to_string(),
            generate_name: kind.name_prefix().to_string(),
            labels: owner.labels(),
            spec,
        };

        match self.store.create(&request).await {
            Ok(created) => {
                let key = created.key().ok_or_else(|| CoordinatorError::MissingState {
                    field: "metadata.name",
                    value: created.metadata.generate_name.clone(),
                })?;
                let stored = self.store.get(kind, &key).await.map_err(|err| {
                    CoordinatorError::store("transfer_request.get", kind, key.to_string(), err)
                })?;
                self.metrics
                    .record_transfer(kind.as_str(), TransferOutcome::Created);
                info!(kind = %kind, request = %key, owner = %owner, "created transfer request");
                Ok(ProvisionedRequest {
                    request: stored,
                    created: true,
                })
            }
            Err(StoreError::AlreadyExists { name, .. }) => {
                let winner = self.find_for_owner(owner).await?.ok_or_else(|| {
                    CoordinatorError::ConflictUnresolved {
                        kind,
                        owner: owner.to_string(),
                    }
                })?;
                self.metrics
                    .record_transfer(kind.as_str(), TransferOutcome::ConflictResolved);
                info!(
                    kind = %kind,
                    conflicting = ?name,
                    request = ?winner.key(),
                    owner = %owner,
                    "transfer request was created concurrently; reusing it"
                );
                Ok(ProvisionedRequest {
                    request: winner,
                    created: false,
                })
            }
            Err(err) => Err(CoordinatorError::store(
                "transfer_request.create",
                kind,
                owner.to_string(),
                err,
            )),
        }
    }

    /// Creates according to `policy`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_if_absent`].
    pub async fn provision(
        &self,
        policy: CreatePolicy,
        owner: &OwnerKey,
        namespace: &str,
        spec: TransferSpec,
    ) -> CoordinatorResult<ProvisionedRequest> {
        match policy {
            CreatePolicy::IfAbsent => self.create_if_absent(owner, namespace, spec).await,
            CreatePolicy::Always => self.create(owner, namespace, spec).await,
        }
    }

    /// Deletes every request created for `owner`; returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Store`] when listing or deleting fails for any
    /// reason other than the object already being gone.
    pub async fn delete(&self, owner: &OwnerKey) -> CoordinatorResult<usize> {
        let kind = owner.kind();
        let requests = self
            .store
            .list(kind, &owner.selector())
            .await
            .map_err(|err| {
                CoordinatorError::store("transfer_request.list", kind, owner.to_string(), err)
            })?;

        let mut deleted = 0;
        for request in requests
            .iter()
            .filter(|request| Self::is_for_current_operation(request, owner))
        {
            let Some(key) = request.key() else {
                warn!(kind = %kind, owner = %owner, "skipping transfer request without a name");
                continue;
            };
            if self.delete_request(kind, &key).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Deletes one request; `Ok(false)` when it was already gone.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Store`] for any failure other than `NotFound`.
    pub async fn delete_request(&self, kind: TransferKind, key: &ObjectKey) -> CoordinatorResult<bool> {
        match self.store.delete(kind, key).await {
            Ok(()) => {
                self.metrics.inc_deleted();
                info!(kind = %kind, request = %key, "deleted transfer request");
                Ok(true)
            }
            Err(err) if err.is_not_found() => {
                debug!(kind = %kind, request = %key, "transfer request already deleted");
                Ok(false)
            }
            Err(err) => Err(CoordinatorError::store(
                "transfer_request.delete",
                kind,
                key.to_string(),
                err,
            )),
        }
    }

    /// Polls a request until the worker has written its status data.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Poll`] on timeout, on a failed phase or
    /// `Reconciled=False/Error` condition, or when a fetch fails.
    pub async fn wait_for_status_data(
        &self,
        kind: TransferKind,
        key: &ObjectKey,
    ) -> CoordinatorResult<TransferRequest> {
        let subject = format!("{kind} {key}");
        let store = &self.store;
        let result = self
            .poller
            .wait_until(
                &subject,
                || store.get(kind, key),
                has_status_data,
                |request: &TransferRequest| request.status.has_failed(),
            )
            .await;

        match result {
            Ok(request) => {
                self.metrics.record_poll(kind.as_str(), PollOutcome::Ready);
                Ok(request)
            }
            Err(err) => {
                self.metrics.record_poll(kind.as_str(), poll_outcome(&err));
                warn!(kind = %kind, request = %key, error = %err, "waiting for status data failed");
                Err(CoordinatorError::poll("wait_for_status_data", kind, err))
            }
        }
    }
}
