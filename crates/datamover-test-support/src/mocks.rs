//! In-memory fakes for the store and collaborator traits.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use datamover_core::{
    CollaboratorError, CollaboratorResult, CredentialLookup, LabelSelector, NewTransferRequest,
    ObjectKey, Phase, PlaceholderClassProvisioner, ResourceIdentifier, SnapshotReadiness,
    StoreError, StoreResult, TransferKind, TransferRequest, TransferStatus, TransferStore,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<(TransferKind, ObjectKey), TransferRequest>,
    next_id: u64,
    create_calls: usize,
    get_calls: usize,
    list_calls: usize,
    failing_gets: usize,
    failing_lists: usize,
}

/// Transfer store backed by a map, shared between clones.
///
/// Lists read their snapshot before yielding to the scheduler, so two concurrent
/// callers can both observe "nothing there yet", which is what a real API server
/// allows. With [`Self::with_unique_owners`] the store rejects a second request
/// carrying the same labels, standing in for a uniqueness check in the backend.
#[derive(Clone, Default)]
pub struct MemoryTransferStore {
    state: Arc<Mutex<StoreState>>,
    unique_owners: bool,
}

impl MemoryTransferStore {
    /// Empty store that accepts every create.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store that reports `AlreadyExists` for a second request with the same labels.
    #[must_use]
    pub fn with_unique_owners() -> Self {
        Self {
            unique_owners: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a request as-is; it must carry a namespace and name.
    pub fn insert(&self, request: TransferRequest) {
        if let Some(key) = request.key() {
            self.lock().objects.insert((request.kind, key), request);
        }
    }

    /// Applies `update` to a stored request's status, as the transfer worker would.
    ///
    /// Returns `false` when the request does not exist.
    pub fn update_status(
        &self,
        kind: TransferKind,
        key: &ObjectKey,
        update: impl FnOnce(&mut TransferStatus),
    ) -> bool {
        let mut state = self.lock();
        match state.objects.get_mut(&(kind, key.clone())) {
            Some(request) => {
                update(&mut request.status);
                true
            }
            None => false,
        }
    }

    /// Sets the phase of a stored request.
    pub fn set_phase(&self, kind: TransferKind, key: &ObjectKey, phase: Phase) -> bool {
        self.update_status(kind, key, |status| {
            status.phase = Some(phase);
            status.reported_phase = Some(phase.as_str().to_string());
        })
    }

    /// Removes a stored request behind the coordinator's back.
    pub fn remove(&self, kind: TransferKind, key: &ObjectKey) -> bool {
        self.lock().objects.remove(&(kind, key.clone())).is_some()
    }

    /// Every stored request of one kind.
    #[must_use]
    pub fn requests(&self, kind: TransferKind) -> Vec<TransferRequest> {
        self.lock()
            .objects
            .iter()
            .filter(|((stored_kind, _), _)| *stored_kind == kind)
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// Number of stored requests of one kind.
    #[must_use]
    pub fn count(&self, kind: TransferKind) -> usize {
        self.requests(kind).len()
    }

    /// Number of `create` calls, successful or not.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Number of `get` calls.
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.lock().get_calls
    }

    /// Number of `list` calls.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Makes the next `count` gets fail with a backend error.
    pub fn fail_next_gets(&self, count: usize) {
        self.lock().failing_gets = count;
    }

    /// Makes the next `count` lists fail with a backend error.
    pub fn fail_next_lists(&self, count: usize) {
        self.lock().failing_lists = count;
    }
}

fn injected(operation: &'static str, kind: TransferKind) -> StoreError {
    StoreError::Backend {
        operation,
        kind,
        source: Box::new(io::Error::other("injected store failure")),
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    async fn get(&self, kind: TransferKind, key: &ObjectKey) -> StoreResult<TransferRequest> {
        let mut state = self.lock();
        state.get_calls += 1;
        if state.failing_gets > 0 {
            state.failing_gets -= 1;
            return Err(injected("get", kind));
        }
        state
            .objects
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind,
                namespace: key.namespace.clone(),
                name: key.name.clone(),
            })
    }

    async fn list(
        &self,
        kind: TransferKind,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<TransferRequest>> {
        let snapshot = {
            let mut state = self.lock();
            state.list_calls += 1;
            if state.failing_lists > 0 {
                state.failing_lists -= 1;
                return Err(injected("list", kind));
            }
            state
                .objects
                .iter()
                .filter(|((stored_kind, _), request)| {
                    *stored_kind == kind && selector.matches(request.metadata.labels.as_ref())
                })
                .map(|(_, request)| request.clone())
                .collect::<Vec<_>>()
        };
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn create(&self, request: &NewTransferRequest) -> StoreResult<TransferRequest> {
        let mut state = self.lock();
        state.create_calls += 1;

        if self.unique_owners {
            let conflict = state.objects.iter().find(|((kind, key), stored)| {
                *kind == request.kind
                    && key.namespace == request.namespace
                    && stored.metadata.labels.as_ref() == Some(&request.labels)
            });
            if let Some(((_, key), _)) = conflict {
                return Err(StoreError::AlreadyExists {
                    kind: request.kind,
                    namespace: request.namespace.clone(),
                    name: Some(key.name.clone()),
                });
            }
        }

        state.next_id += 1;
        let name = format!("{}{:05x}", request.generate_name, state.next_id);
        let key = ObjectKey::new(request.namespace.clone(), name.clone());
        let stored = TransferRequest {
            kind: request.kind,
            metadata: ObjectMeta {
                name: Some(name),
                creation_timestamp: Some(Time(Utc::now())),
                ..request.metadata()
            },
            spec: request.spec.clone(),
            status: TransferStatus::default(),
        };
        state.objects.insert((request.kind, key), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, kind: TransferKind, key: &ObjectKey) -> StoreResult<()> {
        self.lock()
            .objects
            .remove(&(kind, key.clone()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind,
                namespace: key.namespace.clone(),
                name: key.name.clone(),
            })
    }
}

/// Credential lookup that knows a fixed set of secret names.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    known: Vec<String>,
}

impl StaticCredentials {
    /// Lookup that finds `<location>-volsync-restic` for each listed location.
    #[must_use]
    pub fn for_locations(locations: &[&str]) -> Self {
        Self {
            known: locations
                .iter()
                .map(|location| format!("{location}-volsync-restic"))
                .collect(),
        }
    }
}

#[async_trait]
impl CredentialLookup for StaticCredentials {
    async fn credential_secret(
        &self,
        storage_location: &str,
        namespace: &str,
    ) -> CollaboratorResult<String> {
        let name = format!("{storage_location}-volsync-restic");
        if self.known.contains(&name) {
            Ok(name)
        } else {
            Err(CollaboratorError::NotFound {
                operation: "credential_secret",
                subject: format!("{namespace}/{name}"),
            })
        }
    }
}

/// Readiness check with a fixed answer that records what it was asked about.
#[derive(Debug, Clone, Default)]
pub struct FixedReadiness {
    ready: bool,
    asked: Arc<Mutex<Vec<String>>>,
}

impl FixedReadiness {
    /// Readiness that always reports `ready`.
    #[must_use]
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            asked: Arc::default(),
        }
    }

    /// Content names passed to [`SnapshotReadiness::wait_until_ready`].
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SnapshotReadiness for FixedReadiness {
    async fn wait_until_ready(&self, content_name: &str) -> CollaboratorResult<bool> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(content_name.to_string());
        Ok(self.ready)
    }
}

/// Placeholder provisioner that records each backup it provisioned for.
#[derive(Debug, Clone, Default)]
pub struct RecordingPlaceholders {
    provisioned: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlaceholders {
    /// Backup names in call order.
    #[must_use]
    pub fn provisioned(&self) -> Vec<String> {
        self.provisioned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PlaceholderClassProvisioner for RecordingPlaceholders {
    async fn ensure_placeholder_class(
        &self,
        backup_name: &str,
    ) -> CollaboratorResult<ResourceIdentifier> {
        self.provisioned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(backup_name.to_string());
        Ok(ResourceIdentifier {
            group_resource: "volumesnapshotclasses.snapshot.storage.k8s.io".to_string(),
            namespace: None,
            name: format!("{backup_name}-snapclass"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use datamover_core::{TransferSource, TransferSpec};

    use super::*;

    fn new_request(labels: &[(&str, &str)]) -> NewTransferRequest {
        NewTransferRequest {
            kind: TransferKind::Backup,
            namespace: "apps".into(),
            generate_name: "vsb-".into(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            spec: TransferSpec {
                source: TransferSource::SnapshotContent {
                    name: "snapcontent-1".into(),
                },
                credential_secret: "default-volsync-restic".into(),
                protected_namespace: "openshift-adp".into(),
            },
        }
    }

    #[tokio::test]
    async fn created_requests_get_generated_names() -> StoreResult<()> {
        let store = MemoryTransferStore::new();
        let first = store.create(&new_request(&[("a", "1")])).await?;
        let second = store.create(&new_request(&[("a", "1")])).await?;

        assert_ne!(first.key(), second.key());
        assert!(first.metadata.name.as_deref().is_some_and(|n| n.starts_with("vsb-")));
        assert_eq!(store.count(TransferKind::Backup), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unique_owner_store_rejects_duplicates() -> StoreResult<()> {
        let store = MemoryTransferStore::with_unique_owners();
        store.create(&new_request(&[("a", "1")])).await?;
        let duplicate = store.create(&new_request(&[("a", "1")])).await;
        assert!(duplicate.as_ref().is_err_and(StoreError::is_already_exists));

        store.create(&new_request(&[("a", "2")])).await?;
        assert_eq!(store.create_calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() -> StoreResult<()> {
        let store = MemoryTransferStore::new();
        let created = store.create(&new_request(&[])).await?;
        let key = created.key().ok_or_else(|| injected("key", TransferKind::Backup))?;

        store.fail_next_gets(1);
        assert!(store.get(TransferKind::Backup, &key).await.is_err());
        assert!(store.get(TransferKind::Backup, &key).await.is_ok());

        store.delete(TransferKind::Backup, &key).await?;
        let missing = store.get(TransferKind::Backup, &key).await;
        assert!(missing.as_ref().is_err_and(StoreError::is_not_found));
        Ok(())
    }
}
