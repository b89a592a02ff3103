//! Transfer store backed by the `VolumeSnapshotBackup` / `VolumeSnapshotRestore` resources.

use std::fmt::Debug;

use async_trait::async_trait;
use datamover_core::model::crd::{VolumeSnapshotBackup, VolumeSnapshotRestore};
use datamover_core::{
    LabelSelector, NewTransferRequest, ObjectKey, StoreError, StoreResult, TransferKind,
    TransferRequest, TransferStore,
};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::store_error;

/// Resource types that back a transfer kind.
trait TransferResource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Into<TransferRequest>
    + Send
    + Sync
    + 'static
{
}

impl TransferResource for VolumeSnapshotBackup {}
impl TransferResource for VolumeSnapshotRestore {}

/// Store that reads and writes transfer requests through the API server.
#[derive(Clone)]
pub struct KubeTransferStore {
    client: Client,
}

impl KubeTransferStore {
    /// Wraps a connected client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_as<K: TransferResource>(
        &self,
        kind: TransferKind,
        key: &ObjectKey,
    ) -> StoreResult<TransferRequest> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get(&key.name)
            .await
            .map(Into::into)
            .map_err(|err| store_error("get", kind, &key.namespace, Some(&key.name), err))
    }

    async fn list_as<K: TransferResource>(
        &self,
        kind: TransferKind,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<TransferRequest>> {
        let api: Api<K> = Api::all(self.client.clone());
        let params = ListParams::default().labels(&selector.to_string());
        let objects = api
            .list(&params)
            .await
            .map_err(|err| store_error("list", kind, "", None, err))?;
        debug!(kind = %kind, selector = %selector, found = objects.items.len(), "listed transfer requests");
        Ok(objects.items.into_iter().map(Into::into).collect())
    }

    async fn create_as<K: TransferResource>(
        &self,
        request: &NewTransferRequest,
        object: &K,
    ) -> StoreResult<TransferRequest> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &request.namespace);
        api.create(&PostParams::default(), object)
            .await
            .map(Into::into)
            .map_err(|err| store_error("create", request.kind, &request.namespace, None, err))
    }

    async fn delete_as<K: TransferResource>(
        &self,
        kind: TransferKind,
        key: &ObjectKey,
    ) -> StoreResult<()> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &key.namespace);
        api.delete(&key.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|err| store_error("delete", kind, &key.namespace, Some(&key.name), err))
    }
}

fn mismatch(kind: TransferKind, err: impl std::error::Error + Send + Sync + 'static) -> StoreError {
    StoreError::Backend {
        operation: "create",
        kind,
        source: Box::new(err),
    }
}

#[async_trait]
impl TransferStore for KubeTransferStore {
    async fn get(&self, kind: TransferKind, key: &ObjectKey) -> StoreResult<TransferRequest> {
        match kind {
            TransferKind::Backup => self.get_as::<VolumeSnapshotBackup>(kind, key).await,
            TransferKind::Restore => self.get_as::<VolumeSnapshotRestore>(kind, key).await,
        }
    }

    async fn list(
        &self,
        kind: TransferKind,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<TransferRequest>> {
        match kind {
            TransferKind::Backup => self.list_as::<VolumeSnapshotBackup>(kind, selector).await,
            TransferKind::Restore => self.list_as::<VolumeSnapshotRestore>(kind, selector).await,
        }
    }

    async fn create(&self, request: &NewTransferRequest) -> StoreResult<TransferRequest> {
        match request.kind {
            TransferKind::Backup => {
                let object = VolumeSnapshotBackup::try_from(request)
                    .map_err(|err| mismatch(request.kind, err))?;
                self.create_as(request, &object).await
            }
            TransferKind::Restore => {
                let object = VolumeSnapshotRestore::try_from(request)
                    .map_err(|err| mismatch(request.kind, err))?;
                self.create_as(request, &object).await
            }
        }
    }

    async fn delete(&self, kind: TransferKind, key: &ObjectKey) -> StoreResult<()> {
        match kind {
            TransferKind::Backup => self.delete_as::<VolumeSnapshotBackup>(kind, key).await,
            TransferKind::Restore => self.delete_as::<VolumeSnapshotRestore>(kind, key).await,
        }
    }
}
