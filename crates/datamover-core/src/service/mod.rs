//! Traits at the seams between the coordinator and the cluster.

use async_trait::async_trait;

use crate::error::{CollaboratorResult, StoreResult};
use crate::model::{
    LabelSelector, NewTransferRequest, ObjectKey, ResourceIdentifier, TransferKind,
    TransferRequest,
};

/// Durable, remotely reconciled store of transfer requests.
///
/// Implementations must report [`crate::StoreError::NotFound`] for missing objects
/// and [`crate::StoreError::AlreadyExists`] for create conflicts.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Fetches one request by identity.
    async fn get(&self, kind: TransferKind, key: &ObjectKey) -> StoreResult<TransferRequest>;

    /// Lists requests of one kind whose labels match `selector`, across namespaces.
    async fn list(
        &self,
        kind: TransferKind,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<TransferRequest>>;

    /// Creates a request; the store generates the final name from the prefix.
    async fn create(&self, request: &NewTransferRequest) -> StoreResult<TransferRequest>;

    /// Deletes one request by identity.
    async fn delete(&self, kind: TransferKind, key: &ObjectKey) -> StoreResult<()>;
}

/// Resolves the repository credential secret for a storage location.
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    /// Returns the name of an existing secret for `storage_location` in `namespace`.
    async fn credential_secret(
        &self,
        storage_location: &str,
        namespace: &str,
    ) -> CollaboratorResult<String>;
}

/// Waits for a snapshot content to become usable.
#[async_trait]
pub trait SnapshotReadiness: Send + Sync {
    /// Resolves to `true` once the content is ready with a snapshot handle.
    async fn wait_until_ready(&self, content_name: &str) -> CollaboratorResult<bool>;
}

/// Provisions the placeholder snapshot class carried along with a backup.
#[async_trait]
pub trait PlaceholderClassProvisioner: Send + Sync {
    /// Ensures the class for `backup_name` exists and returns its identity.
    ///
    /// An existing class is not an error.
    async fn ensure_placeholder_class(
        &self,
        backup_name: &str,
    ) -> CollaboratorResult<ResourceIdentifier>;
}
