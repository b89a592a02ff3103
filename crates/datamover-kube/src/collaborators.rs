//! Cluster-backed credential lookup, snapshot readiness and placeholder class provisioning.

use std::collections::BTreeMap;

use async_trait::async_trait;
use datamover_core::model::crd::VolumeSnapshotContent;
use datamover_core::{
    CollaboratorError, CollaboratorResult, CredentialLookup, PlaceholderClassProvisioner,
    PollError, Poller, ResourceIdentifier, SnapshotReadiness,
};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, PostParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{collaborator_error, is_already_exists};

/// Suffix of the repository credential secret per storage location.
pub const CREDENTIAL_SECRET_SUFFIX: &str = "volsync-restic";
/// Label marking the placeholder class as created for a pending backup.
pub const PLACEHOLDER_CLASS_LABEL: &str = "WaitVolumeSnapshotBackup";
/// Driver recorded on the placeholder class; nothing provisions from it.
pub const PLACEHOLDER_DRIVER: &str = "foo";
/// Resource name of snapshot classes.
pub const SNAPSHOT_CLASS_RESOURCE: &str = "volumesnapshotclasses.snapshot.storage.k8s.io";

/// Secret name holding repository credentials for `storage_location`.
#[must_use]
pub fn credential_secret_name(storage_location: &str) -> String {
    format!("{storage_location}-{CREDENTIAL_SECRET_SUFFIX}")
}

/// Placeholder class name for `backup_name`.
#[must_use]
pub fn placeholder_class_name(backup_name: &str) -> String {
    format!("{backup_name}-snapclass")
}

/// Finds the credential secret in the protected namespace.
#[derive(Clone)]
pub struct KubeCredentialLookup {
    client: Client,
}

impl KubeCredentialLookup {
    /// Wraps a connected client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialLookup for KubeCredentialLookup {
    async fn credential_secret(
        &self,
        storage_location: &str,
        namespace: &str,
    ) -> CollaboratorResult<String> {
        let name = credential_secret_name(storage_location);
        let subject = format!("{namespace}/{name}");
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match secrets.get_opt(&name).await {
            Ok(Some(_)) => Ok(name),
            Ok(None) => Err(CollaboratorError::NotFound {
                operation: "credential_secret",
                subject,
            }),
            Err(err) => Err(collaborator_error("credential_secret", subject, err)),
        }
    }
}

/// Polls a snapshot content until it is ready to use.
#[derive(Clone)]
pub struct KubeSnapshotReadiness {
    client: Client,
    poller: Poller,
}

impl KubeSnapshotReadiness {
    /// Wraps a connected client; `poller` bounds each wait.
    #[must_use]
    pub const fn new(client: Client, poller: Poller) -> Self {
        Self { client, poller }
    }
}

#[async_trait]
impl SnapshotReadiness for KubeSnapshotReadiness {
    async fn wait_until_ready(&self, content_name: &str) -> CollaboratorResult<bool> {
        let contents: Api<VolumeSnapshotContent> = Api::all(self.client.clone());
        let subject = format!("VolumeSnapshotContent {content_name}");
        let result = self
            .poller
            .wait_until(
                &subject,
                || contents.get(content_name),
                VolumeSnapshotContent::is_ready,
                |_: &VolumeSnapshotContent| false,
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(PollError::Timeout { .. }) => {
                warn!(content = content_name, "snapshot content did not become ready");
                Ok(false)
            }
            Err(PollError::Fetch { source, .. }) => Err(collaborator_error(
                "snapshot_content.get",
                content_name.to_string(),
                source,
            )),
            Err(err @ PollError::TerminalFailure { .. }) => Err(CollaboratorError::Failed {
                operation: "snapshot_content.wait_ready",
                subject: content_name.to_string(),
                source: Box::new(err),
            }),
        }
    }
}

/// Creates the per-backup placeholder snapshot class.
#[derive(Clone)]
pub struct KubePlaceholderClassProvisioner {
    client: Client,
}

impl KubePlaceholderClassProvisioner {
    /// Wraps a connected client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    fn snapshot_class_resource() -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(
            "snapshot.storage.k8s.io",
            "v1",
            "VolumeSnapshotClass",
        ))
    }
}

#[async_trait]
impl PlaceholderClassProvisioner for KubePlaceholderClassProvisioner {
    async fn ensure_placeholder_class(
        &self,
        backup_name: &str,
    ) -> CollaboratorResult<ResourceIdentifier> {
        let name = placeholder_class_name(backup_name);
        let resource = Self::snapshot_class_resource();
        let classes: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        let mut class = DynamicObject::new(&name, &resource).data(json!({
            "driver": PLACEHOLDER_DRIVER,
            "deletionPolicy": "Retain",
        }));
        class.metadata.labels = Some(BTreeMap::from([(
            PLACEHOLDER_CLASS_LABEL.to_string(),
            "true".to_string(),
        )]));

        match classes.create(&PostParams::default(), &class).await {
            Ok(_) => info!(class = %name, backup = backup_name, "created placeholder snapshot class"),
            Err(err) if is_already_exists(&err) => {
                debug!(class = %name, "placeholder snapshot class already exists");
            }
            Err(err) => return Err(collaborator_error("placeholder_class.create", name, err)),
        }

        Ok(ResourceIdentifier {
            group_resource: SNAPSHOT_CLASS_RESOURCE.to_string(),
            namespace: None,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_storage_location_and_backup() {
        assert_eq!(credential_secret_name("default"), "default-volsync-restic");
        assert_eq!(placeholder_class_name("nightly"), "nightly-snapclass");
    }

    #[test]
    fn placeholder_class_targets_snapshot_classes() {
        let resource = KubePlaceholderClassProvisioner::snapshot_class_resource();
        assert_eq!(resource.plural, "volumesnapshotclasses");
        assert_eq!(resource.api_version, "snapshot.storage.k8s.io/v1");
        assert_eq!(
            SNAPSHOT_CLASS_RESOURCE,
            format!("{}.{}", resource.plural, resource.group)
        );
    }
}
