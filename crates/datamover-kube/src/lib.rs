#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, unused)]
#![allow(clippy::module_name_repetitions)]

//! Cluster-backed implementations of the coordinator's store and collaborator traits.
//!
//! Layout: `store.rs` (transfer requests), `collaborators.rs` (secrets, snapshot
//! contents, placeholder snapshot classes), `error.rs` (API error mapping).

pub mod collaborators;
pub mod error;
pub mod store;

pub use collaborators::{
    KubeCredentialLookup, KubePlaceholderClassProvisioner, KubeSnapshotReadiness,
};
pub use error::{is_already_exists, is_not_found};
pub use store::KubeTransferStore;

/// Connects with the ambient kubeconfig or in-cluster service account.
///
/// # Errors
///
/// Returns the client error when no configuration can be inferred.
pub async fn connect() -> Result<kube::Client, kube::Error> {
    kube::Client::try_default().await
}
