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

//! Transfer request model and the coordination primitives shared by every data mover crate.
//!
//! Layout: `model/` (transfer requests, ownership labels, CRD wire types),
//! `handle.rs` (operation handle codec), `bridge.rs` (status annotations),
//! `reconcile.rs` (bounded poller), `service/` (store and collaborator traits),
//! `error.rs` (error taxonomy).

pub mod bridge;
pub mod error;
pub mod handle;
pub mod model;
pub mod reconcile;
pub mod service;

pub use bridge::{StatusField, StatusSnapshot};
pub use error::{
    CollaboratorError, CollaboratorResult, HandleError, HandleResult, StoreError, StoreResult,
};
pub use handle::OperationHandle;
pub use model::{
    BackupReference, Condition, LabelSelector, NewTransferRequest, ObjectKey, OperationRef,
    OwnerKey, Phase, ResourceIdentifier, SourceVolume, TransferKind, TransferRequest,
    TransferSource, TransferSpec, TransferStatus,
};
pub use reconcile::{PollError, PollResult, Poller};
pub use service::{CredentialLookup, PlaceholderClassProvisioner, SnapshotReadiness, TransferStore};
