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

//! Asynchronous operation coordinator for data mover backups and restores.
//!
//! Layout: `lifecycle.rs` (create/find/delete/wait on transfer requests),
//! `progress.rs` (progress queries by handle), `actions/` (item actions per host
//! hook), `restore_wait.rs` (concurrent restore completion waits), `registry.rs`
//! (action registry), `deps.rs` (shared collaborators), `error.rs`.

pub mod actions;
pub mod deps;
pub mod error;
pub mod lifecycle;
pub mod progress;
pub mod registry;
pub mod restore_wait;

pub use actions::{
    BackupContext, BackupExecuteOutput, BackupItemAction, DeleteItemAction, ResourceSelector,
    RestoreContext, RestoreExecuteOutput, RestoreItemAction,
};
pub use deps::CoordinatorDeps;
pub use error::{CoordinatorError, CoordinatorResult};
pub use lifecycle::{CreatePolicy, ProvisionedRequest, ResourceLifecycleManager, has_status_data};
pub use progress::{OperationProgress, ProgressReporter, UpdatedTimestamp, progress_from_request};
pub use registry::{ActionKind, PluginDescriptor, PluginRegistry};
pub use restore_wait::RestoreWaiter;
