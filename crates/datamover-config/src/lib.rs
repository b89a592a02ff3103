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

//! Environment-backed configuration for the data mover coordinator.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (environment sources and the
//! loader), `validate.rs` (parsing helpers), `defaults.rs` (variable names and
//! default values), `error.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{EnvSource, ProcessEnv, load_from_env, load_with};
pub use model::{DataMoverConfig, DataMoverMode, PollSettings, TrackingMode};
