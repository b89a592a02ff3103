//! Command handlers grouped by concern.

pub(crate) mod operations;
pub(crate) mod plugins;
pub(crate) mod restores;
