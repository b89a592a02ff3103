//! # Design
//!
//! - One error type for every coordinator entry point.
//! - Messages are constant; the failing operation and the resource identity travel
//!   in fields so logs and callers can report them.
//! - Store, poll and collaborator failures are kept as `source`.

use datamover_core::{CollaboratorError, HandleError, PollError, StoreError, TransferKind};
use thiserror::Error;

/// Result alias for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Coordinator-level error type.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// An operation handle could not be decoded.
    #[error("invalid operation id")]
    InvalidOperationId {
        /// Operation identifier.
        operation: &'static str,
        /// Source codec error.
        source: HandleError,
    },
    /// A transfer store call failed.
    #[error("transfer store operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Transfer request family.
        kind: TransferKind,
        /// `namespace/name`, owner selector or handle the call was about.
        resource: String,
        /// Source store error.
        source: StoreError,
    },
    /// Waiting for reconciliation failed.
    #[error("reconciliation wait failed")]
    Poll {
        /// Operation identifier.
        operation: &'static str,
        /// Transfer request family.
        kind: TransferKind,
        /// Source poll error.
        source: PollError<StoreError>,
    },
    /// A credential, readiness or placeholder collaborator failed.
    #[error("collaborator operation failed")]
    Collaborator {
        /// Operation identifier.
        operation: &'static str,
        /// Source collaborator error.
        source: CollaboratorError,
    },
    /// An item handed over by the pipeline could not be decoded or re-encoded.
    #[error("item conversion failed")]
    Item {
        /// Operation identifier.
        operation: &'static str,
        /// Resource kind of the item.
        resource: &'static str,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// Required state was missing from an item or stored object.
    #[error("missing state")]
    MissingState {
        /// State field that was missing.
        field: &'static str,
        /// Optional value associated with the missing state.
        value: Option<String>,
    },
    /// A create conflict was reported but no matching request could be read back.
    #[error("create conflict could not be resolved")]
    ConflictUnresolved {
        /// Transfer request family.
        kind: TransferKind,
        /// Owner selector used for the read-back.
        owner: String,
    },
    /// A concurrent wait task panicked or was aborted.
    #[error("wait task failed")]
    WaitTask {
        /// Source join error.
        source: tokio::task::JoinError,
    },
    /// The action does not implement the requested operation.
    #[error("operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
}

impl CoordinatorError {
    pub(crate) fn store(
        operation: &'static str,
        kind: TransferKind,
        resource: impl Into<String>,
        source: StoreError,
    ) -> Self {
        Self::Store {
            operation,
            kind,
            resource: resource.into(),
            source,
        }
    }

    pub(crate) const fn poll(
        operation: &'static str,
        kind: TransferKind,
        source: PollError<StoreError>,
    ) -> Self {
        Self::Poll {
            operation,
            kind,
            source,
        }
    }

    pub(crate) const fn collaborator(operation: &'static str, source: CollaboratorError) -> Self {
        Self::Collaborator { operation, source }
    }

    pub(crate) const fn item(
        operation: &'static str,
        resource: &'static str,
        source: serde_json::Error,
    ) -> Self {
        Self::Item {
            operation,
            resource,
            source,
        }
    }

    /// The addressed transfer request does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store { source, .. } => source.is_not_found(),
            Self::Poll { source, .. } => source.fetch_error().is_some_and(StoreError::is_not_found),
            _ => false,
        }
    }

    /// A reconciliation wait ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Poll { source, .. } if source.is_timeout())
    }

    /// A reconciliation wait stopped on a failed transfer.
    #[must_use]
    pub const fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Poll { source, .. } if source.is_terminal_failure())
    }

    /// The supplied handle was malformed.
    #[must_use]
    pub const fn is_invalid_operation_id(&self) -> bool {
        matches!(self, Self::InvalidOperationId { .. })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io;
    use std::time::Duration;

    use super::*;

    #[test]
    fn predicates_see_through_wrapping() {
        let missing = CoordinatorError::store(
            "progress.get",
            TransferKind::Backup,
            "apps/vsb-1",
            StoreError::NotFound {
                kind: TransferKind::Backup,
                namespace: "apps".into(),
                name: "vsb-1".into(),
            },
        );
        assert!(missing.is_not_found());
        assert!(missing.source().is_some());

        let timeout = CoordinatorError::poll(
            "wait_for_status_data",
            TransferKind::Backup,
            PollError::Timeout {
                subject: "apps/vsb-1".into(),
                timeout: Duration::from_secs(600),
            },
        );
        assert!(timeout.is_timeout());
        assert!(!timeout.is_not_found());

        let failed = CoordinatorError::poll(
            "wait_for_restores",
            TransferKind::Restore,
            PollError::TerminalFailure {
                subject: "apps/vsr-1".into(),
            },
        );
        assert!(failed.is_terminal_failure());
    }

    #[test]
    fn invalid_handle_is_reported_with_source() {
        let err = CoordinatorError::InvalidOperationId {
            operation: "progress",
            source: HandleError::InvalidOperationId {
                handle: "apps".into(),
            },
        };
        assert!(err.is_invalid_operation_id());
        assert_eq!(err.to_string(), "invalid operation id");
        assert!(err.source().is_some());

        let collaborator = CoordinatorError::collaborator(
            "credential_secret",
            CollaboratorError::Failed {
                operation: "get_secret",
                subject: "openshift-adp/default-volsync-restic".into(),
                source: Box::new(io::Error::other("forbidden")),
            },
        );
        assert!(collaborator.source().is_some());
        assert!(!collaborator.is_invalid_operation_id());
    }
}
