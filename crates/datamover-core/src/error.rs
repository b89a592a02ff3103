//! Error types shared by the handle codec, the transfer store and its collaborators.
//!
//! # Design
//! - Messages are constant; identifying context lives in fields.
//! - Store failures distinguish `NotFound` and `AlreadyExists` so callers can treat
//!   them as benign outcomes instead of failures.
//! - Backend failures keep the underlying error as `source`.

use std::error::Error;

use thiserror::Error;

use crate::model::TransferKind;

/// Errors raised while decoding an operation handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    /// The handle is empty or does not split into exactly two non-empty segments.
    #[error("invalid operation id")]
    InvalidOperationId {
        /// Handle as supplied by the caller.
        handle: String,
    },
}

/// Convenience alias for handle codec results.
pub type HandleResult<T> = Result<T, HandleError>;

/// Errors raised by a [`crate::service::TransferStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed transfer request does not exist.
    #[error("transfer request not found")]
    NotFound {
        /// Transfer request family.
        kind: TransferKind,
        /// Namespace that was searched.
        namespace: String,
        /// Name that was searched.
        name: String,
    },
    /// A conflicting transfer request already exists.
    #[error("transfer request already exists")]
    AlreadyExists {
        /// Transfer request family.
        kind: TransferKind,
        /// Namespace of the rejected create.
        namespace: String,
        /// Name of the conflicting object when the backend reports it.
        name: Option<String>,
    },
    /// The backend failed for any other reason.
    #[error("transfer store operation failed")]
    Backend {
        /// Store operation identifier.
        operation: &'static str,
        /// Transfer request family.
        kind: TransferKind,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StoreError {
    /// Returns `true` when the error reports a missing object.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the error reports a create conflict.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Convenience alias for transfer store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the credential, readiness and placeholder collaborators.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator could not find the object it was asked about.
    #[error("collaborator object not found")]
    NotFound {
        /// Collaborator operation identifier.
        operation: &'static str,
        /// Object the collaborator looked for.
        subject: String,
    },
    /// The collaborator failed.
    #[error("collaborator operation failed")]
    Failed {
        /// Collaborator operation identifier.
        operation: &'static str,
        /// Object the collaborator worked on.
        subject: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Convenience alias for collaborator results.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn store_error_predicates_match_variants() {
        let missing = StoreError::NotFound {
            kind: TransferKind::Backup,
            namespace: "apps".into(),
            name: "vsb-1".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_already_exists());

        let conflict = StoreError::AlreadyExists {
            kind: TransferKind::Restore,
            namespace: "apps".into(),
            name: None,
        };
        assert!(conflict.is_already_exists());
        assert!(!conflict.is_not_found());
    }

    #[test]
    fn backend_errors_keep_their_source() {
        let err = StoreError::Backend {
            operation: "list",
            kind: TransferKind::Backup,
            source: Box::new(io::Error::other("connection reset")),
        };
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "transfer store operation failed");

        let collaborator = CollaboratorError::Failed {
            operation: "credential_secret",
            subject: "default-volsync-restic".into(),
            source: Box::new(io::Error::other("forbidden")),
        };
        assert!(collaborator.source().is_some());
    }
}
