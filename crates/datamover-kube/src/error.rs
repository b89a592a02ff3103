//! Mapping of API server failures onto the store and collaborator error taxonomy.

use datamover_core::{CollaboratorError, StoreError, TransferKind};

const ALREADY_EXISTS_REASON: &str = "AlreadyExists";

fn api_code(err: &kube::Error) -> Option<(u16, &str)> {
    match err {
        kube::Error::Api(response) => Some((response.code, response.reason.as_str())),
        _ => None,
    }
}

/// The API server reported the object as missing.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(api_code(err), Some((404, _)))
}

/// The API server rejected a create because the object exists.
#[must_use]
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(api_code(err), Some((409, ALREADY_EXISTS_REASON)))
}

pub(crate) fn store_error(
    operation: &'static str,
    kind: TransferKind,
    namespace: &str,
    name: Option<&str>,
    err: kube::Error,
) -> StoreError {
    if is_not_found(&err) {
        StoreError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.unwrap_or_default().to_string(),
        }
    } else if is_already_exists(&err) {
        StoreError::AlreadyExists {
            kind,
            namespace: namespace.to_string(),
            name: name.map(str::to_string),
        }
    } else {
        StoreError::Backend {
            operation,
            kind,
            source: Box::new(err),
        }
    }
}

pub(crate) fn collaborator_error(
    operation: &'static str,
    subject: String,
    err: kube::Error,
) -> CollaboratorError {
    if is_not_found(&err) {
        CollaboratorError::NotFound { operation, subject }
    } else {
        CollaboratorError::Failed {
            operation,
            subject,
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;

    use super::*;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{reason} for test"),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn status_codes_map_onto_store_errors() {
        let missing = store_error(
            "get",
            TransferKind::Backup,
            "apps",
            Some("vsb-1"),
            api_error(404, "NotFound"),
        );
        assert!(missing.is_not_found());

        let conflict = store_error(
            "create",
            TransferKind::Restore,
            "apps",
            None,
            api_error(409, ALREADY_EXISTS_REASON),
        );
        assert!(conflict.is_already_exists());

        let stale_write = store_error(
            "create",
            TransferKind::Restore,
            "apps",
            None,
            api_error(409, "Conflict"),
        );
        assert!(matches!(stale_write, StoreError::Backend { .. }));
    }

    #[test]
    fn missing_collaborator_objects_are_not_found() {
        let err = collaborator_error(
            "get_secret",
            "openshift-adp/default-volsync-restic".into(),
            api_error(404, "NotFound"),
        );
        assert!(matches!(err, CollaboratorError::NotFound { .. }));

        let err = collaborator_error("get_secret", "x".into(), api_error(403, "Forbidden"));
        assert!(matches!(err, CollaboratorError::Failed { .. }));
    }
}
