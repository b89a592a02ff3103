//! Operation handle codec.
//!
//! A handle is the opaque string the pipeline host persists between the call that
//! starts a transfer and every later progress query. It must survive process
//! restarts, so it encodes nothing but the request's namespace and name:
//! `"<namespace>/<name>"`.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{HandleError, HandleResult};
use crate::model::ObjectKey;

/// Separator between the namespace and name segments.
pub const HANDLE_SEPARATOR: char = '/';

/// Opaque identifier of a transfer request, safe to persist across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    /// Encodes a request identity into a handle.
    #[must_use]
    pub fn encode(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}{HANDLE_SEPARATOR}{name}"))
    }

    /// Encodes a stored key into a handle.
    #[must_use]
    pub fn for_key(key: &ObjectKey) -> Self {
        Self::encode(&key.namespace, &key.name)
    }

    /// Decodes this handle.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidOperationId`] unless the handle splits into
    /// exactly two non-empty segments.
    pub fn decode(&self) -> HandleResult<ObjectKey> {
        decode(&self.0)
    }

    /// Raw handle text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the handle and returns its text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for OperationHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OperationHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for OperationHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Decodes raw handle text into the request identity.
///
/// # Errors
///
/// Returns [`HandleError::InvalidOperationId`] for empty input, a missing
/// separator, more than one separator or an empty segment.
pub fn decode(handle: &str) -> HandleResult<ObjectKey> {
    let mut segments = handle.split(HANDLE_SEPARATOR);
    match (segments.next(), segments.next(), segments.next()) {
        (Some(namespace), Some(name), None) if !namespace.is_empty() && !name.is_empty() => {
            Ok(ObjectKey::new(namespace, name))
        }
        _ => Err(HandleError::InvalidOperationId {
            handle: handle.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_handles_decode_to_the_same_identity() -> HandleResult<()> {
        let handle = OperationHandle::encode("apps", "vsb-x7k2p");
        assert_eq!(handle.as_str(), "apps/vsb-x7k2p");
        assert_eq!(handle.decode()?, ObjectKey::new("apps", "vsb-x7k2p"));
        Ok(())
    }

    #[test]
    fn malformed_handles_are_rejected() {
        for raw in ["", "apps", "apps/", "/vsb-1", "a/b/c", "/"] {
            assert_eq!(
                decode(raw),
                Err(HandleError::InvalidOperationId {
                    handle: raw.to_string()
                }),
                "handle {raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn handles_serialize_as_plain_strings() -> Result<(), serde_json::Error> {
        let handle = OperationHandle::for_key(&ObjectKey::new("apps", "vsr-9"));
        assert_eq!(serde_json::to_string(&handle)?, "\"apps/vsr-9\"");
        let parsed: OperationHandle = serde_json::from_str("\"apps/vsr-9\"")?;
        assert_eq!(parsed, handle);
        Ok(())
    }
}
