//! Ownership labels linking transfer requests to the operation and source object.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::TransferKind;

/// Label carrying the owning backup name.
pub const BACKUP_NAME_LABEL: &str = "velero.io/backup-name";
/// Label carrying the owning restore name.
pub const RESTORE_NAME_LABEL: &str = "velero.io/restore-name";
/// Label carrying the source object name.
pub const SOURCE_LABEL: &str = "datamover.oadp.openshift.io/source";
/// Longest value a label may hold.
pub const LABEL_VALUE_MAX_LENGTH: usize = 63;

const TRUNCATED_PREFIX_LENGTH: usize = 57;
const DIGEST_SUFFIX_LENGTH: usize = 6;

/// Normalises a value so it fits in a label.
///
/// Values that already fit are returned unchanged. Longer values keep at most their
/// first 57 bytes, cut on a character boundary, followed by the first six hex digits of their SHA-256 digest, so
/// distinct long names stay distinct with high probability.
#[must_use]
pub fn valid_label_value(value: &str) -> String {
    if value.len() <= LABEL_VALUE_MAX_LENGTH {
        return value.to_string();
    }
    let digest = format!("{:x}", Sha256::digest(value.as_bytes()));
    let mut end = TRUNCATED_PREFIX_LENGTH;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &value[..end], &digest[..DIGEST_SUFFIX_LENGTH])
}

/// The backup or restore on whose behalf a transfer request exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationRef {
    /// Which transfer family the operation creates.
    pub kind: TransferKind,
    /// Backup or restore name.
    pub name: String,
}

impl OperationRef {
    /// Reference to a backup.
    #[must_use]
    pub fn backup(name: impl Into<String>) -> Self {
        Self {
            kind: TransferKind::Backup,
            name: name.into(),
        }
    }

    /// Reference to a restore.
    #[must_use]
    pub fn restore(name: impl Into<String>) -> Self {
        Self {
            kind: TransferKind::Restore,
            name: name.into(),
        }
    }

    /// Label key that records this operation.
    #[must_use]
    pub const fn label_key(&self) -> &'static str {
        match self.kind {
            TransferKind::Backup => BACKUP_NAME_LABEL,
            TransferKind::Restore => RESTORE_NAME_LABEL,
        }
    }

    /// Label value that records this operation.
    #[must_use]
    pub fn label_value(&self) -> String {
        valid_label_value(&self.name)
    }
}

/// Identity of the logical operation a transfer request serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey {
    /// Owning operation.
    pub operation: OperationRef,
    /// Name of the source object (snapshot content or volume claim).
    pub source: String,
}

impl OwnerKey {
    /// Builds an owner key.
    #[must_use]
    pub fn new(operation: OperationRef, source: impl Into<String>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// Transfer family this owner creates.
    #[must_use]
    pub const fn kind(&self) -> TransferKind {
        self.operation.kind
    }

    /// Labels written on every request created for this owner.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                self.operation.label_key().to_string(),
                self.operation.label_value(),
            ),
            (SOURCE_LABEL.to_string(), valid_label_value(&self.source)),
        ])
    }

    /// Selector matching every request created for this owner.
    #[must_use]
    pub fn selector(&self) -> LabelSelector {
        LabelSelector::from(self.labels())
    }
}

impl Display for OwnerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={},{SOURCE_LABEL}={}",
            self.operation.label_key(),
            self.operation.name,
            self.source
        )
    }
}

/// Whether an object carries the label of the given operation.
///
/// Objects without labels, or an operation without a name, never match.
#[must_use]
pub fn has_operation_label(meta: &ObjectMeta, operation: &OperationRef) -> bool {
    if operation.name.trim().is_empty() {
        return false;
    }
    meta.labels
        .as_ref()
        .and_then(|labels| labels.get(operation.label_key()))
        .is_some_and(|value| *value == operation.label_value())
}

/// Equality-based label selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    terms: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector with a single `key=value` term.
    #[must_use]
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            terms: BTreeMap::from([(key.into(), value.into())]),
        }
    }

    /// Selector terms.
    #[must_use]
    pub const fn terms(&self) -> &BTreeMap<String, String> {
        &self.terms
    }

    /// Whether every term is present in `labels` with the same value.
    #[must_use]
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.terms.iter().all(|(key, value)| {
            labels
                .and_then(|labels| labels.get(key))
                .is_some_and(|actual| actual == value)
        })
    }
}

impl From<BTreeMap<String, String>> for LabelSelector {
    fn from(terms: BTreeMap<String, String>) -> Self {
        Self { terms }
    }
}

impl Display for LabelSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.terms {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_label_values_pass_through() {
        assert_eq!(valid_label_value("nightly"), "nightly");
        let exact = "a".repeat(LABEL_VALUE_MAX_LENGTH);
        assert_eq!(valid_label_value(&exact), exact);
    }

    #[test]
    fn multibyte_label_values_are_cut_on_a_char_boundary() {
        let value = "\u{e9}".repeat(40);
        let label = valid_label_value(&value);
        assert!(label.len() <= LABEL_VALUE_MAX_LENGTH);
        assert_eq!(label.len(), 56 + DIGEST_SUFFIX_LENGTH);
        assert!(label.starts_with(&"\u{e9}".repeat(28)));
        assert_ne!(label, valid_label_value(&"\u{e9}".repeat(41)));
    }

    #[test]
    fn long_label_values_are_truncated_with_digest() {
        let long = format!("{}-{}", "b".repeat(60), "tail");
        let value = valid_label_value(&long);
        assert_eq!(value.len(), LABEL_VALUE_MAX_LENGTH);
        assert!(value.starts_with(&"b".repeat(57)));

        let other = format!("{}-{}", "b".repeat(60), "other");
        assert_ne!(valid_label_value(&other), value);
        assert_eq!(valid_label_value(&long), value);
    }

    #[test]
    fn owner_labels_select_matching_objects() {
        let owner = OwnerKey::new(OperationRef::backup("nightly"), "snapcontent-1");
        let labels = owner.labels();
        assert_eq!(labels.get(BACKUP_NAME_LABEL).map(String::as_str), Some("nightly"));
        assert!(owner.selector().matches(Some(&labels)));

        let other = OwnerKey::new(OperationRef::backup("weekly"), "snapcontent-1");
        assert!(!other.selector().matches(Some(&labels)));
        assert!(!owner.selector().matches(None));
        assert_eq!(
            owner.selector().to_string(),
            "datamover.oadp.openshift.io/source=snapcontent-1,velero.io/backup-name=nightly"
        );
    }

    #[test]
    fn operation_label_requires_a_name_and_a_match() {
        let meta = ObjectMeta {
            labels: Some(BTreeMap::from([(
                RESTORE_NAME_LABEL.to_string(),
                "restore-1".to_string(),
            )])),
            ..ObjectMeta::default()
        };
        assert!(has_operation_label(&meta, &OperationRef::restore("restore-1")));
        assert!(!has_operation_label(&meta, &OperationRef::restore("restore-2")));
        assert!(!has_operation_label(&meta, &OperationRef::backup("restore-1")));
        assert!(!has_operation_label(&meta, &OperationRef::restore("  ")));
        assert!(!has_operation_label(
            &ObjectMeta::default(),
            &OperationRef::restore("restore-1")
        ));
    }
}
