//! Error taxonomy
//!
//! Tree edits fail locally and leave the tree untouched; submission and
//! transport failures are surfaced to the user and are retryable.
//!
//! Author: Moroya Sakamoto

use thiserror::Error;

use crate::catalog::{AttrKey, ValueKind};
use crate::field::FieldId;

/// One required attribute missing on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValue {
    /// Offending node
    pub field: FieldId,
    /// Index path from the root sequence down to the node
    pub path: Vec<usize>,
    /// Attribute that must be filled in
    pub key: AttrKey,
}

/// Submission blocked by the catalog rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing to submit.
    #[error("form has no fields; add at least one parent field first")]
    EmptyForm,
    /// Parent panels only accept header/accordion field types.
    #[error("field type {0:?} cannot be used for a parent field")]
    NotParentType(String),
    /// One or more nodes lack required attributes.
    #[error("required values missing: {}", describe(.0))]
    MissingValues(Vec<MissingValue>),
}

fn describe(missing: &[MissingValue]) -> String {
    missing
        .iter()
        .map(|m| format!("{} at {:?}", m.key, m.path))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    /// Missing values carried by this error (empty for the other variants).
    pub fn missing(&self) -> &[MissingValue] {
        match self {
            ValidationError::MissingValues(missing) => missing,
            _ => &[],
        }
    }
}

/// Lookup Provider / Form Store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// Backend answered with a non-success status.
    #[error("backend responded with status {0}")]
    Status(u16),
    /// Response body was not what the contract promises.
    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Unreachable or failing backends may recover; a malformed body will not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Decode(_))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Unavailable(err.to_string())
        }
    }
}

/// Top-level editor errors.
#[derive(Debug, Error)]
pub enum FormError {
    /// Operation referenced an id absent from the tree.
    #[error("field not found: {0}")]
    NotFound(FieldId),
    /// Insert of a node whose id is already in the tree.
    #[error("field already in tree: {0}")]
    DuplicateId(FieldId),
    /// Insert of a node that still references children.
    #[error("field {0} still references children; insert detached nodes only")]
    AttachedNode(FieldId),
    /// Re-parenting would make a node its own ancestor.
    #[error("moving {moving} under {target} would create a cycle")]
    CycleRejected { moving: FieldId, target: FieldId },
    /// Attribute value does not match the catalog's value kind.
    #[error("attribute {key} expects a {expected} value")]
    AttributeKind { key: AttrKey, expected: ValueKind },
    /// Properties panel operation with no panel open.
    #[error("no field is open in the properties panel")]
    PanelClosed,
    /// Submission validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Backend failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FormError {
    /// True when retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FormError::Transport(err) if err.is_retryable())
    }
}

/// A typed result used across the crate.
pub type Result<T> = std::result::Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_message_locates_first_node() {
        let field = FieldId::new();
        let err = ValidationError::MissingValues(vec![MissingValue {
            field,
            path: vec![0, 2],
            key: AttrKey::GuideUrlMode,
        }]);
        let msg = err.to_string();
        assert!(msg.contains("[0, 2]"), "{msg}");
        assert!(msg.contains("guideUrlMode"), "{msg}");
        assert_eq!(err.missing().len(), 1);
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let err = FormError::from(TransportError::Unavailable(String::from("refused")));
        assert!(err.is_retryable());
        let err = FormError::from(TransportError::Status(503));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_tree_errors_are_not_retryable() {
        let id = FieldId::new();
        assert!(!FormError::NotFound(id).is_retryable());
        assert!(!FormError::CycleRejected { moving: id, target: id }.is_retryable());
        assert!(!FormError::from(ValidationError::EmptyForm).is_retryable());
    }

    #[test]
    fn test_empty_form_has_no_missing_values() {
        assert!(ValidationError::EmptyForm.missing().is_empty());
    }
}
