//! Error types returned by the edit protocol.

use crate::ids::{ElementId, StepId};
use std::fmt;
use thiserror::Error;

/// A single field rejected by schema validation.
///
/// Rejections are per field: the rest of a multi-field patch still applies.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRejection {
    /// Field name as it appears in the patch.
    pub field: String,
    /// Human readable reason.
    pub reason: String,
}

impl FieldRejection {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Errors produced by [`Editor::apply`](crate::Editor::apply).
///
/// Every error leaves the editor state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("Step not found: {0}")]
    StepNotFound(StepId),
    #[error("Element is locked: {0}")]
    LockedElement(ElementId),
    #[error("Duplicate id: {0}")]
    DuplicateId(String),
    #[error("Invalid field value: {}", join_rejections(.0))]
    InvalidFieldValue(Vec<FieldRejection>),
}

impl EditorError {
    /// True for unresolved element or step ids.
    ///
    /// Panels use this to render an empty state instead of an error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound(_) | Self::StepNotFound(_))
    }
}

fn join_rejections(rejections: &[FieldRejection]) -> String {
    rejections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for edit operations.
pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(EditorError::ElementNotFound(ElementId::from("a")).is_not_found());
        assert!(EditorError::StepNotFound(StepId::from("s")).is_not_found());
        assert!(!EditorError::LockedElement(ElementId::from("a")).is_not_found());
    }

    #[test]
    fn test_invalid_field_message_lists_fields() {
        let err = EditorError::InvalidFieldValue(vec![
            FieldRejection::new("fontSize", "must be between 10 and 72"),
            FieldRejection::new("opacity", "expected a number"),
        ]);
        let message = err.to_string();
        assert!(message.contains("fontSize: must be between 10 and 72"));
        assert!(message.contains("opacity: expected a number"));
    }
}
