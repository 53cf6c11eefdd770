//! Errors in the library.
use crate::ActionKind;
use thiserror::Error;

/// Errors raised by replay buffers.
///
/// Functions in this workspace return [`anyhow::Result`]; errors of this type
/// can be recovered with [`anyhow::Error::downcast_ref`].
#[derive(Error, Debug, PartialEq)]
pub enum ReplayError {
    /// The action kind is neither discrete nor continuous.
    #[error("Unsupported action kind: {0}")]
    UnsupportedActionKind(String),

    /// A bounded buffer was configured with zero capacity.
    #[error("Capacity must be at least 1")]
    InvalidCapacity,

    /// The shape of a field differs from the shape fixed at construction.
    #[error("Shape mismatch in {field}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Name of the field.
        field: &'static str,
        /// Expected shape.
        expected: Vec<usize>,
        /// Given shape.
        actual: Vec<usize>,
    },

    /// The action representation differs from the kind of the buffer.
    #[error("Action kind mismatch: expected {expected:?}, got {actual:?}")]
    ActionKindMismatch {
        /// Kind of the buffer.
        expected: ActionKind,
        /// Kind of the given action.
        actual: ActionKind,
    },

    /// The fields of a batch have different numbers of rows.
    #[error("Row count mismatch in {field}: expected {expected}, got {actual}")]
    RowCountMismatch {
        /// Name of the field.
        field: &'static str,
        /// Number of rows of the states.
        expected: usize,
        /// Number of rows of the field.
        actual: usize,
    },

    /// A required key is absent from a dataset.
    #[error("Missing field in dataset: {0}")]
    MissingField(String),
}
