//! Error types for strategy construction and rendering.

use thiserror::Error;

/// Errors raised while building type tables, attaching constraints, or
/// rendering strategies.
///
/// Most variants are configuration errors: they are fatal to the call that
/// raised them and are never retried. [`Error::Unresolved`] is the exception;
/// it is raised while rendering a field whose selector target has not been
/// emitted yet, and is caught by the resolution driver to re-enqueue the field
/// for the next round. It never escapes a successful render call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The type table does not describe a well-formed, closed type universe.
    #[error("malformed type table: {0}")]
    MalformedTypeTable(String),

    /// A message type name is not present in the type table.
    #[error("'{0}' is not defined")]
    UnknownType(String),

    /// A (group, type) pair was created twice.
    #[error("'{msg_type}' is already defined in '{group}'")]
    AlreadyDefined {
        /// The custom strategy group.
        group: String,
        /// The message type being redefined.
        msg_type: String,
    },

    /// A field name is not declared by the message type it was looked up in.
    #[error("unknown field '{field}' in '{msg_type}'")]
    UnknownField {
        /// The message type that was searched.
        msg_type: String,
        /// The missing field name.
        field: String,
    },

    /// A constraint mutator was applied to a field kind that cannot honor it.
    #[error("operation '{operation}' is not supported on field '{field}'")]
    UnsupportedOperation {
        /// The field the operation was applied to.
        field: String,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Two constraints on the same field cannot both hold.
    #[error("conflicting constraints on field '{field}': {detail}")]
    InconsistentConstraints {
        /// The over-constrained field.
        field: String,
        /// What conflicted.
        detail: String,
    },

    /// A constraint value does not fit the field's declared type.
    #[error("invalid value for '{field}': expected {expected}, got {value}")]
    InvalidValue {
        /// The constrained field.
        field: String,
        /// The field's declared scalar kind.
        expected: String,
        /// A display of the offending value.
        value: String,
    },

    /// A selector path does not fit the shape of the fields it traverses.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A referenced field has not been emitted yet.
    ///
    /// Retryable: the resolution driver catches this and re-enqueues the
    /// referencing field for the next fixpoint round.
    #[error("unresolved reference to '{field}'")]
    Unresolved {
        /// Full name of the field that is not available yet.
        field: String,
    },

    /// A fixpoint round made no progress; the remaining fields reference each
    /// other in a cycle.
    #[error("cyclic dependency between fields: {}", .unresolved.join(", "))]
    CyclicDependency {
        /// Full names of the fields that could not be rendered.
        unresolved: Vec<String>,
    },

    /// An "any one index" request cannot be honored because every element of
    /// the array is already pinned by an explicit constraint.
    #[error("no unconstrained index left in array '{field}'")]
    NoFreeIndex {
        /// The full name of the array field.
        field: String,
    },

    /// Inline rendering of nested array templates exceeded the configured
    /// depth cap.
    #[error("nesting of '{field}' exceeds the configured depth limit")]
    DepthExceeded {
        /// The field at which the limit was hit.
        field: String,
    },
}

impl Error {
    /// Returns `true` for the retryable resolution error.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Error::Unresolved { .. })
    }
}
