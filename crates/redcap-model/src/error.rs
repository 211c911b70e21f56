//! Error types for the metadata model.

use thiserror::Error;

/// Errors raised while building the metadata index or coercing values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    // === Lookup Errors ===
    /// The field name is neither an expanded nor a raw field of the project.
    #[error("field '{field}' does not exist in the project metadata")]
    UnknownField { field: String },

    /// Two descriptors share the same `field_name`.
    #[error("field '{field}' is defined more than once in the metadata document")]
    DuplicateField { field: String },

    // === Type System Errors ===
    /// The raw `field_type` has no logical type under the active policy.
    #[error("field '{field}' has unsupported field type '{raw_type}'")]
    UnsupportedFieldType { field: String, raw_type: String },

    /// The field carries no choice definitions.
    #[error("field '{field}' does not have choices")]
    NoChoicesDefined { field: String },

    /// A choice entry is not of the form `<integer>, <label>`.
    #[error("field '{field}' has a malformed choice entry '{entry}'")]
    MalformedChoices { field: String, entry: String },

    /// A `min`/`max` bound could not be parsed under the field's logical type.
    #[error("field '{field}' has an invalid {expected} bound '{value}'")]
    InvalidBound {
        field: String,
        value: String,
        expected: &'static str,
    },

    // === Coercion Errors ===
    /// The column cannot be coerced (non-string input data).
    #[error("cannot coerce column '{field}' of type {logical_type}: {reason}")]
    UnsupportedCoercion {
        field: String,
        logical_type: String,
        reason: String,
    },

    /// A raw value does not parse under the field's logical type.
    #[error("cannot convert value '{value}' of field '{field}' to {expected}")]
    CoercionFailed {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// A date value matched none of the accepted formats.
    #[error("field '{field}' value '{value}' matches none of the accepted date formats")]
    DateParse { field: String, value: String },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl ModelError {
    /// Returns the field the error refers to, when there is one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field }
            | Self::DuplicateField { field }
            | Self::UnsupportedFieldType { field, .. }
            | Self::NoChoicesDefined { field }
            | Self::MalformedChoices { field, .. }
            | Self::InvalidBound { field, .. }
            | Self::UnsupportedCoercion { field, .. }
            | Self::CoercionFailed { field, .. }
            | Self::DateParse { field, .. } => Some(field),
            Self::DataFrame { .. } => None,
        }
    }

    /// Returns true for lookups of names absent from the metadata.
    #[must_use]
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, Self::UnknownField { .. })
    }
}

impl From<polars::prelude::PolarsError> for ModelError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for metadata operations.
pub type Result<T> = std::result::Result<T, ModelError>;
