//! Request validation errors.

use thiserror::Error;

/// Result type for request validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A request that cannot be served as sent; maps to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{field} is required")]
    Missing { field: &'static str },

    /// A field did not parse or is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    /// Creates a missing-field error.
    pub fn missing(field: &'static str) -> Self {
        Self::Missing { field }
    }

    /// Creates an invalid-field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Missing { field } | Self::Invalid { field, .. } => field,
        }
    }
}
