//! Error types for record construction and canonical serialization.
//!
//! Chain integrity failures are deliberately absent from this module: a
//! tampered ledger is a verification *result* (see
//! [`crate::chain::Verification`]), not an error. Storage errors live in
//! `trace-ledger`, configuration errors in `trace-config`; everything
//! converges into `anyhow::Error` inside the `ttrace` binary.

use thiserror::Error;

/// Errors raised while building or hashing a decision record.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or outside its domain.
    ///
    /// Surfaced to the decision producer, which must fix the input and retry.
    #[error("Validation error on '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// A field value has no canonical encoding (e.g. NaN or infinity).
    #[error("Serialization error on '{field}': {reason}")]
    Serialization { field: String, reason: String },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn serialization(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serialization {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field, if the error is tied to one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } | Self::Serialization { field, .. } => Some(field),
            Self::Other(_) => None,
        }
    }
}
