//! # Core Error Types
//!
//! Errors raised while constructing the foundational types of this crate.
//! Higher layers wrap these with `#[from]` into their own enums.

use thiserror::Error;

/// A domain value failed validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required value was empty (or whitespace only).
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A value exceeded its maximum length.
    #[error("{field} must not exceed {max} characters, got {actual}")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
        /// Observed length.
        actual: usize,
    },

    /// A value was present but malformed.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
}

/// Canonical serialization failed.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value could not be converted to a JSON tree or JCS output.
    #[error("canonical serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
