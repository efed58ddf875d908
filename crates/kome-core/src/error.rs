//! # Validation Errors
//!
//! Malformed input rejected before any state is touched. Each variant names
//! the offending field so callers can surface it next to the form input.

use thiserror::Error;

/// Input validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace only.
    #[error("{field} must not be empty")]
    Empty {
        /// The offending field name.
        field: &'static str,
    },

    /// A text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters (got {actual})")]
    TooLong {
        /// The offending field name.
        field: &'static str,
        /// Maximum permitted length in characters.
        max: usize,
        /// Actual length in characters.
        actual: usize,
    },

    /// A numeric field fell outside its permitted range.
    #[error("{field} must be between {min} and {max} (got {actual})")]
    OutOfRange {
        /// The offending field name.
        field: &'static str,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
        /// The rejected value.
        actual: i64,
    },

    /// An identifier string could not be parsed.
    #[error("invalid {kind}: {value:?}")]
    InvalidIdentifier {
        /// What kind of identifier was expected.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A timestamp string could not be parsed or was not UTC.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two fields that must agree did not.
    #[error("{field} does not match: {reason}")]
    Mismatch {
        /// The offending field name.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
}

/// Require a non-blank text field no longer than `max` characters.
///
/// Returns the trimmed text on success.
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(trimmed.to_string())
}
