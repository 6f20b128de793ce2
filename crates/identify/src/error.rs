//! Identification Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An identification error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for identification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required identity field was absent (or blank) on a record that was
    /// not skipped.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// An identification rule could not be compiled.
    #[display("invalid identification rule: {_0}")]
    InvalidRule(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Records and rules are either complete or they're not. Retrying the
        // same input gives the same answer.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::MissingField("modality").to_string(), "missing required field: modality");
        assert_eq!(ErrorKind::InvalidRule("oops".to_string()).to_string(), "invalid identification rule: oops");
    }

    #[test]
    fn test_error_kind_not_retryable() {
        assert!(!ErrorKind::MissingField("subject").is_retryable());
    }
}
