//! Timestamp Error Types
//!
//! None of these ever reach the caller of
//! [`TimestampOracle::timestamp`](crate::TimestampOracle::timestamp), which
//! recovers from all of them by falling back; they exist for the individual
//! readers and for logging.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A timestamp error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for timestamp operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The recording could not be read.
    #[display("cannot read recording: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The recording is not laid out the way its extension claims.
    #[display("malformed recording {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: &'static str },
    /// Neither the recording nor the filesystem could say when it was made.
    #[display("no timestamp available for {}", _0.display())]
    TimestampUnavailable(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
