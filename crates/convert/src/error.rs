//! Conversion Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A conversion error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The external program isn't installed (or isn't on `PATH`).
    #[display("{_0} not detected on your system")]
    ConverterNotFound(#[error(not(source))] String),
    /// The converter exited with a non-zero exit code.
    #[display("converter exited with code: {_0}")]
    ProcessFailed(#[error(not(source))] i32),
    /// The converter was killed by a signal before it could exit.
    #[display("converter terminated without an exit code")]
    ProcessTerminated,
    /// The converter (or a sniffer) could not be started.
    #[display("cannot run {}", _0.display())]
    Spawn(#[error(not(source))] PathBuf),
    /// A source or output directory could not be read, created or removed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Another directory with the same name already converts into this
    /// directory's output. Carries the first directory.
    #[display("output is already taken by {}", _0.display())]
    SharedOutput(#[error(not(source))] PathBuf),
    /// Source directories need a final path component to name their output.
    #[display("cannot convert {}: no directory name", _0.display())]
    InvalidSource(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProcessTerminated | Self::Io(_))
    }
}
