//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The layered configuration could not be extracted.
    #[display("invalid configuration")]
    Load,
    /// The configuration file extension isn't one of `toml`, `yaml`, `yml`
    /// or `json`.
    #[display("unsupported configuration file: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    #[display("configuration file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// A required setting was left unset.
    #[display("missing setting: {_0}")]
    Missing(#[error(not(source))] &'static str),
    /// An identification rule could not be compiled.
    #[display("invalid identification rule #{_0}")]
    InvalidRule(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
