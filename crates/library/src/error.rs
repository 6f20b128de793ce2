//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The underlying identification or
//! storage error stays attached as a child of the tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An identified record could not be added to the index.
    #[display("invalid identity for {}", _0.display())]
    Identity(#[error(not(source))] PathBuf),
    /// Labels produced a path that would escape the dataset root.
    #[display("cannot generate a dataset path from the identity labels")]
    Generate,
    /// An entry was placed before a target path was generated for it.
    #[display("no target path generated for {}", _0.display())]
    Unplanned(#[error(not(source))] PathBuf),
    /// Copying one entry into the dataset failed.
    #[display("cannot place {} at {}", source.display(), target.display())]
    Placement {
        #[error(not(source))]
        source: PathBuf,
        target: PathBuf,
    },
    /// The dataset description could not be written.
    #[display("cannot write dataset description")]
    Description,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Placement failures come from storage; everything else is decided by
        // the labels and gives the same answer on every run.
        matches!(self, Self::Placement { .. } | Self::Description)
    }
}
