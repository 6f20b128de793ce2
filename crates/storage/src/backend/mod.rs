//! Storage backend trait and implementations.
//!
//! The dataset being built is written through a [`StorageBackend`]: a local
//! directory in normal runs, wrapped in a [`DryRunBackend`] to preview a run,
//! or the in-memory `MockBackend` in tests.

mod dry_run;
mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::dry_run::DryRunBackend;
pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use std::path::Path;

/// Unified interface for dataset storage.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation, so a path that would escape the root is an
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) error rather than a
/// write somewhere unexpected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use rec2bids_storage::{StorageBackend, error::Result};
///
/// fn place(backend: &dyn StorageBackend, recording: &Path) -> Result<bool> {
///     let target = Path::new("sub-01/ses-01/func/sub-01_ses-01_stim.mat");
///     if backend.exists(target)? {
///         return Ok(false);
///     }
///     backend.import(recording, target)?;
///     Ok(true)
/// }
/// ```
pub trait StorageBackend {
    /// Name of the backend, for logging only.
    fn name(&self) -> &str;

    /// Check if a file exists.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, replacing any existing file.
    ///
    /// Parent directories are created as needed.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Copy a file from the local filesystem (`source` is an ordinary,
    /// usually absolute, path) into storage at `path`, replacing any existing
    /// file. Parent directories are created as needed.
    ///
    /// Returns the number of bytes copied.
    fn import(&self, source: &Path, path: &Path) -> Result<u64>;
}
