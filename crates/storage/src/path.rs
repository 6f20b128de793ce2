//! Relative path validation.
//!
//! Every path handed to a backend, and every path the filename generator
//! builds out of identifier-supplied labels, goes through [`validate`] so that
//! a label like `../..` can never place a file outside the dataset root.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Validates and normalizes a path relative to a storage root.
///
/// `.` components, repeated and trailing separators, and a leading `/` are
/// dropped; `..` is resolved as long as it never climbs above the root. Null
/// bytes, Windows prefixes and paths that normalize to nothing are rejected
/// with [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use rec2bids_storage::validate_path;
///
/// assert!(validate_path("sub-01/ses-01/func/sub-01_ses-01_stim.mat").is_ok());
/// assert!(validate_path("sub-01/../sub-02/anat").is_ok());
/// assert!(validate_path("../outside").is_err());
/// assert!(validate_path("sub-01/../../outside").is_err());
/// assert!(validate_path("sub-\0").is_err());
/// assert_eq!(
///     validate_path("./sub-01//ses-01/./func/").unwrap(),
///     Path::new("sub-01/ses-01/func")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes survive Path::components() on Unix but truncate C strings.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}
