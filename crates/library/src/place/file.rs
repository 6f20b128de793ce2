use crate::error::{ErrorKind, Result};
use crate::index::GroupEntry;
use exn::{OptionExt, ResultExt};
use rec2bids_storage::StorageBackend;
use std::path::{Path, PathBuf};

/// The outcome of placing a single entry. Each variant carries the target
/// path, relative to the dataset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Nothing was at the target path yet.
    Copied(PathBuf),
    /// An existing file at the target path was replaced.
    Overwritten(PathBuf),
    /// The target path exists and the source matches a protected suffix, so
    /// the existing file was left alone.
    Protected(PathBuf),
}
impl Placement {
    pub fn target(&self) -> &Path {
        match self {
            Self::Copied(target) | Self::Overwritten(target) | Self::Protected(target) => target,
        }
    }
}

/// Whether `source` ends with one of `suffixes`.
///
/// Plain byte suffixes, so `.json` and `_events.tsv` both work.
pub fn is_protected(source: &Path, suffixes: &[String]) -> bool {
    let source = source.as_os_str().as_encoded_bytes();
    suffixes.iter().any(|suffix| !suffix.is_empty() && source.ends_with(suffix.as_bytes()))
}

/// Copies `entry` into `backend` at its generated target path.
///
/// # Errors
/// [`ErrorKind::Unplanned`] if no target path was generated for the entry,
/// otherwise [`ErrorKind::Placement`] wrapping the storage error.
pub fn place_file(backend: &dyn StorageBackend, entry: &GroupEntry, protect: &[String]) -> Result<Placement> {
    let source = &entry.source_path;
    let target = entry.target_path.as_ref().ok_or_raise(|| ErrorKind::Unplanned(source.clone()))?;
    let failed = || ErrorKind::Placement { source: source.clone(), target: target.clone() };

    let exists = backend.exists(target).or_raise(failed)?;
    if exists && is_protected(source, protect) {
        tracing::debug!(source = %source.display(), target = %target.display(), "Protected, not overwriting");
        return Ok(Placement::Protected(target.clone()));
    }
    let bytes = backend.import(source, target).or_raise(failed)?;
    tracing::trace!(source = %source.display(), target = %target.display(), bytes, "Placed");
    Ok(match exists {
        true => Placement::Overwritten(target.clone()),
        false => Placement::Copied(target.clone()),
    })
}
