//! Storage backend that previews a run.
//!
//! Wraps another backend and lets reads through, so that collision checks
//! still see the real dataset, but drops every write while reporting success.

use crate::error::{ErrorKind, Result};
use crate::{BackendHandle, StorageBackend};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Dry-run storage backend.
///
/// Wraps another backend and drops all write operations, logging an
/// [`info event`](tracing::Event) for each. Paths that would have been
/// written are remembered, so [`exists`](StorageBackend::exists) answers as
/// it would have during a real run: a second copy to the same path shows up
/// as an overwrite.
pub struct DryRunBackend {
    inner: BackendHandle,
    written: Mutex<HashSet<PathBuf>>,
}
impl DryRunBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner, written: Mutex::new(HashSet::new()) }
    }

    fn remember(&self, path: &Path) -> Result<()> {
        let path = crate::validate_path(path)?;
        self.written.lock().map_err(|_| ErrorKind::Poisoned)?.insert(path);
        Ok(())
    }
}

impl StorageBackend for DryRunBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let validated = crate::validate_path(path)?;
        if self.written.lock().map_err(|_| ErrorKind::Poisoned)?.contains(&validated) {
            return Ok(true);
        }
        self.inner.exists(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.remember(path)?;
        tracing::info!(path = %path.display(), bytes = data.len(), "Skipping write during dry run");
        Ok(())
    }

    /// Reports the size of `source` as if it had been copied.
    fn import(&self, source: &Path, path: &Path) -> Result<u64> {
        let size = std::fs::metadata(source).map_err(|e| ErrorKind::from_io(e, source))?.len();
        self.remember(path)?;
        tracing::info!(source = %source.display(), path = %path.display(), "Skipping copy during dry run");
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use std::sync::Arc;

    #[test]
    fn test_writes_are_dropped_and_reads_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalBackend::new("dataset", dir.path().join("bids")).unwrap();
        local.write(Path::new("existing.json"), b"{}").unwrap();
        let source = dir.path().join("S1_P1_B1.mat");
        std::fs::write(&source, b"12345").unwrap();

        let backend = DryRunBackend::new(Arc::new(local));
        assert_eq!(backend.name(), "dataset");
        assert!(backend.exists(Path::new("existing.json")).unwrap());
        assert_eq!(backend.read(Path::new("existing.json")).unwrap(), b"{}");
        assert!(!backend.exists(Path::new("sub-01/x.mat")).unwrap());
        assert_eq!(backend.import(&source, Path::new("sub-01/x.mat")).unwrap(), 5);
        backend.write(Path::new("dataset_description.json"), b"{}").unwrap();
        assert!(!dir.path().join("bids/sub-01").exists());
        assert!(!dir.path().join("bids/dataset_description.json").exists());
    }

    #[test]
    fn test_previewed_writes_exist_afterwards() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("S1_P1_B1.mat");
        std::fs::write(&source, b"12345").unwrap();
        let backend = DryRunBackend::new(Arc::new(LocalBackend::new("dataset", dir.path().join("bids")).unwrap()));

        backend.import(&source, Path::new("sub-01/func/x.mat")).unwrap();
        assert!(backend.exists(Path::new("sub-01/func/x.mat")).unwrap());
        assert!(backend.exists(Path::new("./sub-01//func/x.mat")).unwrap());
        backend.write(Path::new("dataset_description.json"), b"{}").unwrap();
        assert!(backend.exists(Path::new("dataset_description.json")).unwrap());
        assert!(!dir.path().join("bids/sub-01/func/x.mat").exists());
    }

    #[test]
    fn test_still_rejects_bad_paths_and_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DryRunBackend::new(Arc::new(LocalBackend::new("dataset", dir.path()).unwrap()));
        assert!(backend.write(Path::new("../escape"), b"").is_err());
        let err = backend.import(&dir.path().join("missing.mat"), Path::new("x.mat")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!backend.exists(Path::new("x.mat")).unwrap());
    }
}
