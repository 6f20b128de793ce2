//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

type Files = BTreeMap<PathBuf, Vec<u8>>;

/// In-memory storage backend for testing.
///
/// Files are stored in a map behind a [`RwLock`], so all trait methods can
/// operate on `&self`. Imports read the source file from the local
/// filesystem into memory.
///
/// # Examples
///
/// ```
/// use rec2bids_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// let backend = MockBackend::with_files([("sub-01/anat/sub-01_T1w.nii", b"nifti")]);
/// assert!(backend.exists(Path::new("sub-01/anat/sub-01_T1w.nii")).unwrap());
/// ```
pub struct MockBackend {
    storage: RwLock<Files>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation: broken test setup should not
    /// produce a passing test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = Files::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self { storage: RwLock::new(map) }
    }

    /// Every stored path, in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().map(|files| files.keys().cloned().collect()).unwrap_or_default()
    }

    fn files(&self) -> Result<std::sync::RwLockReadGuard<'_, Files>> {
        Ok(self.storage.read().map_err(|_| ErrorKind::Poisoned)?)
    }

    fn insert(&self, path: PathBuf, data: Vec<u8>) -> Result<()> {
        let mut files = self.storage.write().map_err(|_| ErrorKind::Poisoned)?;
        files.insert(path, data);
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files()?.contains_key(&path))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let files = self.files()?;
        let data = files.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(data.clone())
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.insert(path, data.to_vec())
    }

    fn import(&self, source: &Path, path: &Path) -> Result<u64> {
        let path = validate_path(path)?;
        let data = std::fs::read(source).map_err(|e| ErrorKind::from_io(e, source))?;
        let size = data.len() as u64;
        self.insert(path, data)?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new("dataset_description.json"), b"{}").unwrap();
        assert_eq!(backend.read(Path::new("dataset_description.json")).unwrap(), b"{}");
    }

    #[test]
    fn test_import_reads_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("S1_P1_B1.edf");
        std::fs::write(&source, b"eyelink").unwrap();
        let backend = MockBackend::default();
        assert_eq!(backend.import(&source, Path::new("sub-01/func/x.edf")).unwrap(), 7);
        assert_eq!(backend.read(Path::new("sub-01/func/x.edf")).unwrap(), b"eyelink");
        assert_eq!(backend.paths(), [PathBuf::from("sub-01/func/x.edf")]);
    }

    #[test]
    fn test_not_found() {
        let backend = MockBackend::default();
        assert!(matches!(&*backend.read(Path::new("x")).unwrap_err(), ErrorKind::NotFound(_)));
        let err = backend.import(Path::new("/nope/missing.mat"), Path::new("x")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).is_err());
        assert!(backend.write(Path::new("../escape"), b"bad").is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
