use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifies one particular state of a file on disk.
///
/// Same idea as a path + size match against a cache record: if the path,
/// size and modification time haven't changed, the content is assumed not to
/// have changed either, without reading a single byte of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub path: PathBuf,
    pub size: u64,
    /// Nanoseconds since the Unix epoch, `None` where the platform doesn't
    /// report modification times.
    pub modified: Option<u128>,
}
impl Fingerprint {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: Option<SystemTime>) -> Self {
        let modified = modified.and_then(|m| m.duration_since(UNIX_EPOCH).ok()).map(|d| d.as_nanos());
        Self { path: path.into(), size, modified }
    }

    /// Reads the metadata of `path` (following symlinks).
    pub fn of(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).or_raise(|| ErrorKind::Fingerprint(path.to_path_buf()))?;
        Ok(Self::new(path, metadata.len(), metadata.modified().ok()))
    }

    /// Hex-encoded BLAKE3 digest of every field, used as the document name.
    pub fn key(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.path.as_os_str().as_encoded_bytes());
        // Separator so that a path can't bleed into the size bytes.
        hasher.update(&[0]);
        hasher.update(&self.size.to_le_bytes());
        match self.modified {
            Some(nanos) => hasher.update(&[1]).update(&nanos.to_le_bytes()),
            None => hasher.update(&[0]),
        };
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_key_is_deterministic() {
        let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let a = Fingerprint::new("/data/a.mat", 10, Some(modified));
        let b = Fingerprint::new("/data/a.mat", 10, Some(modified));
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().len(), 64);
    }

    #[test]
    fn test_key_changes_with_any_field() {
        let modified = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let base = Fingerprint::new("/data/a.mat", 10, Some(modified));
        assert_ne!(base.key(), Fingerprint::new("/data/b.mat", 10, Some(modified)).key());
        assert_ne!(base.key(), Fingerprint::new("/data/a.mat", 11, Some(modified)).key());
        assert_ne!(base.key(), Fingerprint::new("/data/a.mat", 10, None).key());
        assert_ne!(base.key(), Fingerprint::new("/data/a.mat", 10, Some(modified + Duration::from_secs(1))).key());
    }

    #[test]
    fn test_of_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.edf");
        std::fs::write(&path, b"12345").unwrap();
        let fingerprint = Fingerprint::of(&path).unwrap();
        assert_eq!(fingerprint.size, 5);
        assert_eq!(fingerprint.path, path);
        assert!(Fingerprint::of(dir.path().join("missing")).is_err());
    }
}
