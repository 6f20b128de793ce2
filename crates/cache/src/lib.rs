//! On-disk memoization for expensive per-file reads.
//!
//! Reading acquisition times out of proprietary binary formats is slow, and
//! dataset reorganization is often re-run over the same raw files. This crate
//! stores the results as small JSON documents under a caller-chosen root,
//! keyed by a [`Fingerprint`] of the file they were derived from.
//!
//! The cache is not the source of truth: the recording files are. Deleting
//! the cache directory only costs the time needed to rebuild it. A
//! [`Cache`] is an ordinary value constructed by the caller and handed to
//! whoever needs it; there is no process-wide instance.
//!
//! # Layout
//!
//! ```text
//! <root>/<namespace>/<blake3(fingerprint)>.json
//! ```

pub mod error;
mod fingerprint;

pub use crate::fingerprint::Fingerprint;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Serialize, Deserialize)]
struct Document<T> {
    /// Recorded so that a document can be checked against the file it
    /// supposedly describes.
    path: PathBuf,
    value: T,
}

/// A directory of memoized values.
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}
impl Cache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).or_raise(|| ErrorKind::Io(root.clone()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Looks up the value stored for `fingerprint`.
    ///
    /// Unreadable or corrupt documents are treated as a miss (and logged),
    /// since the value can always be recomputed.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, fingerprint: &Fingerprint) -> Result<Option<T>> {
        let path = self.document_path(namespace, fingerprint)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path)),
        };
        match serde_json::from_slice::<Document<T>>(&bytes) {
            Ok(document) if document.path == fingerprint.path => Ok(Some(document.value)),
            Ok(_) => {
                tracing::warn!(document = %path.display(), "Cache document belongs to a different file; ignoring");
                Ok(None)
            },
            Err(e) => {
                tracing::warn!(document = %path.display(), error = %e, "Corrupt cache document; ignoring");
                Ok(None)
            },
        }
    }

    /// Stores `value` for `fingerprint`, replacing any previous document.
    ///
    /// The document is written next to its final location and renamed into
    /// place, so readers never see a half-written file.
    pub fn put<T: Serialize>(&self, namespace: &str, fingerprint: &Fingerprint, value: &T) -> Result<()> {
        let path = self.document_path(namespace, fingerprint)?;
        let document = Document { path: fingerprint.path.clone(), value };
        let bytes = serde_json::to_vec(&document).or_raise(|| ErrorKind::InvalidData)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, bytes).or_raise(|| ErrorKind::Io(staging.clone()))?;
        fs::rename(&staging, &path).or_raise(|| ErrorKind::Io(path.clone()))?;
        Ok(())
    }

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// Failing to *store* the value is logged rather than returned: the
    /// caller still gets its answer.
    pub fn get_or_insert_with<T, E>(
        &self,
        namespace: &str,
        fingerprint: &Fingerprint,
        compute: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.get(namespace, fingerprint) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {},
            Err(e) => tracing::warn!(namespace, error = %*e, "Cache lookup failed; recomputing"),
        }
        let value = compute()?;
        if let Err(e) = self.put(namespace, fingerprint, &value) {
            tracing::warn!(namespace, error = %*e, "Could not store value in cache");
        }
        Ok(value)
    }

    fn document_path(&self, namespace: &str, fingerprint: &Fingerprint) -> Result<PathBuf> {
        let mut components = Path::new(namespace).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {},
            _ => exn::bail!(ErrorKind::InvalidNamespace(namespace.to_string())),
        }
        Ok(self.root.join(namespace).join(format!("{}.json", fingerprint.key())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ops::Deref;

    fn fingerprint(path: &str) -> Fingerprint {
        Fingerprint { path: PathBuf::from(path), size: 42, modified: Some(1) }
    }

    #[test]
    fn test_open_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/cache");
        let cache = Cache::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(cache.root(), root);
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let fp = fingerprint("/raw/S1_P1_B1.mat");
        assert_eq!(cache.get::<i64>("acquisition", &fp).unwrap(), None);
        cache.put("acquisition", &fp, &1_489_000_000_i64).unwrap();
        assert_eq!(cache.get::<i64>("acquisition", &fp).unwrap(), Some(1_489_000_000));
        // Namespaces are independent.
        assert_eq!(cache.get::<i64>("other", &fp).unwrap(), None);
    }

    #[test]
    fn test_changed_file_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let fp = fingerprint("/raw/a.edf");
        cache.put("acquisition", &fp, &Some(5_i64)).unwrap();
        let changed = Fingerprint { size: 43, ..fp };
        assert_eq!(cache.get::<Option<i64>>("acquisition", &changed).unwrap(), None);
    }

    #[test]
    fn test_corrupt_document_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let fp = fingerprint("/raw/a.edf");
        cache.put("acquisition", &fp, &7_i64).unwrap();
        let document = dir.path().join("acquisition").join(format!("{}.json", fp.key()));
        std::fs::write(&document, b"{not json").unwrap();
        assert_eq!(cache.get::<i64>("acquisition", &fp).unwrap(), None);
    }

    #[test]
    fn test_get_or_insert_with_computes_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let fp = fingerprint("/raw/a.mat");
        let mut calls = 0;
        for _ in 0..3 {
            let value: std::result::Result<i64, ()> = cache.get_or_insert_with("acquisition", &fp, || {
                calls += 1;
                Ok(11)
            });
            assert_eq!(value, Ok(11));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_get_or_insert_with_does_not_store_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let fp = fingerprint("/raw/a.mat");
        let failed: std::result::Result<i64, &str> = cache.get_or_insert_with("acquisition", &fp, || Err("unreadable"));
        assert_eq!(failed, Err("unreadable"));
        assert_eq!(cache.get::<i64>("acquisition", &fp).unwrap(), None);
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("a/b")]
    #[case("/abs")]
    fn test_invalid_namespace(#[case] namespace: &str) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let err = cache.get::<i64>(namespace, &fingerprint("/x")).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::InvalidNamespace(_)));
    }
}
