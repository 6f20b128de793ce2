//! Acquisition times for ordering recordings.
//!
//! When several files land in the same dataset slot they are numbered in the
//! order they were recorded. The [`TimestampOracle`] answers "when was this
//! recorded?" for any path and never fails: it asks an [`AcquisitionTime`]
//! reader first, then the filesystem, and finally gives up with
//! [`Timestamp::Unknown`], which sorts after every known time.
//!
//! ```
//! use rec2bids_timestamp::{Timestamp, TimestampOracle};
//! use std::path::Path;
//!
//! let oracle = TimestampOracle::default();
//! assert_eq!(oracle.timestamp(Path::new("/does/not/exist.smr")), Timestamp::Unknown);
//! ```

mod consts;
mod date;
pub mod edf;
pub mod error;
pub mod mat;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rec2bids_cache::{Cache, Fingerprint};
use std::cmp::Ordering;
use std::path::Path;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::instrument;

/// Cache namespace for memoized acquisition times.
pub const CACHE_NAMESPACE: &str = "acquisition";

/// When a recording was made, and how we know.
///
/// Timestamps compare by instant alone, whatever their origin, except that
/// [`Timestamp::Unknown`] is later than everything else (and equal to itself).
#[derive(Debug, Clone, Copy)]
pub enum Timestamp {
    /// Read from the recording itself.
    Acquired(PrimitiveDateTime),
    /// The file's creation (or, failing that, modification) time.
    Filesystem(PrimitiveDateTime),
    Unknown,
}
impl Timestamp {
    pub fn instant(&self) -> Option<PrimitiveDateTime> {
        match self {
            Self::Acquired(instant) | Self::Filesystem(instant) => Some(*instant),
            Self::Unknown => None,
        }
    }
}
impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.instant(), other.instant()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Timestamp {}

/// Reads the acquisition time stored inside a recording.
///
/// `Ok(None)` means the format doesn't record one, which isn't worth a
/// warning; errors mean the file couldn't be read the way its type promised.
/// Implemented for closures of the same shape.
pub trait AcquisitionTime {
    fn acquisition_time(&self, path: &Path) -> Result<Option<PrimitiveDateTime>>;
}
impl<F> AcquisitionTime for F
where
    F: Fn(&Path) -> Result<Option<PrimitiveDateTime>>,
{
    fn acquisition_time(&self, path: &Path) -> Result<Option<PrimitiveDateTime>> {
        self(path)
    }
}

/// The built-in readers, picked by file extension: `.mat` (stimulus logs)
/// and `.edf` (EyeLink). Every other format has no acquisition time.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormats;
impl AcquisitionTime for BuiltinFormats {
    fn acquisition_time(&self, path: &Path) -> Result<Option<PrimitiveDateTime>> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("mat") => mat::start_time(path),
            Some("edf") => edf::preamble_date(path),
            _ => Ok(None),
        }
    }
}

/// Never-failing timestamp lookup. See the [crate documentation](crate).
pub struct TimestampOracle {
    source: Box<dyn AcquisitionTime>,
    cache: Option<Cache>,
}
impl Default for TimestampOracle {
    fn default() -> Self {
        Self::new(BuiltinFormats)
    }
}
impl TimestampOracle {
    pub fn new(source: impl AcquisitionTime + 'static) -> Self {
        Self { source: Box::new(source), cache: None }
    }

    /// Memoizes acquisition times through `cache`, keyed by the file's
    /// path, size and modification time. Filesystem times are never cached.
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[instrument(level = "trace", skip(self))]
    pub fn timestamp(&self, path: &Path) -> Timestamp {
        match self.acquired(path) {
            Ok(Some(instant)) => return Timestamp::Acquired(instant),
            Ok(None) => {},
            Err(e) => {
                let path = path.display();
                tracing::warn!(%path, error = %*e, "Could not read acquisition time; using file time");
            },
        }
        match filesystem_time(path) {
            Ok(instant) => Timestamp::Filesystem(instant),
            Err(e) => {
                let path = path.display();
                tracing::warn!(%path, error = %*e, "Recording has no usable timestamp; ordering it last");
                Timestamp::Unknown
            },
        }
    }

    fn acquired(&self, path: &Path) -> Result<Option<PrimitiveDateTime>> {
        let Some(cache) = &self.cache else {
            return self.source.acquisition_time(path);
        };
        let fingerprint = match Fingerprint::of(path) {
            Ok(fingerprint) => fingerprint,
            Err(_) => return self.source.acquisition_time(path),
        };
        let seconds = cache.get_or_insert_with(CACHE_NAMESPACE, &fingerprint, || {
            let instant = self.source.acquisition_time(path)?;
            Ok::<_, error::Error>(instant.map(|instant| instant.assume_utc().unix_timestamp()))
        })?;
        Ok(seconds.and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok()).map(naive))
    }
}

/// Creation time where the platform records it, modification time otherwise.
pub fn filesystem_time(path: &Path) -> Result<PrimitiveDateTime> {
    let unavailable = || ErrorKind::TimestampUnavailable(path.to_path_buf());
    let metadata = std::fs::metadata(path).or_raise(unavailable)?;
    let time = metadata.created().or_else(|_| metadata.modified()).or_raise(unavailable)?;
    Ok(naive(OffsetDateTime::from(time)))
}

fn naive(instant: OffsetDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(instant.date(), instant.time())
}
