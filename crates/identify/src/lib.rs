//! File identification for dataset reorganization.
//!
//! An identifier looks at a path and decides what the file *is*: whose
//! recording, which visit, which run, which kind of data. The answer is an
//! [`Identification`], either one or more [`IdentityRecord`]s or an explicit
//! [`Identification::Skipped`] for files that don't belong in the dataset.
//!
//! Skipping is ordinary control flow, not an error. Errors only arise later,
//! when a record that was *not* skipped turns out to be missing a required
//! field (see [`Identity::from_record`](models::Identity::from_record)).

pub mod error;
pub mod models;
mod pattern;

use crate::models::IdentityRecord;
pub use crate::pattern::{FormatRule, PatternIdentifier, Rule};
use std::path::Path;

/// The outcome of identifying a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
    /// The path maps to these records. A single measurement file may hold
    /// several logical streams, so more than one record is allowed; each is
    /// placed independently.
    Identified(Vec<IdentityRecord>),
    /// The file is irrelevant and should be excluded without complaint.
    Skipped,
}
impl From<IdentityRecord> for Identification {
    fn from(record: IdentityRecord) -> Self {
        Self::Identified(vec![record])
    }
}
impl From<Vec<IdentityRecord>> for Identification {
    fn from(records: Vec<IdentityRecord>) -> Self {
        Self::Identified(records)
    }
}
impl From<Option<IdentityRecord>> for Identification {
    fn from(record: Option<IdentityRecord>) -> Self {
        record.map(Self::from).unwrap_or(Self::Skipped)
    }
}
impl Identification {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// The identified records, empty when skipped.
    pub fn into_records(self) -> Vec<IdentityRecord> {
        match self {
            Self::Identified(records) => records,
            Self::Skipped => Vec::new(),
        }
    }
}

/// Maps a path to its [`Identification`].
///
/// Implemented for any `Fn(&Path) -> Identification`, so ad-hoc identifiers
/// can be plain closures:
///
/// ```
/// use rec2bids_identify::{Identification, Identify, models::IdentityRecord};
/// use std::path::Path;
///
/// let identify = |path: &Path| -> Identification {
///     match path.extension().and_then(|e| e.to_str()) {
///         Some("nii") => IdentityRecord::new(path)
///             .with_subject("01")
///             .with_data_type("anat")
///             .with_file_format("nii")
///             .with_modality("T1w")
///             .into(),
///         _ => Identification::Skipped,
///     }
/// };
/// assert!(identify.identify(Path::new("notes.txt")).is_skipped());
/// assert!(!identify.identify(Path::new("t1.nii")).is_skipped());
/// ```
pub trait Identify {
    fn identify(&self, path: &Path) -> Identification;
}
impl<F> Identify for F
where
    F: Fn(&Path) -> Identification,
{
    fn identify(&self, path: &Path) -> Identification {
        self(path)
    }
}
