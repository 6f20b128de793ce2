use std::fmt::Display;
use std::path::{Path, PathBuf};

/// The raw classification of one physical file, as produced by an
/// [`Identify`](crate::Identify) implementation.
///
/// Every field except `source_path` is optional here so that identifiers can
/// be written as loosely as they like. Required fields are enforced when the
/// record is turned into an [`Identity`](super::Identity).
///
/// `source_path` may differ from the path that was identified, which allows
/// an identifier to point at a converted or split copy of the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRecord {
    pub source_path: PathBuf,
    /// Participant label; `sub-` is prefixed during validation.
    pub subject: Option<String>,
    /// Visit label; `ses-` is prefixed during validation.
    pub session: Option<String>,
    /// Repetition index, rendered verbatim (callers do their own padding).
    pub run: Option<String>,
    /// Broad content category (`anat`, `func`, `beh`, `dwi`, ...).
    pub data_type: Option<String>,
    pub task: Option<String>,
    /// Free-form disambiguator for otherwise identical recordings.
    pub acquisition_label: Option<String>,
    /// File extension without the leading dot (`nii`, `edf`, `mat`, ...).
    pub file_format: Option<String>,
    /// Recording technique within the data type (`bold`, `T1w`, ...).
    pub modality: Option<String>,
}
impl IdentityRecord {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self { source_path: source_path.into(), ..Self::default() }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn with_subject(mut self, subject: impl Display) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn with_session(mut self, session: impl Display) -> Self {
        self.session = Some(session.to_string());
        self
    }

    /// Integers are rendered as their plain decimal form: `2` becomes `"2"`.
    pub fn with_run(mut self, run: impl Display) -> Self {
        self.run = Some(run.to_string());
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_acquisition_label(mut self, label: impl Into<String>) -> Self {
        self.acquisition_label = Some(label.into());
        self
    }

    /// Leading dots are stripped, so `".nii"` and `"nii"` are equivalent.
    pub fn with_file_format(mut self, file_format: impl AsRef<str>) -> Self {
        self.file_format = Some(file_format.as_ref().trim().trim_start_matches('.').to_string());
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }
}
