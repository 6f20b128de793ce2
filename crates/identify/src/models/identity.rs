use super::IdentityRecord;
use super::label::{SESSION_PREFIX, SUBJECT_PREFIX, present, trimmed};
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::path::PathBuf;

/// Whether a dataset organizes recordings into sessions.
///
/// This is a dataset-level decision: with sessions disabled, every session
/// label an identifier reports is dropped, and generated paths carry no
/// session directory at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Sessions {
    #[default]
    Enabled,
    Disabled,
}
impl From<bool> for Sessions {
    fn from(enabled: bool) -> Self {
        match enabled {
            true => Self::Enabled,
            false => Self::Disabled,
        }
    }
}
impl Sessions {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// A validated, normalized [`IdentityRecord`] (without its source path).
///
/// All required labels are present and subject/session carry their reserved
/// prefixes. Two files with equal identities (and equal source paths) are the
/// same entry as far as the grouping index is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub subject: String,
    /// `None` if, and only if, the dataset has sessions disabled.
    pub session: Option<String>,
    pub run: Option<String>,
    pub data_type: String,
    pub task: Option<String>,
    pub acquisition_label: Option<String>,
    pub file_format: String,
    pub modality: String,
}
impl Identity {
    /// Validates a raw record, returning its source path alongside the
    /// normalized identity.
    ///
    /// Returns [`ErrorKind::MissingField`] naming the first absent required
    /// field. Blank labels count as absent.
    pub fn from_record(record: IdentityRecord, sessions: Sessions) -> Result<(PathBuf, Self)> {
        let subject =
            present(record.subject.as_deref(), SUBJECT_PREFIX).ok_or_raise(|| ErrorKind::MissingField("subject"))?;
        let session = match sessions {
            Sessions::Enabled => Some(
                present(record.session.as_deref(), SESSION_PREFIX)
                    .ok_or_raise(|| ErrorKind::MissingField("session"))?,
            ),
            Sessions::Disabled => None,
        };
        let data_type = trimmed(record.data_type.as_deref()).ok_or_raise(|| ErrorKind::MissingField("data_type"))?;
        let file_format = trimmed(record.file_format.as_deref().map(|f| f.trim().trim_start_matches('.')))
            .ok_or_raise(|| ErrorKind::MissingField("file_format"))?;
        let modality = trimmed(record.modality.as_deref()).ok_or_raise(|| ErrorKind::MissingField("modality"))?;
        let identity = Self {
            subject,
            session,
            run: trimmed(record.run.as_deref()),
            data_type,
            task: trimmed(record.task.as_deref()),
            acquisition_label: trimmed(record.acquisition_label.as_deref()),
            file_format,
            modality,
        };
        Ok((record.source_path, identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ops::Deref;

    fn complete() -> IdentityRecord {
        IdentityRecord::new("/data/S1_P1_B2.mat")
            .with_subject("01")
            .with_session("01")
            .with_run("2")
            .with_data_type("func")
            .with_task("inference")
            .with_file_format("mat")
            .with_modality("stim")
    }

    #[test]
    fn test_normalizes_labels() {
        let (source, identity) = Identity::from_record(complete(), Sessions::Enabled).unwrap();
        assert_eq!(source, PathBuf::from("/data/S1_P1_B2.mat"));
        assert_eq!(identity.subject, "sub-01");
        assert_eq!(identity.session.as_deref(), Some("ses-01"));
        assert_eq!(identity.run.as_deref(), Some("2"));
        assert!(identity.acquisition_label.is_none());
    }

    #[test]
    fn test_already_prefixed_labels_are_kept() {
        let record = complete().with_subject("sub-01").with_session("ses-01");
        let (_, prefixed) = Identity::from_record(record, Sessions::Enabled).unwrap();
        let (_, bare) = Identity::from_record(complete(), Sessions::Enabled).unwrap();
        assert_eq!(prefixed, bare);
    }

    #[test]
    fn test_sessions_disabled_drops_session() {
        let record = IdentityRecord { session: None, ..complete() };
        let (_, identity) = Identity::from_record(record, Sessions::Disabled).unwrap();
        assert!(identity.session.is_none());
        let (_, identity) = Identity::from_record(complete(), Sessions::Disabled).unwrap();
        assert!(identity.session.is_none());
    }

    #[rstest]
    #[case(IdentityRecord { subject: None, ..complete() }, "subject")]
    #[case(IdentityRecord { subject: Some("  ".into()), ..complete() }, "subject")]
    #[case(IdentityRecord { session: None, ..complete() }, "session")]
    #[case(IdentityRecord { data_type: None, ..complete() }, "data_type")]
    #[case(IdentityRecord { file_format: Some(".".into()), ..complete() }, "file_format")]
    #[case(IdentityRecord { modality: None, ..complete() }, "modality")]
    fn test_missing_field(#[case] record: IdentityRecord, #[case] field: &'static str) {
        let err = Identity::from_record(record, Sessions::Enabled).unwrap_err();
        assert_eq!(err.deref(), &ErrorKind::MissingField(field));
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let record = IdentityRecord { run: None, task: None, ..complete() };
        let (_, identity) = Identity::from_record(record, Sessions::Enabled).unwrap();
        assert!(identity.run.is_none());
        assert!(identity.task.is_none());
    }
}
