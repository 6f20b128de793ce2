//! Regex-driven identification rules.
//!
//! A [`Rule`] matches a file *name* (not the full path) against a regular
//! expression with named capture groups:
//!
//! | Group     | Required | Becomes                                        |
//! |-----------|----------|------------------------------------------------|
//! | `subject` | yes      | subject label                                  |
//! | `session` | no       | session label, also used to look up the task   |
//! | `run`     | no       | run label                                      |
//! | `task`    | no       | task label (overrides any configured task)     |
//! | `acq`     | no       | acquisition label                              |
//!
//! Numeric captures are zero-padded to the rule's padding width (two digits
//! by default), so `S1_P1_B2.mat` yields subject `01`, session `01`, run `02`.
//! The file extension picks a [`FormatRule`]; a file whose extension has no
//! format rule doesn't match, even if the name does.

use crate::error::{ErrorKind, Result};
use crate::models::IdentityRecord;
use crate::{Identification, Identify};
use exn::ResultExt;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_PADDING: usize = 2;

/// Data type and modality assigned to one file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRule {
    pub data_type: String,
    pub modality: String,
}
impl FormatRule {
    pub fn new(data_type: impl Into<String>, modality: impl Into<String>) -> Self {
        Self { data_type: data_type.into(), modality: modality.into() }
    }
}

/// A single identification rule. See the [module documentation](self).
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    /// Keyed by lowercase extension without the leading dot; may be compound
    /// (`nii.gz`).
    formats: HashMap<String, FormatRule>,
    task: Option<String>,
    /// Keyed by the session number with padding removed (`"1"`, not `"01"`).
    session_tasks: HashMap<String, String>,
    acquisition: Option<String>,
    padding: usize,
}
impl Rule {
    /// Compiles `pattern`, which must contain a `subject` capture group.
    pub fn new(pattern: impl AsRef<str>) -> Result<Self> {
        let pattern = pattern.as_ref();
        let regex = Regex::new(pattern).or_raise(|| ErrorKind::InvalidRule(pattern.to_string()))?;
        if !regex.capture_names().flatten().any(|name| name == "subject") {
            exn::bail!(ErrorKind::InvalidRule(format!("{pattern} (no `subject` capture group)")));
        }
        Ok(Self {
            pattern: regex,
            formats: HashMap::new(),
            task: None,
            session_tasks: HashMap::new(),
            acquisition: None,
            padding: DEFAULT_PADDING,
        })
    }

    pub fn with_format(mut self, extension: impl AsRef<str>, format: FormatRule) -> Self {
        let extension = extension.as_ref().trim().trim_start_matches('.').to_lowercase();
        self.formats.insert(extension, format);
        self
    }

    /// Task used when neither a `task` capture nor a session task applies.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Task for recordings from one particular session.
    pub fn with_session_task(mut self, session: impl AsRef<str>, task: impl Into<String>) -> Self {
        self.session_tasks.insert(unpad(session.as_ref()), task.into());
        self
    }

    pub fn with_acquisition(mut self, label: impl Into<String>) -> Self {
        self.acquisition = Some(label.into());
        self
    }

    /// Zero-padding width for numeric labels. Zero disables padding.
    pub fn with_padding(mut self, width: usize) -> Self {
        self.padding = width;
        self
    }

    /// Returns a record when both the name and the extension match.
    pub fn apply(&self, path: &Path) -> Option<IdentityRecord> {
        let name = path.file_name()?.to_str()?;
        let (extension, format) = self.format_for(name)?;
        let captures = self.pattern.captures(name)?;
        let label = |group: &str| self.label(&captures, group);

        let session = captures.name("session").map(|m| m.as_str());
        let task = label("task")
            .or_else(|| session.and_then(|s| self.session_tasks.get(&unpad(s))).cloned())
            .or_else(|| self.task.clone());

        let mut record = IdentityRecord::new(path)
            .with_data_type(&format.data_type)
            .with_file_format(extension)
            .with_modality(&format.modality);
        record.subject = label("subject");
        record.session = label("session");
        record.run = label("run");
        record.task = task;
        record.acquisition_label = label("acq").or_else(|| self.acquisition.clone());
        Some(record)
    }

    /// Longest configured extension that the file name ends with, so that
    /// `nii.gz` beats `gz`.
    fn format_for<'a>(&'a self, name: &str) -> Option<(&'a str, &'a FormatRule)> {
        let lower = name.to_lowercase();
        self.formats
            .iter()
            .filter(|(ext, _)| lower.len() > ext.len() + 1 && lower.ends_with(&format!(".{ext}")))
            .max_by_key(|(ext, _)| ext.len())
            .map(|(ext, format)| (ext.as_str(), format))
    }

    fn label(&self, captures: &Captures<'_>, group: &str) -> Option<String> {
        let value = captures.name(group)?.as_str();
        match value.parse::<u64>() {
            Ok(number) => Some(format!("{number:0width$}", width = self.padding)),
            Err(_) => Some(value.to_string()),
        }
    }
}

fn unpad(label: &str) -> String {
    label.parse::<u64>().map(|n| n.to_string()).unwrap_or_else(|_| label.to_string())
}

/// An [`Identify`] implementation that tries each [`Rule`] in order; the first
/// rule that matches wins and unmatched files are skipped.
#[derive(Debug, Clone, Default)]
pub struct PatternIdentifier {
    rules: Vec<Rule>,
}
impl PatternIdentifier {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self { rules: rules.into_iter().collect() }
    }
}
impl Identify for PatternIdentifier {
    fn identify(&self, path: &Path) -> Identification {
        match self.rules.iter().find_map(|rule| rule.apply(path)) {
            Some(record) => record.into(),
            None => {
                tracing::trace!(path = %path.display(), "No identification rule matched");
                Identification::Skipped
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// The behavioral experiment layout: `S<subject>_P<session>_B<block>`,
    /// MATLAB stimulus logs and EyeLink recordings, alternating tasks.
    fn experiment() -> Rule {
        let mut rule = Rule::new(r"S(?P<subject>\d+)_P(?P<session>\d)_B(?P<run>\d)")
            .unwrap()
            .with_format("mat", FormatRule::new("func", "stim"))
            .with_format("edf", FormatRule::new("func", "physio"));
        for session in 1..=6 {
            let task = if session % 2 == 1 { "inference" } else { "predict" };
            rule = rule.with_session_task(session.to_string(), task);
        }
        rule
    }

    #[test]
    fn test_identifies_experiment_file() {
        let record = experiment().apply(Path::new("/raw/S1_P1_B2.mat")).unwrap();
        assert_eq!(record.source_path(), Path::new("/raw/S1_P1_B2.mat"));
        assert_eq!(record.subject.as_deref(), Some("01"));
        assert_eq!(record.session.as_deref(), Some("01"));
        assert_eq!(record.run.as_deref(), Some("02"));
        assert_eq!(record.data_type.as_deref(), Some("func"));
        assert_eq!(record.task.as_deref(), Some("inference"));
        assert_eq!(record.file_format.as_deref(), Some("mat"));
        assert_eq!(record.modality.as_deref(), Some("stim"));
        assert!(record.acquisition_label.is_none());
    }

    #[rstest]
    #[case("S12_P2_B3.edf", "12", "predict", "physio")]
    #[case("S3_P5_B1.MAT", "03", "inference", "stim")]
    fn test_session_tasks_and_formats(
        #[case] name: &str,
        #[case] subject: &str,
        #[case] task: &str,
        #[case] modality: &str,
    ) {
        let record = experiment().apply(Path::new(name)).unwrap();
        assert_eq!(record.subject.as_deref(), Some(subject));
        assert_eq!(record.task.as_deref(), Some(task));
        assert_eq!(record.modality.as_deref(), Some(modality));
    }

    #[rstest]
    #[case("S1_P1_B2.txt")]
    #[case("notes.mat")]
    #[case("mat")]
    fn test_unmatched_files_are_skipped(#[case] name: &str) {
        let identifier = PatternIdentifier::new([experiment()]);
        assert!(identifier.identify(Path::new(name)).is_skipped());
    }

    #[test]
    fn test_compound_extension_wins() {
        let rule = Rule::new(r"^(?P<subject>[a-z]+)_t1")
            .unwrap()
            .with_format("gz", FormatRule::new("misc", "archive"))
            .with_format(".nii.gz", FormatRule::new("anat", "T1w"));
        let record = rule.apply(Path::new("alice_t1.nii.gz")).unwrap();
        assert_eq!(record.file_format.as_deref(), Some("nii.gz"));
        assert_eq!(record.modality.as_deref(), Some("T1w"));
        // Non-numeric labels are kept verbatim.
        assert_eq!(record.subject.as_deref(), Some("alice"));
    }

    #[test]
    fn test_padding_and_captured_task() {
        let rule = Rule::new(r"(?P<subject>\d+)-(?P<task>[a-z]+)-(?P<acq>[a-z]+)")
            .unwrap()
            .with_format("nii", FormatRule::new("func", "bold"))
            .with_task("fallback")
            .with_padding(3);
        let record = rule.apply(Path::new("7-rest-highres.nii")).unwrap();
        assert_eq!(record.subject.as_deref(), Some("007"));
        assert_eq!(record.task.as_deref(), Some("rest"));
        assert_eq!(record.acquisition_label.as_deref(), Some("highres"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let first = Rule::new(r"(?P<subject>\d+)").unwrap().with_format("nii", FormatRule::new("anat", "T1w"));
        let second = Rule::new(r"(?P<subject>\d+)").unwrap().with_format("nii", FormatRule::new("func", "bold"));
        let identifier = PatternIdentifier::new([first, second]);
        let records = identifier.identify(Path::new("01.nii")).into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].modality.as_deref(), Some("T1w"));
    }

    #[rstest]
    #[case(r"S(\d+)")]
    #[case(r"(?P<subject>")]
    fn test_invalid_rules(#[case] pattern: &str) {
        assert!(Rule::new(pattern).is_err());
    }
}
