use rec2bids_identify::error::Result as IdentifyResult;
use rec2bids_identify::{FormatRule, Rule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An identification rule as written in the configuration file.
///
/// ```toml
/// [[rules]]
/// pattern = 'S(?P<subject>\d+)_P(?P<session>\d)_B(?P<run>\d)'
/// session_tasks = { 1 = "inference", 2 = "predict" }
///
/// [rules.formats]
/// mat = { data_type = "func", modality = "stim" }
/// edf = { data_type = "func", modality = "physio" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    #[serde(default)]
    pub formats: BTreeMap<String, FormatConfig>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub session_tasks: BTreeMap<String, String>,
    #[serde(default)]
    pub acquisition: Option<String>,
    /// Zero-padding width for numeric labels.
    #[serde(default)]
    pub padding: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    pub data_type: String,
    pub modality: String,
}

impl RuleConfig {
    pub fn build(&self) -> IdentifyResult<Rule> {
        let mut rule = Rule::new(&self.pattern)?;
        for (extension, format) in &self.formats {
            rule = rule.with_format(extension, FormatRule::new(&format.data_type, &format.modality));
        }
        for (session, task) in &self.session_tasks {
            rule = rule.with_session_task(session, task);
        }
        if let Some(task) = &self.task {
            rule = rule.with_task(task);
        }
        if let Some(acquisition) = &self.acquisition {
            rule = rule.with_acquisition(acquisition);
        }
        if let Some(padding) = self.padding {
            rule = rule.with_padding(padding);
        }
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec2bids_identify::Identify;
    use std::path::Path;

    fn experiment() -> RuleConfig {
        RuleConfig {
            pattern: r"S(?P<subject>\d+)_P(?P<session>\d)_B(?P<run>\d)".to_string(),
            formats: BTreeMap::from([(
                "mat".to_string(),
                FormatConfig { data_type: "func".to_string(), modality: "stim".to_string() },
            )]),
            task: None,
            session_tasks: BTreeMap::from([("1".to_string(), "inference".to_string())]),
            acquisition: None,
            padding: None,
        }
    }

    #[test]
    fn test_builds_working_rule() {
        let rule = experiment().build().unwrap();
        let record = rule.apply(Path::new("/raw/S1_P1_B2.mat")).unwrap();
        assert_eq!(record.subject.as_deref(), Some("01"));
        assert_eq!(record.task.as_deref(), Some("inference"));
        assert_eq!(record.modality.as_deref(), Some("stim"));
        let identifier = rec2bids_identify::PatternIdentifier::new([rule]);
        assert!(identifier.identify(Path::new("/raw/S1_P1_B2.edf")).is_skipped());
    }

    #[test]
    fn test_padding_is_applied() {
        let rule = RuleConfig { padding: Some(0), ..experiment() }.build().unwrap();
        let record = rule.apply(Path::new("S1_P1_B2.mat")).unwrap();
        assert_eq!(record.subject.as_deref(), Some("1"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RuleConfig { pattern: "(".to_string(), ..experiment() }.build().is_err());
        assert!(RuleConfig { pattern: r"S\d+".to_string(), ..experiment() }.build().is_err());
    }
}
