//! Layered configuration for rec2bids.
//!
//! Settings are merged from, lowest priority first:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. an optional configuration file (TOML, YAML or JSON, picked by
//!    extension),
//! 3. `REC2BIDS_` environment variables, with `__` separating nested keys
//!    (`REC2BIDS_CONVERT__FORCE=true`),
//! 4. command-line [`Overrides`].

pub mod error;
mod rules;

pub use crate::rules::{FormatConfig, RuleConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use rec2bids_identify::PatternIdentifier;
use rec2bids_identify::models::Sessions;
use rec2bids_library::{Collisions, DatasetDescription};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "REC2BIDS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the raw recordings.
    pub source: Option<PathBuf>,
    /// Root of the dataset being built.
    pub target: Option<PathBuf>,
    /// Whether the dataset is organized into sessions.
    pub sessions: bool,
    pub collisions: Collisions,
    /// Source suffixes whose existing targets are never overwritten.
    pub protect: Vec<String>,
    pub dry_run: bool,
    /// Where acquisition times are memoized. Defaults to the platform cache
    /// directory.
    pub cache_dir: Option<PathBuf>,
    /// Disable the acquisition time cache entirely.
    pub no_cache: bool,
    pub convert: ConvertConfig,
    /// Written to `dataset_description.json` when set.
    pub dataset: Option<DatasetDescription>,
    pub rules: Vec<RuleConfig>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            sessions: true,
            collisions: Collisions::default(),
            protect: Vec::new(),
            dry_run: false,
            cache_dir: None,
            no_cache: false,
            convert: ConvertConfig::default(),
            dataset: None,
            rules: Vec::new(),
        }
    }
}

/// DICOM conversion settings. Conversion runs only when `output` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub output: Option<PathBuf>,
    /// Converter executable; `dcm2niix` on `PATH` when unset.
    pub binary: Option<PathBuf>,
    /// Re-convert directories that already have an output.
    pub force: bool,
    pub sniff: Sniff,
}

/// How DICOM directories are recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sniff {
    /// Every directory without subdirectories.
    None,
    /// Files with the `DICM` magic after the 128-byte preamble.
    #[default]
    Preamble,
    /// Ask the `file` utility.
    File,
}

/// Command-line settings; unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collisions: Option<Collisions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub protect: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_cache: Option<bool>,
    pub convert: ConvertOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvertOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sniff: Option<Sniff>,
}

impl Config {
    /// Defaults, then `file` (if any), then the environment.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            if !file.is_file() {
                exn::bail!(ErrorKind::FileNotFound(file.to_path_buf()));
            }
            let extension = file.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Loads every layer, with `overrides` on top.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let config: Self = Self::figment(file)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn sessions(&self) -> Sessions {
        Sessions::from(self.sessions)
    }

    pub fn source(&self) -> Result<&Path> {
        self.source.as_deref().ok_or_raise(|| ErrorKind::Missing("source"))
    }

    pub fn target(&self) -> Result<&Path> {
        self.target.as_deref().ok_or_raise(|| ErrorKind::Missing("target"))
    }

    /// The acquisition time cache directory, unless caching is disabled or
    /// the platform has no cache directory.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        if self.no_cache {
            return None;
        }
        self.cache_dir
            .clone()
            .or_else(|| ProjectDirs::from("", "", "rec2bids").map(|dirs| dirs.cache_dir().to_path_buf()))
    }

    /// Compiles the configured identification rules.
    pub fn identifier(&self) -> Result<PatternIdentifier> {
        if self.rules.is_empty() {
            exn::bail!(ErrorKind::Missing("rules"));
        }
        let rules = self
            .rules
            .iter()
            .enumerate()
            .map(|(position, rule)| rule.build().or_raise(|| ErrorKind::InvalidRule(position + 1)))
            .collect::<Result<Vec<_>>>()?;
        Ok(PatternIdentifier::new(rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rec2bids_identify::Identify;
    use rstest::rstest;

    const TOML: &str = r#"
        source = "/data/raw"
        target = "/data/bids"
        protect = [".json"]

        [convert]
        output = "/data/converted"

        [dataset]
        Name = "Inference"

        [[rules]]
        pattern = 'S(?P<subject>\d+)_P(?P<session>\d)_B(?P<run>\d)'
        session_tasks = { 1 = "inference", 2 = "predict" }

        [rules.formats]
        mat = { data_type = "func", modality = "stim" }
        edf = { data_type = "func", modality = "physio" }
    "#;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_| {
            let config = Config::load(None, &Overrides::default()).unwrap();
            assert_eq!(config, Config::default());
            assert!(config.sessions().is_enabled());
            assert_eq!(config.collisions, Collisions::Order);
            assert_eq!(config.convert.sniff, Sniff::Preamble);
            assert!(matches!(&*config.source().unwrap_err(), ErrorKind::Missing("source")));
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("rec2bids.toml", TOML)?;
            let config = Config::load(Some(Path::new("rec2bids.toml")), &Overrides::default()).unwrap();
            assert_eq!(config.source().unwrap(), Path::new("/data/raw"));
            assert_eq!(config.protect, [".json"]);
            assert_eq!(config.convert.output.as_deref(), Some(Path::new("/data/converted")));
            assert_eq!(config.dataset.as_ref().unwrap().name, "Inference");
            let identifier = config.identifier().unwrap();
            assert!(!identifier.identify(Path::new("S3_P2_B1.edf")).is_skipped());
            assert!(identifier.identify(Path::new("notes.txt")).is_skipped());
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("rec2bids.yml", "target: /data/bids\nsessions: false\ncollisions: overwrite\n")?;
            let config = Config::load(Some(Path::new("rec2bids.yml")), &Overrides::default()).unwrap();
            assert_eq!(config.target().unwrap(), Path::new("/data/bids"));
            assert!(!config.sessions().is_enabled());
            assert_eq!(config.collisions, Collisions::Overwrite);
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("rec2bids.toml", TOML)?;
            jail.set_env("REC2BIDS_TARGET", "/elsewhere");
            jail.set_env("REC2BIDS_CONVERT__FORCE", "true");
            let config = Config::load(Some(Path::new("rec2bids.toml")), &Overrides::default()).unwrap();
            assert_eq!(config.target().unwrap(), Path::new("/elsewhere"));
            assert!(config.convert.force);
            assert_eq!(config.convert.output.as_deref(), Some(Path::new("/data/converted")));
            Ok(())
        });
    }

    #[test]
    fn test_overrides_win() {
        Jail::expect_with(|jail| {
            jail.create_file("rec2bids.toml", TOML)?;
            jail.set_env("REC2BIDS_DRY_RUN", "false");
            let overrides = Overrides {
                target: Some("/cli".into()),
                dry_run: Some(true),
                convert: ConvertOverrides { sniff: Some(Sniff::File), ..ConvertOverrides::default() },
                ..Overrides::default()
            };
            let config = Config::load(Some(Path::new("rec2bids.toml")), &overrides).unwrap();
            assert_eq!(config.target().unwrap(), Path::new("/cli"));
            assert!(config.dry_run);
            assert_eq!(config.convert.sniff, Sniff::File);
            // Untouched by the overrides.
            assert_eq!(config.source().unwrap(), Path::new("/data/raw"));
            assert_eq!(config.convert.output.as_deref(), Some(Path::new("/data/converted")));
            Ok(())
        });
    }

    #[rstest]
    #[case("rec2bids.ini", "source = x")]
    #[case("rec2bids", "source = x")]
    fn test_unsupported_format(#[case] name: &str, #[case] contents: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let err = Config::figment(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::figment(Some(Path::new("/definitely/not/rec2bids.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::FileNotFound(_)));
    }

    #[test]
    fn test_rules_are_validated() {
        let mut config = Config::default();
        assert!(matches!(&*config.identifier().unwrap_err(), ErrorKind::Missing("rules")));
        config.rules.push(RuleConfig {
            pattern: "(".to_string(),
            formats: Default::default(),
            task: None,
            session_tasks: Default::default(),
            acquisition: None,
            padding: None,
        });
        assert!(matches!(&*config.identifier().unwrap_err(), ErrorKind::InvalidRule(1)));
    }

    #[test]
    fn test_cache_dir() {
        let config = Config { cache_dir: Some("/tmp/cache".into()), ..Config::default() };
        assert_eq!(config.cache_dir(), Some(PathBuf::from("/tmp/cache")));
        assert_eq!(Config { no_cache: true, ..config }.cache_dir(), None);
    }
}
