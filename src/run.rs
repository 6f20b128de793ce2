//! Wiring the crates together for one command-line invocation.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use indicatif::{ProgressBar, ProgressStyle};
use rec2bids_cache::Cache;
use rec2bids_config::{Config, Sniff};
use rec2bids_convert::{ConversionGate, Dcm2niix, Detection, DicomSet, FileCommandSniffer, PreambleSniffer};
use rec2bids_library::{PlaceEvent, PlacementEngine, Report};
use rec2bids_storage::BackendHandle;
use rec2bids_storage::backend::{DryRunBackend, LocalBackend};
use rec2bids_timestamp::TimestampOracle;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Outcome of a run: the placement [`Report`] plus what failed before
/// placement started.
#[derive(Debug, Default)]
pub struct Summary {
    pub report: Report,
    /// Source entries the walk couldn't read.
    pub unreadable: usize,
    pub conversions_failed: Vec<PathBuf>,
}
impl Summary {
    pub fn failures(&self) -> usize {
        self.report.failures.len() + self.unreadable + self.conversions_failed.len()
    }
}

#[instrument(skip_all)]
pub fn run(config: &Config, progress: bool) -> Result<Summary> {
    let source = config.source().or_raise(|| ErrorKind::Config)?;
    let target = config.target().or_raise(|| ErrorKind::Config)?;
    let identifier = config.identifier().or_raise(|| ErrorKind::Config)?;
    let mut summary = Summary::default();

    let mut files = Vec::new();
    for file in rec2bids_storage::walk(source) {
        match file {
            Ok(file) => files.push(file),
            Err(e) => {
                tracing::warn!(error = %*e, "Cannot read source entry");
                summary.unreadable += 1;
            },
        }
    }
    tracing::info!(source = %source.display(), files = files.len(), "Source walked");

    if let Some(output) = &config.convert.output {
        let gate = ConversionGate::new(converter(config)?, output).with_force(config.convert.force);
        let converted = DicomSet::new(files, &detection(config.convert.sniff)?).convert(&gate);
        tracing::info!(converted = converted.converted, cached = converted.cached, "DICOM conversion complete");
        summary.conversions_failed = converted.failures.into_iter().map(|(directory, _)| directory).collect();
        files = converted.files;
    }

    let oracle = match config.cache_dir() {
        Some(directory) => match Cache::open(&directory) {
            Ok(cache) => TimestampOracle::default().with_cache(cache),
            Err(e) => {
                let directory = directory.display();
                tracing::warn!(%directory, error = %*e, "Acquisition times won't be cached");
                TimestampOracle::default()
            },
        },
        None => TimestampOracle::default(),
    };

    let backend = backend(target, config.dry_run)?;
    let engine = PlacementEngine::new(backend.clone())
        .with_sessions(config.sessions())
        .with_collisions(config.collisions)
        .with_protect(config.protect.iter().cloned());
    let plan = engine.plan(&files, &identifier, |path: &Path| Ok::<_, Infallible>(oracle.timestamp(path)));

    let bar = progress_bar(progress);
    summary.report = engine.report(&plan, |event| match event {
        PlaceEvent::DiscoveryComplete(total) => bar.set_length(*total),
        PlaceEvent::Placed(placement) => {
            bar.set_message(placement.target().display().to_string());
            bar.inc(1);
        },
        PlaceEvent::Started | PlaceEvent::Complete => {},
    });
    bar.finish_and_clear();
    summary.report.failures.extend(plan.failures);

    if let Some(description) = &config.dataset
        && let Err(e) = description.write(backend.as_ref())
    {
        tracing::warn!(error = ?e, "Dataset description not written");
        summary.report.failures.push((PathBuf::from(rec2bids_library::DESCRIPTION_FILE), e));
    }
    Ok(summary)
}

fn converter(config: &Config) -> Result<Dcm2niix> {
    let converter = match &config.convert.binary {
        Some(binary) => Dcm2niix::with_binary(binary),
        None => Dcm2niix::discover(),
    };
    converter.or_raise(|| ErrorKind::Convert)
}

fn detection(sniff: Sniff) -> Result<Detection> {
    Ok(match sniff {
        Sniff::None => Detection::Leaf,
        Sniff::Preamble => Detection::sniff(PreambleSniffer),
        Sniff::File => Detection::sniff(FileCommandSniffer::discover().or_raise(|| ErrorKind::Convert)?),
    })
}

/// The target directory, wrapped so nothing is written during a dry run.
fn backend(target: &Path, dry_run: bool) -> Result<BackendHandle> {
    let root = std::path::absolute(target).or_raise(|| ErrorKind::Storage)?;
    let local: BackendHandle = Arc::new(LocalBackend::new("dataset", root).or_raise(|| ErrorKind::Storage)?);
    Ok(match dry_run {
        true => Arc::new(DryRunBackend::new(local)),
        false => local,
    })
}

fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}") {
        bar.set_style(style);
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec2bids_config::{FormatConfig, RuleConfig};
    use std::collections::BTreeMap;
    use std::fs;

    fn config(root: &Path) -> Config {
        let rule = RuleConfig {
            pattern: r"S(?P<subject>\d+)_P(?P<session>\d)_B(?P<run>\d)".to_string(),
            formats: BTreeMap::from([
                ("mat".to_string(), FormatConfig { data_type: "func".to_string(), modality: "stim".to_string() }),
                ("edf".to_string(), FormatConfig { data_type: "func".to_string(), modality: "physio".to_string() }),
            ]),
            task: Some("inference".to_string()),
            session_tasks: BTreeMap::new(),
            acquisition: None,
            padding: None,
        };
        Config {
            source: Some(root.join("raw")),
            target: Some(root.join("bids")),
            no_cache: true,
            rules: vec![rule],
            ..Config::default()
        }
    }

    fn raw(root: &Path) {
        fs::create_dir_all(root.join("raw/S1")).unwrap();
        fs::write(root.join("raw/S1/S1_P1_B1.mat"), b"stim").unwrap();
        fs::write(root.join("raw/S1/S1_P1_B1.edf"), b"eyelink").unwrap();
        fs::write(root.join("raw/S1/notes.txt"), b"").unwrap();
    }

    #[test]
    fn test_places_identified_files() {
        let dir = tempfile::tempdir().unwrap();
        raw(dir.path());
        let summary = run(&config(dir.path()), false).unwrap();
        assert_eq!(summary.failures(), 0);
        assert_eq!((summary.report.copied, summary.report.skipped), (2, 1));
        let func = dir.path().join("bids/sub-01/ses-01/func");
        assert!(func.join("sub-01_ses-01_task-inference_run-01_stim.mat").is_file());
        assert!(func.join("sub-01_ses-01_task-inference_run-01_physio.edf").is_file());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        raw(dir.path());
        let config = Config {
            dry_run: true,
            dataset: Some(rec2bids_library::DatasetDescription::new("Inference")),
            ..config(dir.path())
        };
        let summary = run(&config, false).unwrap();
        assert_eq!(summary.report.copied, 2);
        assert!(!dir.path().join("bids/sub-01").exists());
        assert!(!dir.path().join("bids/dataset_description.json").exists());
    }

    #[test]
    fn test_incomplete_identification_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        raw(dir.path());
        fs::write(dir.path().join("raw/S1/S1_B2.mat"), b"stim").unwrap();
        let mut config = config(dir.path());
        let mut sessionless = config.rules[0].clone();
        sessionless.pattern = r"S(?P<subject>\d+)_B(?P<run>\d)".to_string();
        config.rules.push(sessionless);

        let summary = run(&config, false).unwrap();
        assert_eq!(summary.report.copied, 2);
        assert_eq!(summary.failures(), 1);
        let (path, e) = &summary.report.failures[0];
        assert_eq!(path, &dir.path().join("raw/S1/S1_B2.mat"));
        assert!(matches!(&**e, rec2bids_library::error::ErrorKind::Identity(_)), "{e:?}");
    }

    #[test]
    fn test_requires_rules() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { rules: Vec::new(), ..config(dir.path()) };
        assert!(matches!(&*run(&config, false).unwrap_err(), ErrorKind::Config));
    }
}
