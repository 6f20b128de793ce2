//! Placing identified recordings into the dataset.
//!
//! [`PlacementEngine::run`] drives the whole pipeline in two phases:
//!
//! 1. [`plan`](PlacementEngine::plan): identify every path, add the records
//!    to a [`GroupingIndex`], order multi-file groups by acquisition time and
//!    generate a target path for every entry.
//! 2. [`execute`](PlacementEngine::execute): copy each planned entry into the
//!    [storage backend](rec2bids_storage), yielding a [`PlaceEvent`] per
//!    entry as it goes.
//!
//! Nothing in either phase aborts the run. Files that fail identification,
//! generation or copying are collected with their error and reported at the
//! end, and everything else is still placed.

mod file;
mod stream;

pub use self::file::{Placement, is_protected, place_file};
pub use self::stream::PlaceEvent;
use crate::error::{Error, ErrorKind, Result as LibraryResult};
use crate::generator::{Collisions, FilenameGenerator};
use crate::index::{AddOutcome, GroupingIndex};
use rec2bids_identify::models::Sessions;
use rec2bids_identify::{Identification, Identify};
use rec2bids_storage::BackendHandle;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// The result of [`PlacementEngine::plan`].
#[derive(Debug, Default)]
pub struct Plan {
    pub index: GroupingIndex,
    /// Paths that were identified but couldn't be added or named.
    pub failures: Vec<(PathBuf, Error)>,
    pub identified: usize,
    pub skipped: usize,
    pub duplicates: usize,
}
impl Plan {
    /// Entries that received a target path.
    pub fn planned(&self) -> usize {
        stream::planned(self).count()
    }
}

/// Summary of a finished run.
#[derive(Debug, Default)]
pub struct Report {
    pub identified: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub copied: usize,
    pub overwritten: usize,
    pub protected: usize,
    /// Every file that could not be placed, with its error.
    pub failures: Vec<(PathBuf, Error)>,
}
impl Report {
    pub fn placed(&self) -> usize {
        self.copied + self.overwritten
    }

    fn record(&mut self, placement: &Placement) {
        match placement {
            Placement::Copied(_) => self.copied += 1,
            Placement::Overwritten(_) => self.overwritten += 1,
            Placement::Protected(_) => self.protected += 1,
        }
    }
}

pub struct PlacementEngine {
    backend: BackendHandle,
    sessions: Sessions,
    collisions: Collisions,
    protect: Vec<String>,
}
impl PlacementEngine {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend, sessions: Sessions::default(), collisions: Collisions::default(), protect: Vec::new() }
    }

    pub fn with_sessions(mut self, sessions: Sessions) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_collisions(mut self, collisions: Collisions) -> Self {
        self.collisions = collisions;
        self
    }

    /// Source suffixes whose existing targets are never overwritten.
    pub fn with_protect(mut self, suffixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.protect = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Identifies, groups, orders and names every path.
    ///
    /// `timestamp` orders multi-file groups; see
    /// [`GroupingIndex::sort_groups`] for how its failures are handled.
    #[instrument(skip_all)]
    pub fn plan<T, E>(
        &self,
        paths: impl IntoIterator<Item = impl AsRef<Path>>,
        identify: &impl Identify,
        timestamp: impl FnMut(&Path) -> Result<T, E>,
    ) -> Plan
    where
        T: Ord,
        E: Display,
    {
        let mut plan = Plan { index: GroupingIndex::new(self.sessions), ..Plan::default() };
        for path in paths {
            let path = path.as_ref();
            let records = match identify.identify(path) {
                Identification::Identified(records) => records,
                Identification::Skipped => {
                    tracing::debug!(path = %path.display(), "Skipped");
                    plan.skipped += 1;
                    continue;
                },
            };
            plan.identified += 1;
            for record in records {
                match plan.index.add(record) {
                    Ok(AddOutcome::Added) => {},
                    Ok(AddOutcome::Duplicate) => plan.duplicates += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = ?e, "Cannot add identified file");
                        plan.failures.push((path.to_path_buf(), e));
                    },
                }
            }
        }
        tracing::info!(
            identified = plan.identified,
            skipped = plan.skipped,
            groups = plan.index.groups().len(),
            "Identification complete"
        );

        plan.index.sort_groups(timestamp);
        let generator = FilenameGenerator::new(self.sessions);
        for (source, e) in generator.generate_for_groups(&mut plan.index, self.collisions) {
            tracing::warn!(source = %source.display(), error = ?e, "Cannot generate dataset path");
            plan.failures.push((source, e));
        }
        plan
    }

    /// Places every planned entry of `plan`.
    ///
    /// See [`PlaceEvent`] for the event order. Per-entry failures are yielded
    /// as `Err` items and don't end the iteration.
    pub fn execute<'a>(&'a self, plan: &'a Plan) -> impl Iterator<Item = LibraryResult<PlaceEvent>> + 'a {
        stream::events(self.backend.as_ref(), &self.protect, plan)
    }

    /// Plans and places `paths` in one go.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub fn run<T, E>(
        &self,
        paths: impl IntoIterator<Item = impl AsRef<Path>>,
        identify: &impl Identify,
        timestamp: impl FnMut(&Path) -> Result<T, E>,
    ) -> Report
    where
        T: Ord,
        E: Display,
    {
        let plan = self.plan(paths, identify, timestamp);
        let mut report = self.report(&plan, |_| {});
        report.failures.extend(plan.failures);
        report
    }

    /// Executes `plan`, passing every event to `progress`, and tallies the
    /// outcome. The plan's own failures are not included.
    pub fn report(&self, plan: &Plan, mut progress: impl FnMut(&PlaceEvent)) -> Report {
        let mut report = Report {
            identified: plan.identified,
            skipped: plan.skipped,
            duplicates: plan.duplicates,
            ..Report::default()
        };
        for event in self.execute(plan) {
            match event {
                Ok(event) => {
                    if let PlaceEvent::Placed(placement) = &event {
                        report.record(placement);
                    }
                    progress(&event);
                },
                Err(e) => {
                    tracing::warn!(error = ?e, "Placement failed");
                    let source = match &*e {
                        ErrorKind::Placement { source, .. } | ErrorKind::Unplanned(source) => source.clone(),
                        _ => PathBuf::new(),
                    };
                    report.failures.push((source, e));
                },
            }
        }
        tracing::info!(
            copied = report.copied,
            overwritten = report.overwritten,
            protected = report.protected,
            failed = report.failures.len(),
            "Placement complete"
        );
        report
    }
}
