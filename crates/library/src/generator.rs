//! Dataset path generation.
//!
//! Every entry is placed at
//!
//! ```text
//! sub-<label>[/ses-<label>]/<data_type>/<filename>
//! ```
//!
//! where the filename is built from these tokens, in order, each present
//! only when its label is:
//!
//! | Token              | Example              |
//! |--------------------|----------------------|
//! | subject            | `sub-01`             |
//! | `_` session        | `_ses-01`            |
//! | `_task-` task      | `_task-inference`    |
//! | `_` acquisition    | `_acq-highres`       |
//! | `_run-` run        | `_run-2`             |
//! | `ORD` order index  | `ORD01`              |
//! | `_` modality       | `_stim`              |
//! | `.` file format    | `.mat`               |
//!
//! The order index is glued onto the previous token without a separator, so
//! two recordings of the same run become `..._run-2ORD01_stim.mat` and
//! `..._run-2ORD02_stim.mat`.

use crate::error::{Error, ErrorKind, Result};
use crate::index::GroupingIndex;
use exn::ResultExt;
use rec2bids_identify::models::{Identity, Sessions};
use rec2bids_storage::validate_path;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::instrument;

/// What happens when several files share one [`GroupKey`](crate::GroupKey).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collisions {
    /// Number them by acquisition time (`ORD01`, `ORD02`, ...).
    #[default]
    Order,
    /// Give them all the same name; the last one placed wins.
    Overwrite,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameGenerator {
    sessions: Sessions,
}
impl FilenameGenerator {
    pub fn new(sessions: Sessions) -> Self {
        Self { sessions }
    }

    /// The dataset-relative path for `identity`.
    ///
    /// Fails with [`ErrorKind::Generate`] when a label contains a path
    /// separator or would otherwise change the directory layout.
    pub fn generate(&self, identity: &Identity, order_index: Option<u32>) -> Result<PathBuf> {
        let session = identity.session.as_deref().filter(|_| self.sessions.is_enabled());

        let mut directory = vec![identity.subject.as_str()];
        directory.extend(session);
        directory.push(&identity.data_type);

        let mut filename = identity.subject.clone();
        // Writing to a String can't fail.
        if let Some(session) = session {
            _ = write!(filename, "_{session}");
        }
        if let Some(task) = &identity.task {
            _ = write!(filename, "_task-{task}");
        }
        if let Some(acquisition) = &identity.acquisition_label {
            _ = write!(filename, "_{acquisition}");
        }
        if let Some(run) = &identity.run {
            _ = write!(filename, "_run-{run}");
        }
        if let Some(order) = order_index {
            _ = write!(filename, "ORD{order:02}");
        }
        _ = write!(filename, "_{}.{}", identity.modality, identity.file_format);

        let expected = directory.len() + 1;
        let raw: PathBuf = directory.into_iter().chain([filename.as_str()]).collect();
        let path = validate_path(&raw).or_raise(|| ErrorKind::Generate)?;
        if path.components().count() != expected || path != raw {
            tracing::debug!(path = %raw.display(), "Labels change the dataset layout");
            exn::bail!(ErrorKind::Generate);
        }
        Ok(path)
    }

    /// Assigns an order index and target path to every entry of `index`.
    ///
    /// Single-entry groups never get an order index. Larger groups are
    /// numbered from 1 in their current order with [`Collisions::Order`];
    /// with [`Collisions::Overwrite`] they are left unnumbered and each group
    /// whose entries end up sharing a path is logged.
    ///
    /// Entries whose path can't be generated keep no target path and are
    /// returned with their error.
    #[instrument(skip_all, fields(collisions = ?collisions))]
    pub fn generate_for_groups(
        &self,
        index: &mut GroupingIndex,
        collisions: Collisions,
    ) -> Vec<(PathBuf, Error)> {
        let mut failures = Vec::new();
        for group in index.groups_mut() {
            let numbered = group.len() > 1 && collisions == Collisions::Order;
            let mut targets = HashSet::new();
            let mut overwritten = 0usize;
            for (position, entry) in group.entries_mut().iter_mut().enumerate() {
                // Infallible in practice: a group would need four billion entries.
                entry.order_index = numbered.then(|| u32::try_from(position + 1).unwrap_or(u32::MAX));
                entry.target_path = match self.generate(&entry.identity, entry.order_index) {
                    Ok(target) => {
                        if !targets.insert(target.clone()) {
                            overwritten += 1;
                        }
                        Some(target)
                    },
                    Err(e) => {
                        failures.push((entry.source_path.clone(), e));
                        None
                    },
                };
            }
            if overwritten > 0 {
                let key = group.key();
                tracing::warn!(
                    subject = %key.subject,
                    data_type = %key.data_type,
                    modality = %key.modality,
                    overwritten,
                    "Files share a dataset path and will overwrite each other"
                );
            }
        }
        failures
    }
}
