//! Grouping identified recordings into logical slots.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rec2bids_identify::models::{Identity, IdentityRecord, Sessions};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// The labels that decide which files compete for the same dataset path.
///
/// Task and acquisition label are deliberately absent: they only decorate
/// the generated filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub subject: String,
    pub session: Option<String>,
    pub run: Option<String>,
    pub data_type: String,
    pub file_format: String,
    pub modality: String,
}
impl From<&Identity> for GroupKey {
    fn from(identity: &Identity) -> Self {
        Self {
            subject: identity.subject.clone(),
            session: identity.session.clone(),
            run: identity.run.clone(),
            data_type: identity.data_type.clone(),
            file_format: identity.file_format.clone(),
            modality: identity.modality.clone(),
        }
    }
}

/// One source file within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub source_path: PathBuf,
    pub identity: Identity,
    /// 1-based position within a time-ordered group, set during generation.
    pub order_index: Option<u32>,
    /// Path relative to the dataset root, set during generation.
    pub target_path: Option<PathBuf>,
}
impl GroupEntry {
    pub fn new(source_path: impl Into<PathBuf>, identity: Identity) -> Self {
        Self { source_path: source_path.into(), identity, order_index: None, target_path: None }
    }

    fn is_duplicate_of(&self, other: &Self) -> bool {
        self.source_path == other.source_path && self.identity == other.identity
    }
}

/// Every entry sharing one [`GroupKey`], in insertion order until sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    key: GroupKey,
    entries: Vec<GroupEntry>,
}
impl Group {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn entries(&self) -> &[GroupEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [GroupEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// An entry with the same source path and identity was already present.
    Duplicate,
}

/// All identified entries of a run, grouped by [`GroupKey`].
///
/// Groups live in a single list in creation order; the key map only stores
/// positions into it. Iterating the groups and looking one up by key always
/// see the same entries.
#[derive(Debug, Clone, Default)]
pub struct GroupingIndex {
    sessions: Sessions,
    positions: HashMap<GroupKey, usize>,
    groups: Vec<Group>,
}
impl GroupingIndex {
    pub fn new(sessions: Sessions) -> Self {
        Self { sessions, ..Self::default() }
    }

    pub fn sessions(&self) -> Sessions {
        self.sessions
    }

    /// Validates and normalizes `record`, then files it under its key.
    ///
    /// Adding the same file with the same identity twice is a no-op, so
    /// re-identifying a file can't produce two copies of it.
    pub fn add(&mut self, record: IdentityRecord) -> Result<AddOutcome> {
        let path = record.source_path.clone();
        let (source_path, identity) =
            Identity::from_record(record, self.sessions).or_raise(|| ErrorKind::Identity(path))?;
        let entry = GroupEntry::new(source_path, identity);
        let key = GroupKey::from(&entry.identity);
        match self.positions.get(&key) {
            Some(&position) => {
                let group = &mut self.groups[position];
                if group.entries.iter().any(|existing| existing.is_duplicate_of(&entry)) {
                    tracing::debug!(source = %entry.source_path.display(), "Duplicate entry ignored");
                    return Ok(AddOutcome::Duplicate);
                }
                group.entries.push(entry);
            },
            None => {
                self.positions.insert(key.clone(), self.groups.len());
                self.groups.push(Group { key, entries: vec![entry] });
            },
        }
        Ok(AddOutcome::Added)
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Group> {
        self.positions.get(key).map(|&position| &self.groups[position])
    }

    /// Groups in the order they were created.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut [Group] {
        &mut self.groups
    }

    /// Every entry of every group.
    pub fn entries(&self) -> impl Iterator<Item = &GroupEntry> {
        self.groups.iter().flat_map(|group| group.entries.iter())
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Orders the entries of every multi-entry group by `timestamp`,
    /// ascending. The sort is stable, so equal timestamps keep insertion
    /// order.
    ///
    /// Single-entry groups are never looked up. When `timestamp` fails for
    /// any entry of a group, that group is logged and left in insertion
    /// order.
    #[instrument(skip_all)]
    pub fn sort_groups<T, E, F>(&mut self, mut timestamp: F)
    where
        T: Ord,
        E: Display,
        F: FnMut(&Path) -> std::result::Result<T, E>,
    {
        for group in self.groups.iter_mut().filter(|group| group.len() > 1) {
            let keys: std::result::Result<Vec<T>, E> =
                group.entries.iter().map(|entry| timestamp(&entry.source_path)).collect();
            let keys = match keys {
                Ok(keys) => keys,
                Err(e) => {
                    let subject = &group.key.subject;
                    tracing::warn!(%subject, modality = %group.key.modality, error = %e, "Keeping insertion order");
                    continue;
                },
            };
            let mut keyed: Vec<(T, GroupEntry)> = keys.into_iter().zip(group.entries.drain(..)).collect();
            keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
            group.entries.extend(keyed.into_iter().map(|(_, entry)| entry));
        }
    }

    /// Like [`sort_groups`](Self::sort_groups) for a collaborator that never
    /// fails.
    pub fn sort_groups_by<T: Ord>(&mut self, mut timestamp: impl FnMut(&Path) -> T) {
        self.sort_groups(|path| Ok::<_, std::convert::Infallible>(timestamp(path)));
    }
}
