//! Turning identified recordings into a dataset layout.
//!
//! Records go into a [`GroupingIndex`], which files them by [`GroupKey`] and
//! drops exact duplicates. Groups holding more than one file are ordered by
//! acquisition time, the [`FilenameGenerator`] names every entry, and the
//! [`PlacementEngine`] copies them into the target storage.

mod describe;
pub mod error;
mod generator;
mod index;
pub mod place;

pub use crate::describe::{BIDS_VERSION, DESCRIPTION_FILE, DatasetDescription};
pub use crate::generator::{Collisions, FilenameGenerator};
pub use crate::index::{AddOutcome, Group, GroupEntry, GroupKey, GroupingIndex};
pub use crate::place::{PlaceEvent, Placement, PlacementEngine, Plan, Report};
