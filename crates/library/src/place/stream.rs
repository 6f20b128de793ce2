use crate::error::Result;
use crate::index::GroupEntry;
use crate::place::Plan;
use crate::place::file::{Placement, place_file};
use rec2bids_storage::StorageBackend;
use std::iter;

/// Progress events yielded by [`PlacementEngine::execute`](super::PlacementEngine::execute).
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete): exactly once, with the
///    number of entries about to be placed.
/// 3. [`Placed`](Self::Placed): zero or more times, one per entry (or an
///    `Err` item in its place).
/// 4. [`Complete`](Self::Complete): exactly once, last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceEvent {
    Started,
    DiscoveryComplete(u64),
    Placed(Placement),
    Complete,
}

pub(super) fn events<'a>(
    backend: &'a (dyn StorageBackend + Send + Sync),
    protect: &'a [String],
    plan: &'a Plan,
) -> impl Iterator<Item = Result<PlaceEvent>> + 'a {
    let total = u64::try_from(planned(plan).count()).unwrap_or(0);
    iter::once(Ok(PlaceEvent::Started))
        .chain(iter::once(Ok(PlaceEvent::DiscoveryComplete(total))))
        .chain(planned(plan).map(move |entry| place_file(backend, entry, protect).map(PlaceEvent::Placed)))
        .chain(iter::once(Ok(PlaceEvent::Complete)))
}

/// Entries without a target path are already among the plan's failures.
pub(super) fn planned(plan: &Plan) -> impl Iterator<Item = &GroupEntry> {
    plan.index.entries().filter(|entry| entry.target_path.is_some())
}
