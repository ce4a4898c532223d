//! Content-addressed target id allocation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::fingerprint::ContentHash;
use crate::mapping::MappingTable;

/// Wraps the persistent [`MappingTable`] with the per-run source id lookup
/// built while registering the save's map definitions.
#[derive(Debug, Clone, Default)]
pub struct ContentAllocator {
    table: MappingTable,
    sources: BTreeMap<i32, i32>,
    targets: BTreeSet<i32>,
}

impl ContentAllocator {
    pub fn new(table: MappingTable) -> Self {
        Self {
            table,
            sources: BTreeMap::new(),
            targets: BTreeSet::new(),
        }
    }

    /// Associate this run's `source_id` with `hash` and return its target id.
    ///
    /// A hash seen in any earlier run keeps the id it was given then.
    pub fn register_allocation(&mut self, hash: ContentHash, source_id: i32) -> i32 {
        let (target, fresh) = self.table.get_or_allocate(hash);
        if fresh {
            debug!("New map content {hash} -> target {target}");
        }
        if let Some(previous) = self.sources.insert(source_id, target) {
            if previous != target {
                warn!("Map {source_id} registered twice ({previous} then {target}), keeping {target}");
            }
        }
        self.targets.insert(target);
        target
    }

    /// Target id for a source id of the current save, if its definition was registered.
    pub fn resolve(&self, source_id: i32) -> Option<i32> {
        self.sources.get(&source_id).copied()
    }

    /// Whether `id` is a target id handed out in this run.
    pub fn is_target_id(&self, id: i32) -> bool {
        self.targets.contains(&id)
    }

    /// All target ids of this run, in ascending order.
    pub fn target_ids(&self) -> &BTreeSet<i32> {
        &self.targets
    }

    /// `source -> target` pairs registered in this run.
    pub fn sources(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.sources.iter().map(|(&s, &t)| (s, t))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn into_table(self) -> MappingTable {
        self.table
    }
}
