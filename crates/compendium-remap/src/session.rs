//! The per-run remapping state.
//!
//! One [`RemapSession`] owns the allocator, the inference memo and the
//! counters. Item rewriting lives in `rewriter.rs` and tree traversal in
//! `walker.rs`, both as further `impl RemapSession` blocks.

use tracing::{debug, warn};

use crate::allocator::ContentAllocator;
use crate::heuristic::HeuristicInference;
use crate::stats::RemapStats;

/// What to do with one id found in a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Already a target id or a negative sentinel; leave it.
    Keep(i32),
    /// Known source id.
    Remap { source: i32, target: i32 },
    /// Source id whose definition is not part of this save.
    Missing(i32),
}

impl Resolution {
    /// The value the field should hold afterwards.
    pub(crate) fn value(self) -> i32 {
        match self {
            Resolution::Keep(id) => id,
            Resolution::Remap { target, .. } => target,
            Resolution::Missing(source) => -source,
        }
    }

    pub(crate) fn changes_field(self) -> bool {
        !matches!(self, Resolution::Keep(_))
    }
}

pub struct RemapSession {
    pub(crate) allocator: ContentAllocator,
    pub(crate) inference: HeuristicInference,
    pub(crate) stats: RemapStats,
}

impl RemapSession {
    /// Start rewriting with an allocator whose map definitions are registered.
    pub fn new(allocator: ContentAllocator) -> Self {
        Self {
            allocator,
            inference: HeuristicInference::new(),
            stats: RemapStats::default(),
        }
    }

    pub fn allocator(&self) -> &ContentAllocator {
        &self.allocator
    }

    pub fn stats(&self) -> &RemapStats {
        &self.stats
    }

    pub fn inference(&self) -> &HeuristicInference {
        &self.inference
    }

    pub fn into_parts(self) -> (ContentAllocator, RemapStats) {
        (self.allocator, self.stats)
    }

    pub(crate) fn classify(&self, id: i32) -> Resolution {
        if id < 0 || self.allocator.is_target_id(id) {
            return Resolution::Keep(id);
        }
        match self.allocator.resolve(id) {
            Some(target) => Resolution::Remap { source: id, target },
            None => Resolution::Missing(id),
        }
    }

    /// Count a resolution once its value has been written.
    pub(crate) fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Keep(id) => {
                self.stats.passthrough += 1;
                debug!("Map id {id} left as is");
            }
            Resolution::Remap { source, target } => {
                self.stats.remapped += 1;
                self.stats.found.push((source, target));
                debug!("Remapped map {source} -> {target}");
            }
            Resolution::Missing(source) => {
                self.stats.not_found.push(source);
                warn!("Map id {source} not found in mapping database, writing {}", -source);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fingerprint::ContentHash;

    /// A session whose save defines the given source ids, each with distinct content.
    pub(crate) fn session_with(sources: &[i32]) -> RemapSession {
        let mut allocator = ContentAllocator::default();
        for &source in sources {
            allocator.register_allocation(ContentHash::of(&source.to_be_bytes()), source);
        }
        RemapSession::new(allocator)
    }

    #[test]
    fn classification() {
        // 4 -> 0, 9 -> 1
        let session = session_with(&[4, 9]);
        assert_eq!(session.classify(4), Resolution::Remap { source: 4, target: 0 });
        assert_eq!(session.classify(1), Resolution::Keep(1));
        assert_eq!(session.classify(-4), Resolution::Keep(-4));
        assert_eq!(session.classify(7), Resolution::Missing(7));
        assert_eq!(Resolution::Missing(7).value(), -7);
    }

    #[test]
    fn recording_updates_counters() {
        let mut session = session_with(&[4]);
        session.record(Resolution::Remap { source: 4, target: 0 });
        session.record(Resolution::Missing(7));
        session.record(Resolution::Missing(7));
        session.record(Resolution::Keep(0));

        let stats = session.stats();
        assert_eq!(stats.remapped, 1);
        assert_eq!(stats.passthrough, 1);
        assert_eq!(stats.found, vec![(4, 0)]);
        assert_eq!(stats.not_found, vec![7, 7]);
    }
}
