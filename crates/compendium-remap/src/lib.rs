//! Map id remapping engine.
//!
//! Map definitions are fingerprinted by their pixel content and each distinct
//! fingerprint gets one target id that stays stable across runs
//! ([`MappingTable`], [`ContentAllocator`]). A [`RemapSession`] then walks the
//! save's chunk, entity, player and level trees and rewrites every map item
//! reference from its source id to its target id.

pub mod allocator;
pub mod error;
pub mod fingerprint;
pub mod heuristic;
pub mod mapping;
pub mod rewriter;
pub mod schema;
pub mod session;
pub mod stats;
mod walker;

pub use allocator::ContentAllocator;
pub use error::{MappingError, RewriteError};
pub use fingerprint::ContentHash;
pub use heuristic::{HeuristicInference, HeuristicKey, Holder};
pub use mapping::MappingTable;
pub use rewriter::{Encoding, ItemOutcome};
pub use schema::SchemaFields;
pub use session::RemapSession;
pub use stats::RemapStats;
