//! Anvil region (`.mca`) container for Minecraft Java Edition.
//!
//! Splits a region file into per-chunk NBT trees and reassembles it after
//! the trees have been modified.

pub mod compression;
pub mod error;
pub mod region;

pub use compression::ChunkCompression;
pub use error::RegionError;
pub use region::{ChunkPayload, Region, RegionChunk};
