//! Region container errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("region file too small: {0} bytes (header needs 8192)")]
    TooSmall(usize),

    #[error("chunk ({x}, {z}) needs {sectors} sectors, more than a location entry can address")]
    ChunkTooLarge { x: u8, z: u8, sectors: usize },

    #[error("region file exceeds the 24-bit sector offset range")]
    FileTooLarge,
}
