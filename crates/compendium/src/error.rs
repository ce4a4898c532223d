//! Run-level error types.

use std::path::PathBuf;

use compendium_nbt::NbtError;
use compendium_region::RegionError;
use compendium_remap::MappingError;
use thiserror::Error;

/// Failures that stop the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("input directory {0} does not exist")]
    MissingInput(PathBuf),

    #[error("map data directory {0} does not exist")]
    MissingMapData(PathBuf),

    #[error("output directory {output} is inside input directory {input}")]
    OutputInsideInput { input: PathBuf, output: PathBuf },

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| RunError::Io { path, source }
    }
}

/// Failures confined to one save file. The file is skipped.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Nbt(#[from] NbtError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("map definition has no data.colors array")]
    NoColors,

    #[error("file name does not carry a map id")]
    BadMapName,
}
