//! Engine error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failures loading or saving the persistent mapping table.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed mapping file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("target id {id} is assigned to more than one content hash")]
    DuplicateTarget { id: i32 },

    #[error("target id {id} is negative")]
    NegativeTarget { id: i32 },
}

/// A structural anomaly on a single node. The node is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("field `{field}` is {found}, expected {expected}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("map id {id} does not fit the short `{field}` field")]
    OutOfRange { field: String, id: i32 },
}
