//! Persistent content-hash → target-id table.
//!
//! Stored as pretty JSON:
//!
//! ```json
//! { "next_id": 3, "maps": { "<sha256 hex>": 0, "<sha256 hex>": 1 } }
//! ```
//!
//! A flat `{ "<hex>": id }` object is accepted on load as well.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MappingError;
use crate::fingerprint::ContentHash;

/// Every content hash ever seen, with the target id it was given.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingTable {
    next_id: i32,
    maps: BTreeMap<ContentHash, i32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTable {
    Structured {
        #[serde(default)]
        next_id: i32,
        maps: BTreeMap<ContentHash, i32>,
    },
    Flat(BTreeMap<ContentHash, i32>),
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from stored records, checking that ids are unique.
    pub fn from_records(
        records: BTreeMap<ContentHash, i32>,
        next_id: i32,
    ) -> Result<Self, MappingError> {
        let mut seen = HashSet::with_capacity(records.len());
        for &id in records.values() {
            if id < 0 {
                return Err(MappingError::NegativeTarget { id });
            }
            if !seen.insert(id) {
                return Err(MappingError::DuplicateTarget { id });
            }
        }
        let floor = records.values().max().map_or(0, |max| max + 1);
        Ok(Self {
            next_id: next_id.max(floor),
            maps: records,
        })
    }

    /// Load the table, or start empty when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No mapping file at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(MappingError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&contents).map_err(|e| match e {
            MappingError::Json { source, .. } => MappingError::Json {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self, MappingError> {
        if contents.trim().is_empty() {
            return Ok(Self::new());
        }
        let stored: StoredTable =
            serde_json::from_str(contents).map_err(|source| MappingError::Json {
                path: Default::default(),
                source,
            })?;
        match stored {
            StoredTable::Structured { next_id, maps } => Self::from_records(maps, next_id),
            StoredTable::Flat(maps) => Self::from_records(maps, 0),
        }
    }

    /// Write the whole table, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<(), MappingError> {
        let io_err = |source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|source| MappingError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn get(&self, hash: &ContentHash) -> Option<i32> {
        self.maps.get(hash).copied()
    }

    /// Look up `hash`, assigning the next free target id if it is new.
    /// Returns the id and whether it was newly assigned.
    pub fn get_or_allocate(&mut self, hash: ContentHash) -> (i32, bool) {
        if let Some(&id) = self.maps.get(&hash) {
            return (id, false);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.maps.insert(hash, id);
        (id, true)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// The id the next new hash will receive.
    pub fn next_id(&self) -> i32 {
        self.next_id
    }

    pub fn max_target_id(&self) -> Option<i32> {
        self.maps.values().copied().max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, i32)> {
        self.maps.iter().map(|(h, &id)| (h, id))
    }
}
