//! Run counters and the optional found / not-found diagnostic logs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub const FOUND_LOG: &str = "ids-found.txt";
pub const NOT_FOUND_LOG: &str = "ids-not-found.txt";

/// Observational counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapStats {
    /// Ids rewritten to their target.
    pub remapped: u64,
    /// Ids left alone because they already were a target id or a sentinel.
    pub passthrough: u64,
    /// Id-less map items given a heuristic target.
    pub inferred: u64,
    /// Map items with nothing to go on.
    pub unresolved: u64,
    /// Malformed nodes skipped.
    pub anomalies: u64,
    /// `source -> target`, one entry per rewrite.
    pub found: Vec<(i32, i32)>,
    /// Source ids with no definition, one entry per occurrence.
    pub not_found: Vec<i32>,
}

impl RemapStats {
    /// Append the found and not-found logs to `dir`.
    pub fn write_diagnostics(&self, dir: &Path) -> std::io::Result<()> {
        let mut found = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(FOUND_LOG))?;
        for (source, target) in &self.found {
            writeln!(found, "{source} -> {target}")?;
        }

        let mut not_found = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(NOT_FOUND_LOG))?;
        for source in &self.not_found {
            writeln!(not_found, "{source}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_append() {
        let dir = std::env::temp_dir().join(format!("compendium_stats_{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();

        let stats = RemapStats {
            found: vec![(4, 0), (5, 1)],
            not_found: vec![7],
            ..RemapStats::default()
        };
        stats.write_diagnostics(&dir).unwrap();
        stats.write_diagnostics(&dir).unwrap();

        let found = std::fs::read_to_string(dir.join(FOUND_LOG)).unwrap();
        assert_eq!(found, "4 -> 0\n5 -> 1\n4 -> 0\n5 -> 1\n");
        let missing = std::fs::read_to_string(dir.join(NOT_FOUND_LOG)).unwrap();
        assert_eq!(missing, "7\n7\n");

        std::fs::remove_dir_all(&dir).ok();
    }
}
