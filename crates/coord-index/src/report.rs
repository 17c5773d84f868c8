//! Per-build diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::space::IndexTuple;

/// A record left out of one dimension because its value could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position in the input stream.
    pub position: usize,
    pub dimension: String,
    pub reason: String,
}

/// A record whose value was not found on a finalized axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupMissRecord {
    pub position: usize,
    pub dimension: String,
    pub value: String,
}

/// Several records mapped to the same index tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateTuple {
    pub indices: IndexTuple,
    /// Stream positions of every record in the cell, ascending.
    pub positions: Vec<usize>,
}

/// What happened to every record of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub records_seen: usize,
    pub records_indexed: usize,
    pub skipped: Vec<SkippedRecord>,
    pub misses: Vec<LookupMissRecord>,
    pub duplicates: Vec<DuplicateTuple>,
}

impl BuildReport {
    /// True when every record landed in a cell of its own.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.misses.is_empty() && self.duplicates.is_empty()
    }

    /// Distinct records skipped in at least one dimension.
    pub fn skipped_records(&self) -> usize {
        let mut positions: Vec<usize> = self.skipped.iter().map(|s| s.position).collect();
        positions.sort_unstable();
        positions.dedup();
        positions.len()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records seen, {} indexed, {} skipped, {} lookup misses, {} duplicate cells",
            self.records_seen,
            self.records_indexed,
            self.skipped_records(),
            self.misses.len(),
            self.duplicates.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_report() {
        let report = BuildReport {
            records_seen: 4,
            records_indexed: 4,
            ..Default::default()
        };
        assert!(report.is_clean());
        assert_eq!(
            report.to_string(),
            "4 records seen, 4 indexed, 0 skipped, 0 lookup misses, 0 duplicate cells"
        );
    }

    #[test]
    fn test_skipped_counts_records_once() {
        let skip = |position, dimension: &str| SkippedRecord {
            position,
            dimension: dimension.to_string(),
            reason: "missing".to_string(),
        };
        let report = BuildReport {
            records_seen: 3,
            records_indexed: 1,
            skipped: vec![skip(0, "time"), skip(0, "vertical"), skip(2, "time")],
            ..Default::default()
        };
        assert!(!report.is_clean());
        assert_eq!(report.skipped_records(), 2);
    }
}
