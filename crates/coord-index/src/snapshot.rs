//! Persisted form of a coordinate space.
//!
//! Only coordinates, entries and the duplicate policy are stored. Lookup
//! tables and cells are rebuilt on load, after every tuple has been
//! checked against the coordinate sizes.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::DuplicatePolicy;
use crate::coordinate::{Coordinate, CoordinateLookup};
use crate::error::{IndexError, Result};
use crate::space::{CoordinateSpace, SpaceEntry};

/// Version written by this crate.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    pub format_version: u32,
    pub policy: DuplicatePolicy,
    pub coordinates: Vec<Coordinate>,
    pub entries: Vec<SpaceEntry>,
    /// First stream position free for new records.
    #[serde(default)]
    pub next_position: usize,
}

impl CoordinateSpace {
    pub fn to_snapshot(&self) -> SpaceSnapshot {
        SpaceSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            policy: self.policy(),
            coordinates: self.coordinates().iter().map(|c| (**c).clone()).collect(),
            entries: self.entries().to_vec(),
            next_position: self.next_position(),
        }
    }

    /// Rebuild a space, rejecting snapshots whose tuples do not fit the axes.
    pub fn from_snapshot(snapshot: SpaceSnapshot) -> Result<Self> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(snapshot.format_version));
        }
        if snapshot.coordinates.is_empty() {
            return Err(IndexError::corrupt("snapshot has no coordinates"));
        }

        let mut lookups = Vec::with_capacity(snapshot.coordinates.len());
        for coordinate in &snapshot.coordinates {
            let lookup = CoordinateLookup::build(coordinate);
            if lookup.len() != coordinate.size() {
                return Err(IndexError::corrupt(format!(
                    "coordinate '{}' contains duplicate values",
                    coordinate.name()
                )));
            }
            lookups.push(Arc::new(lookup));
        }

        let shape: Vec<usize> = snapshot.coordinates.iter().map(|c| c.size()).collect();
        for entry in &snapshot.entries {
            if entry.indices.len() != shape.len() {
                return Err(IndexError::corrupt(format!(
                    "entry at position {} has {} indices, expected {}",
                    entry.position,
                    entry.indices.len(),
                    shape.len()
                )));
            }
            for (dim, (&i, &n)) in entry.indices.iter().zip(&shape).enumerate() {
                if i >= n {
                    return Err(IndexError::corrupt(format!(
                        "entry at position {} has index {} on dimension {} of size {}",
                        entry.position, i, dim, n
                    )));
                }
            }
        }

        let coordinates = snapshot.coordinates.into_iter().map(Arc::new).collect();
        let (space, duplicates) = CoordinateSpace::assemble(
            coordinates,
            lookups,
            snapshot.entries,
            snapshot.policy,
            snapshot.next_position,
        );
        debug!(
            entries = space.len(),
            duplicates = duplicates.len(),
            "Restored coordinate space"
        );
        Ok(space)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: SpaceSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &self.to_snapshot())?;
        writer.flush()?;
        info!(path = %path.display(), entries = self.len(), "Saved coordinate space");
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let snapshot: SpaceSnapshot = serde_json::from_reader(reader)?;
        let space = Self::from_snapshot(snapshot)?;
        info!(path = %path.display(), entries = space.len(), "Loaded coordinate space");
        Ok(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::RecordLocation;
    use crate::value::{CoordValue, DimensionKind};

    fn snapshot() -> SpaceSnapshot {
        let time = Coordinate::from_sorted(
            "time".to_string(),
            DimensionKind::Time,
            vec![CoordValue::Offset(0), CoordValue::Offset(6)],
        );
        let entry = |position: usize, t: usize| SpaceEntry {
            position,
            location: RecordLocation {
                file: 0,
                offset: position as u64 * 100,
                length: 100,
                field: 0,
            },
            indices: vec![t],
        };
        SpaceSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            policy: DuplicatePolicy::LastWins,
            coordinates: vec![time],
            entries: vec![entry(0, 1), entry(1, 0)],
            next_position: 3,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let space = CoordinateSpace::from_snapshot(snapshot()).unwrap();
        let json = space.to_json_string().unwrap();
        let back = CoordinateSpace::from_json_str(&json).unwrap();

        assert_eq!(back.to_snapshot(), space.to_snapshot());
        assert_eq!(back.find(&[CoordValue::Offset(6)]).unwrap().position, 0);
        // Position 2 was seen but not indexed; it stays reserved.
        assert_eq!(back.next_position(), 3);
    }

    #[test]
    fn test_missing_next_position_falls_back_to_entries() {
        let mut json = serde_json::to_value(snapshot()).unwrap();
        json.as_object_mut().unwrap().remove("next_position");
        let restored: SpaceSnapshot = serde_json::from_value(json).unwrap();
        let space = CoordinateSpace::from_snapshot(restored).unwrap();
        assert_eq!(space.next_position(), 2);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut s = snapshot();
        s.entries[0].indices = vec![2];
        let err = CoordinateSpace::from_snapshot(s).unwrap_err();
        assert!(matches!(err, IndexError::CorruptSnapshot(_)));
        assert!(err.to_string().contains("size 2"));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let mut s = snapshot();
        s.entries[1].indices = vec![0, 0];
        assert!(matches!(
            CoordinateSpace::from_snapshot(s),
            Err(IndexError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_duplicate_axis_values_rejected() {
        let mut s = snapshot();
        s.coordinates[0] = Coordinate::from_sorted(
            "time".to_string(),
            DimensionKind::Time,
            vec![CoordValue::Offset(0), CoordValue::Offset(0)],
        );
        assert!(matches!(
            CoordinateSpace::from_snapshot(s),
            Err(IndexError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut s = snapshot();
        s.format_version = 99;
        assert!(matches!(
            CoordinateSpace::from_snapshot(s),
            Err(IndexError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            CoordinateSpace::from_json_str("{\"format_version\": 1"),
            Err(IndexError::Serialization(_))
        ));
    }
}
