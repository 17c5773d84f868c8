//! Finalized coordinates and their value-to-index lookup tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::value::{CoordValue, DimensionKind};

/// The canonical, ordered, duplicate-free values of one dimension.
///
/// A value's index on the axis is its position in `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    name: String,
    kind: DimensionKind,
    values: Vec<CoordValue>,
}

impl Coordinate {
    /// Caller guarantees `values` is sorted and duplicate-free.
    pub(crate) fn from_sorted(name: String, kind: DimensionKind, values: Vec<CoordValue>) -> Self {
        Self { name, kind, values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DimensionKind {
        &self.kind
    }

    pub fn values(&self) -> &[CoordValue] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CoordValue> {
        self.values.get(index)
    }

    /// Linear scan; use a [`CoordinateLookup`] on hot paths.
    pub fn position(&self, value: &CoordValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// Hash index from value to position, built once per finalized coordinate.
#[derive(Debug, Clone, Default)]
pub struct CoordinateLookup {
    positions: HashMap<CoordValue, usize>,
}

impl CoordinateLookup {
    pub fn build(coordinate: &Coordinate) -> Self {
        let positions = coordinate
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        Self { positions }
    }

    pub fn get(&self, value: &CoordValue) -> Option<usize> {
        self.positions.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
