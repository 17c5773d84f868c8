//! Two-phase coordinate builder.
//!
//! A builder first accumulates the distinct values of its dimension, then
//! `finish()` freezes them into a sorted [`Coordinate`] and switches to
//! answering index queries. Calling an operation in the wrong phase is a
//! [`IndexError::ProtocolViolation`].

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::coordinate::{Coordinate, CoordinateLookup};
use crate::dimension::DynDimension;
use crate::error::{ExtractError, IndexError, Result};
use crate::value::CoordValue;

/// Result of offering one record to an accumulating builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The record carries no usable value for this dimension.
    Skipped(ExtractError),
}

enum BuilderState {
    Accumulating {
        seen: HashSet<CoordValue>,
    },
    Finalized {
        coordinate: Arc<Coordinate>,
        lookup: Arc<CoordinateLookup>,
    },
}

/// Builds the coordinate of one dimension over records of type `R`.
pub struct CoordinateBuilder<R: ?Sized> {
    dimension: DynDimension<R>,
    state: BuilderState,
}

impl<R: ?Sized> CoordinateBuilder<R> {
    pub fn new(dimension: DynDimension<R>) -> Self {
        Self {
            dimension,
            state: BuilderState::Accumulating {
                seen: HashSet::new(),
            },
        }
    }

    pub fn dimension(&self) -> &DynDimension<R> {
        &self.dimension
    }

    pub fn name(&self) -> &str {
        self.dimension.name()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, BuilderState::Finalized { .. })
    }

    /// Distinct values seen so far; the coordinate size once finished.
    pub fn len(&self) -> usize {
        match &self.state {
            BuilderState::Accumulating { seen } => seen.len(),
            BuilderState::Finalized { coordinate, .. } => coordinate.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn seen_mut(&mut self, operation: &'static str) -> Result<&mut HashSet<CoordValue>> {
        match &mut self.state {
            BuilderState::Accumulating { seen } => Ok(seen),
            BuilderState::Finalized { .. } => Err(IndexError::protocol(
                self.dimension.name(),
                operation,
                "called after finish",
            )),
        }
    }

    /// Extract and record the value of `record`.
    ///
    /// Extraction failures are not errors: the record is skipped for this
    /// dimension and the reason handed back to the caller.
    pub fn add_record(&mut self, record: &R) -> Result<AddOutcome> {
        let value = self.dimension.extract(record);
        let seen = self.seen_mut("add_record")?;
        match value {
            Ok(value) => {
                seen.insert(value);
                Ok(AddOutcome::Added)
            }
            Err(e) => Ok(AddOutcome::Skipped(e)),
        }
    }

    pub fn add_value(&mut self, value: CoordValue) -> Result<()> {
        self.seen_mut("add_value")?.insert(value);
        Ok(())
    }

    /// Seed the builder with every value of an existing coordinate.
    pub fn add_all(&mut self, coordinate: &Coordinate) -> Result<()> {
        let kind = self.dimension.kind();
        let seen = self.seen_mut("add_all")?;
        if *coordinate.kind() != kind {
            return Err(IndexError::DimensionMismatch {
                expected: kind.to_string(),
                found: coordinate.kind().to_string(),
            });
        }
        seen.extend(coordinate.values().iter().cloned());
        Ok(())
    }

    /// Sort the accumulated values and switch to the query phase.
    pub fn finish(&mut self) -> Result<Arc<Coordinate>> {
        let seen = std::mem::take(self.seen_mut("finish")?);

        let dimension = &self.dimension;
        let mut values: Vec<CoordValue> = seen.into_iter().collect();
        values.sort_by(|a, b| dimension.compare(a, b));

        let coordinate = Arc::new(Coordinate::from_sorted(
            dimension.name().to_string(),
            dimension.kind(),
            values,
        ));
        let lookup = Arc::new(CoordinateLookup::build(&coordinate));

        debug!(
            dimension = %dimension.name(),
            kind = %dimension.kind(),
            size = coordinate.size(),
            "Finalized coordinate"
        );

        self.state = BuilderState::Finalized {
            coordinate: Arc::clone(&coordinate),
            lookup,
        };
        Ok(coordinate)
    }

    fn finalized(&self, operation: &'static str) -> Result<(&Arc<Coordinate>, &Arc<CoordinateLookup>)> {
        match &self.state {
            BuilderState::Finalized { coordinate, lookup } => Ok((coordinate, lookup)),
            BuilderState::Accumulating { .. } => Err(IndexError::protocol(
                self.dimension.name(),
                operation,
                "called before finish",
            )),
        }
    }

    /// Index of the record's value, `Ok(None)` when the value is not on the axis.
    pub fn index_of(&self, record: &R) -> Result<Option<usize>> {
        let (_, lookup) = self.finalized("index_of")?;
        let value = self
            .dimension
            .extract(record)
            .map_err(|e| IndexError::extraction(self.dimension.name(), e))?;
        Ok(lookup.get(&value))
    }

    pub fn index_of_value(&self, value: &CoordValue) -> Result<Option<usize>> {
        let (_, lookup) = self.finalized("index_of_value")?;
        Ok(lookup.get(value))
    }

    /// The finalized coordinate, `None` while accumulating.
    pub fn coordinate(&self) -> Option<&Arc<Coordinate>> {
        self.finalized("coordinate").ok().map(|(c, _)| c)
    }

    pub(crate) fn parts(&self) -> Result<(Arc<Coordinate>, Arc<CoordinateLookup>)> {
        let (coordinate, lookup) = self.finalized("parts")?;
        Ok((Arc::clone(coordinate), Arc::clone(lookup)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::FnDimension;
    use crate::value::DimensionKind;

    fn hours() -> DynDimension<i64> {
        Arc::new(FnDimension::new("time", DimensionKind::Time, |h: &i64| {
            if *h < 0 {
                Err(ExtractError::invalid("negative offset"))
            } else {
                Ok(CoordValue::Offset(*h))
            }
        }))
    }

    fn offsets(coord: &Coordinate) -> Vec<i64> {
        coord.values().iter().filter_map(|v| v.as_offset()).collect()
    }

    #[test]
    fn test_accumulate_dedup_and_sort() {
        let mut builder = CoordinateBuilder::new(hours());
        for h in [6, 0, 12, 6, 3] {
            assert_eq!(builder.add_record(&h).unwrap(), AddOutcome::Added);
        }
        assert_eq!(builder.len(), 4);

        let coord = builder.finish().unwrap();
        assert_eq!(offsets(&coord), vec![0, 3, 6, 12]);
        assert!(builder.is_finished());
        assert_eq!(builder.index_of(&6).unwrap(), Some(2));
        assert_eq!(builder.index_of(&9).unwrap(), None);
    }

    #[test]
    fn test_empty_builder_finishes_empty() {
        let mut builder = CoordinateBuilder::new(hours());
        let coord = builder.finish().unwrap();
        assert!(coord.is_empty());
        assert_eq!(builder.index_of(&0).unwrap(), None);
    }

    #[test]
    fn test_skipped_record() {
        let mut builder = CoordinateBuilder::new(hours());
        let outcome = builder.add_record(&-3).unwrap();
        assert!(matches!(outcome, AddOutcome::Skipped(ExtractError::Invalid(_))));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_add_after_finish_is_protocol_violation() {
        let mut builder = CoordinateBuilder::new(hours());
        builder.add_record(&1).unwrap();
        builder.finish().unwrap();

        let err = builder.add_record(&2).unwrap_err();
        assert!(err.is_protocol_violation());
        assert!(err.to_string().contains("add_record"));
        assert!(err.to_string().contains("time"));

        assert!(builder.add_value(CoordValue::Offset(2)).unwrap_err().is_protocol_violation());
    }

    #[test]
    fn test_finish_twice_is_protocol_violation() {
        let mut builder = CoordinateBuilder::new(hours());
        builder.finish().unwrap();
        let err = builder.finish().unwrap_err();
        assert!(matches!(
            err,
            IndexError::ProtocolViolation { operation: "finish", .. }
        ));
    }

    #[test]
    fn test_query_before_finish_is_protocol_violation() {
        let mut builder = CoordinateBuilder::new(hours());
        builder.add_record(&1).unwrap();
        assert!(builder.index_of(&1).unwrap_err().is_protocol_violation());
        assert!(builder
            .index_of_value(&CoordValue::Offset(1))
            .unwrap_err()
            .is_protocol_violation());
        assert!(builder.coordinate().is_none());
    }

    #[test]
    fn test_index_of_unextractable_record() {
        let mut builder = CoordinateBuilder::new(hours());
        builder.finish().unwrap();
        assert!(matches!(
            builder.index_of(&-1),
            Err(IndexError::Extraction { .. })
        ));
    }

    #[test]
    fn test_add_all_merges_existing_coordinate() {
        let mut first = CoordinateBuilder::new(hours());
        for h in [0, 6] {
            first.add_record(&h).unwrap();
        }
        let existing = first.finish().unwrap();

        let mut second = CoordinateBuilder::new(hours());
        second.add_all(&existing).unwrap();
        second.add_record(&3).unwrap();
        second.add_record(&6).unwrap();
        let merged = second.finish().unwrap();
        assert_eq!(offsets(&merged), vec![0, 3, 6]);
    }

    #[test]
    fn test_add_all_rejects_other_kind() {
        let other = Coordinate::from_sorted(
            "vertical".to_string(),
            DimensionKind::Vertical,
            vec![CoordValue::level(100, 500.0).unwrap()],
        );
        let mut builder = CoordinateBuilder::new(hours());
        assert!(matches!(
            builder.add_all(&other),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_custom_order_applied_on_finish() {
        let dim: DynDimension<i64> = Arc::new(
            FnDimension::new("rev", DimensionKind::Custom("rev".into()), |v: &i64| {
                Ok(CoordValue::Int(*v))
            })
            .with_order(|a, b| b.cmp(a)),
        );
        let mut builder = CoordinateBuilder::new(dim);
        for v in [1, 3, 2] {
            builder.add_record(&v).unwrap();
        }
        let coord = builder.finish().unwrap();
        assert_eq!(
            coord.values(),
            &[CoordValue::Int(3), CoordValue::Int(2), CoordValue::Int(1)]
        );
    }
}
