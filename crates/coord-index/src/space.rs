//! Coordinate space assembly.
//!
//! Building a space is two passes over the same record stream:
//!
//! 1. every dimension accumulates the values of every record,
//! 2. once all dimensions are finished, each record is resolved to its
//!    index tuple and stored with its byte location.
//!
//! [`build_space`] runs both passes over a slice. [`SpaceBuilder`] and
//! [`SpaceIndexer`] expose the same protocol for callers that feed records
//! one at a time.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::builder::{AddOutcome, CoordinateBuilder};
use crate::config::{DuplicatePolicy, IndexConfig};
use crate::coordinate::{Coordinate, CoordinateLookup};
use crate::dimension::DynDimension;
use crate::error::{IndexError, Result};
use crate::report::{BuildReport, DuplicateTuple, LookupMissRecord, SkippedRecord};
use crate::resolver::{check_dimensions, Resolution, Resolver};
use crate::value::CoordValue;

/// One index per dimension, in dimension order.
pub type IndexTuple = Vec<usize>;

/// Where a record's payload lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordLocation {
    /// Caller-assigned file identifier.
    pub file: u32,
    /// Byte offset of the enclosing message.
    pub offset: u64,
    /// Length of the enclosing message.
    pub length: u64,
    /// Field number inside a multi-field message.
    #[serde(default)]
    pub field: u16,
}

/// Records that can say where their payload is stored.
pub trait LocatedRecord {
    fn location(&self) -> RecordLocation;
}

/// A record placed in the space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceEntry {
    /// Position of the record in the input stream.
    pub position: usize,
    pub location: RecordLocation,
    pub indices: IndexTuple,
}

/// Sparse N-dimensional index of records.
///
/// Immutable once built. Share it behind an `Arc`; every query takes
/// `&self`.
#[derive(Debug, Clone)]
pub struct CoordinateSpace {
    coordinates: Vec<Arc<Coordinate>>,
    lookups: Vec<Arc<CoordinateLookup>>,
    /// Every indexed record in stream order, duplicates included.
    entries: Vec<SpaceEntry>,
    /// Winning entry per occupied cell.
    cells: HashMap<IndexTuple, usize>,
    policy: DuplicatePolicy,
    /// Stream positions consumed so far, indexed or not.
    stream_len: usize,
}

impl CoordinateSpace {
    /// Index the cells of `entries` and collect tuples shared by several records.
    pub(crate) fn assemble(
        coordinates: Vec<Arc<Coordinate>>,
        lookups: Vec<Arc<CoordinateLookup>>,
        entries: Vec<SpaceEntry>,
        policy: DuplicatePolicy,
        stream_len: usize,
    ) -> (Self, Vec<DuplicateTuple>) {
        let mut cells: HashMap<IndexTuple, usize> = HashMap::with_capacity(entries.len());
        let mut shared: HashMap<IndexTuple, Vec<usize>> = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            match cells.entry(entry.indices.clone()) {
                Entry::Vacant(cell) => {
                    cell.insert(i);
                }
                Entry::Occupied(mut cell) => {
                    let current = *cell.get();
                    shared
                        .entry(entry.indices.clone())
                        .or_insert_with(|| vec![entries[current].position])
                        .push(entry.position);

                    let replace = match policy {
                        DuplicatePolicy::LastWins => entry.position >= entries[current].position,
                        DuplicatePolicy::FirstWins => entry.position < entries[current].position,
                    };
                    if replace {
                        cell.insert(i);
                    }
                }
            }
        }

        let mut duplicates: Vec<DuplicateTuple> = shared
            .into_iter()
            .map(|(indices, mut positions)| {
                positions.sort_unstable();
                DuplicateTuple { indices, positions }
            })
            .collect();
        duplicates.sort_by_key(|d| d.positions[0]);

        let space = Self {
            coordinates,
            lookups,
            entries,
            cells,
            policy,
            stream_len,
        };
        (space, duplicates)
    }

    pub fn coordinates(&self) -> &[Arc<Coordinate>] {
        &self.coordinates
    }

    pub fn coordinate(&self, dimension: usize) -> Option<&Arc<Coordinate>> {
        self.coordinates.get(dimension)
    }

    /// Position and coordinate of the dimension called `name`.
    pub fn coordinate_named(&self, name: &str) -> Option<(usize, &Arc<Coordinate>)> {
        self.coordinates
            .iter()
            .enumerate()
            .find(|(_, c)| c.name() == name)
    }

    pub(crate) fn lookups(&self) -> &[Arc<CoordinateLookup>] {
        &self.lookups
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.coordinates.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.coordinates.iter().map(|c| c.size()).collect()
    }

    pub fn entries(&self) -> &[SpaceEntry] {
        &self.entries
    }

    /// Number of indexed records, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Product of the shape, `None` on overflow.
    pub fn dense_size(&self) -> Option<usize> {
        self.coordinates
            .iter()
            .try_fold(1usize, |acc, c| acc.checked_mul(c.size()))
    }

    /// Fraction of the dense array that is occupied.
    pub fn density(&self) -> f64 {
        match self.dense_size() {
            Some(0) => 0.0,
            Some(n) => self.cells.len() as f64 / n as f64,
            None => 0.0,
        }
    }

    /// The winning entry of a cell.
    pub fn entry_at(&self, indices: &[usize]) -> Option<&SpaceEntry> {
        self.cells.get(indices).map(|&i| &self.entries[i])
    }

    /// Every entry of a cell, in stream order.
    pub fn entries_at<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a SpaceEntry> + 'a {
        self.entries.iter().filter(move |e| e.indices == indices)
    }

    /// Index tuple of a set of values, one per dimension.
    pub fn indices_of(&self, values: &[CoordValue]) -> Option<IndexTuple> {
        if values.len() != self.rank() {
            return None;
        }
        values
            .iter()
            .zip(&self.lookups)
            .map(|(value, lookup)| lookup.get(value))
            .collect()
    }

    /// The entry stored at a set of values, e.g. 500 hPa at hour 24.
    pub fn find(&self, values: &[CoordValue]) -> Option<&SpaceEntry> {
        self.indices_of(values).and_then(|t| self.entry_at(&t))
    }

    /// Stream position following the last record seen, indexed or not.
    pub fn next_position(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.position + 1)
            .max()
            .unwrap_or(0)
            .max(self.stream_len)
    }

    /// Build a new space holding these entries plus `records`.
    ///
    /// Each axis becomes the union of its current values and those of the
    /// new records. Existing entries are re-indexed by value; new records
    /// continue the stream positions. `self` is left untouched.
    pub fn extend<R>(
        &self,
        dimensions: &[DynDimension<R>],
        records: &[R],
        config: &IndexConfig,
    ) -> Result<(CoordinateSpace, BuildReport)>
    where
        R: LocatedRecord + Sync,
    {
        config.validate().map_err(IndexError::Config)?;
        check_dimensions(&self.coordinates, dimensions)?;

        let mut builder = SpaceBuilder::new(dimensions.to_vec())?.starting_at(self.next_position());
        builder.seed(&self.coordinates)?;
        builder.accumulate_batch(records, config)?;
        let mut indexer = builder.finish(config)?;

        for entry in &self.entries {
            let indices = entry
                .indices
                .iter()
                .zip(&self.coordinates)
                .zip(&indexer.lookups)
                .map(|((&i, old), new)| old.get(i).and_then(|v| new.get(v)))
                .collect::<Option<IndexTuple>>()
                .ok_or_else(|| {
                    IndexError::corrupt(format!(
                        "entry at position {} does not resolve on the extended axes",
                        entry.position
                    ))
                })?;
            indexer.push_existing(SpaceEntry {
                indices,
                ..entry.clone()
            });
        }

        for record in records {
            indexer.assign(record);
        }

        info!(
            existing = self.entries.len(),
            added = records.len(),
            "Extended coordinate space"
        );
        Ok(indexer.into_space())
    }
}

/// First pass: accumulate the values of every dimension.
pub struct SpaceBuilder<R: ?Sized> {
    builders: Vec<CoordinateBuilder<R>>,
    report: BuildReport,
    base: usize,
    position: usize,
}

impl<R: ?Sized> SpaceBuilder<R> {
    pub fn new(dimensions: Vec<DynDimension<R>>) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(IndexError::NoDimensions);
        }
        Ok(Self {
            builders: dimensions.into_iter().map(CoordinateBuilder::new).collect(),
            report: BuildReport::default(),
            base: 0,
            position: 0,
        })
    }

    /// Number the first record `position` instead of 0.
    pub(crate) fn starting_at(mut self, position: usize) -> Self {
        self.base = position;
        self.position = position;
        self
    }

    /// Add every value of existing coordinates, one per dimension.
    pub fn seed(&mut self, coordinates: &[Arc<Coordinate>]) -> Result<()> {
        if coordinates.len() != self.builders.len() {
            return Err(IndexError::ArityMismatch {
                expected: self.builders.len(),
                found: coordinates.len(),
            });
        }
        for (builder, coordinate) in self.builders.iter_mut().zip(coordinates) {
            builder.add_all(coordinate)?;
        }
        Ok(())
    }

    /// Offer one record to every dimension.
    pub fn accumulate(&mut self, record: &R) -> Result<()> {
        let position = self.position;
        for builder in &mut self.builders {
            if let AddOutcome::Skipped(reason) = builder.add_record(record)? {
                self.report.skipped.push(SkippedRecord {
                    position,
                    dimension: builder.name().to_string(),
                    reason: reason.to_string(),
                });
            }
        }
        self.position += 1;
        self.report.records_seen += 1;
        Ok(())
    }

    pub fn records_seen(&self) -> usize {
        self.report.records_seen
    }

    /// Finish every dimension and switch to the second pass.
    pub fn finish(mut self, config: &IndexConfig) -> Result<SpaceIndexer<R>> {
        if config.use_parallel(self.report.records_seen) {
            self.builders
                .par_iter_mut()
                .try_for_each(|b| b.finish().map(|_| ()))?;
        } else {
            for builder in &mut self.builders {
                builder.finish()?;
            }
        }

        let mut dimensions = Vec::with_capacity(self.builders.len());
        let mut coordinates = Vec::with_capacity(self.builders.len());
        let mut lookups = Vec::with_capacity(self.builders.len());
        for builder in &self.builders {
            let (coordinate, lookup) = builder.parts()?;
            dimensions.push(Arc::clone(builder.dimension()));
            coordinates.push(coordinate);
            lookups.push(lookup);
        }

        let skipped_positions = self.report.skipped.iter().map(|s| s.position).collect();

        debug!(
            records = self.report.records_seen,
            shape = ?coordinates.iter().map(|c| c.size()).collect::<Vec<_>>(),
            "All dimensions finalized"
        );

        Ok(SpaceIndexer {
            dimensions,
            coordinates,
            lookups,
            entries: Vec::new(),
            report: self.report,
            skipped_positions,
            position: self.base,
            indexed: 0,
            policy: config.duplicate_policy,
            log_skipped_limit: config.log_skipped_limit,
        })
    }
}

impl<R: Sync> SpaceBuilder<R> {
    /// Accumulate a batch, one rayon task per dimension when configured.
    pub fn accumulate_batch(&mut self, records: &[R], config: &IndexConfig) -> Result<()> {
        if !config.use_parallel(records.len()) || self.builders.len() < 2 {
            for record in records {
                self.accumulate(record)?;
            }
            return Ok(());
        }

        let base = self.position;
        let per_dimension = self
            .builders
            .par_iter_mut()
            .map(|builder| -> Result<Vec<SkippedRecord>> {
                let mut skipped = Vec::new();
                for (i, record) in records.iter().enumerate() {
                    if let AddOutcome::Skipped(reason) = builder.add_record(record)? {
                        skipped.push(SkippedRecord {
                            position: base + i,
                            dimension: builder.name().to_string(),
                            reason: reason.to_string(),
                        });
                    }
                }
                Ok(skipped)
            })
            .collect::<Result<Vec<_>>>()?;

        // Same order as the sequential path: by position, then dimension.
        let mut skipped: Vec<SkippedRecord> = per_dimension.into_iter().flatten().collect();
        skipped.sort_by_key(|s| s.position);
        self.report.skipped.extend(skipped);

        self.position += records.len();
        self.report.records_seen += records.len();
        Ok(())
    }
}

/// Second pass: resolve records against the finalized coordinates.
pub struct SpaceIndexer<R: ?Sized> {
    dimensions: Vec<DynDimension<R>>,
    coordinates: Vec<Arc<Coordinate>>,
    lookups: Vec<Arc<CoordinateLookup>>,
    entries: Vec<SpaceEntry>,
    report: BuildReport,
    skipped_positions: HashSet<usize>,
    position: usize,
    indexed: usize,
    policy: DuplicatePolicy,
    log_skipped_limit: usize,
}

impl<R: ?Sized + LocatedRecord> SpaceIndexer<R> {
    pub fn coordinates(&self) -> &[Arc<Coordinate>] {
        &self.coordinates
    }

    /// Resolve the next record of the stream and store it when found.
    ///
    /// Records must be offered in the same order as during accumulation.
    pub fn assign(&mut self, record: &R) -> Resolution {
        let position = self.position;
        self.position += 1;

        let resolution = Resolver::from_parts(&self.dimensions, &self.lookups).resolve(record);
        match &resolution {
            Resolution::Found(indices) => {
                self.indexed += 1;
                self.entries.push(SpaceEntry {
                    position,
                    location: record.location(),
                    indices: indices.clone(),
                });
            }
            Resolution::Miss { dimension, value } => {
                self.report.misses.push(LookupMissRecord {
                    position,
                    dimension: dimension.clone(),
                    value: value.to_string(),
                });
            }
            Resolution::Unextractable { dimension, error } => {
                // Already reported by the first pass unless the stream changed.
                if self.skipped_positions.insert(position) {
                    self.report.skipped.push(SkippedRecord {
                        position,
                        dimension: dimension.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }
        resolution
    }

    pub(crate) fn push_existing(&mut self, entry: SpaceEntry) {
        self.entries.push(entry);
    }

    /// Publish the space together with the build report.
    pub fn into_space(self) -> (CoordinateSpace, BuildReport) {
        let mut report = self.report;
        report.records_indexed = self.indexed;

        let (space, duplicates) = CoordinateSpace::assemble(
            self.coordinates,
            self.lookups,
            self.entries,
            self.policy,
            self.position,
        );
        report.duplicates = duplicates;

        for skipped in report.skipped.iter().take(self.log_skipped_limit) {
            debug!(
                position = skipped.position,
                dimension = %skipped.dimension,
                reason = %skipped.reason,
                "Record skipped"
            );
        }
        if report.skipped.len() > self.log_skipped_limit {
            debug!(
                remaining = report.skipped.len() - self.log_skipped_limit,
                "Further skipped records not logged"
            );
        }

        if !report.is_clean() {
            warn!(
                skipped = report.skipped_records(),
                misses = report.misses.len(),
                duplicates = report.duplicates.len(),
                policy = %space.policy(),
                "Coordinate space built with unindexed or shared records"
            );
        }

        info!(
            records = report.records_seen,
            indexed = report.records_indexed,
            cells = space.cell_count(),
            shape = ?space.shape(),
            density = space.density(),
            "Built coordinate space"
        );

        (space, report)
    }
}

/// Build the coordinate space of `records` over `dimensions`.
///
/// Per-record problems do not fail the build; they are listed in the
/// returned [`BuildReport`].
pub fn build_space<R>(
    dimensions: &[DynDimension<R>],
    records: &[R],
    config: &IndexConfig,
) -> Result<(CoordinateSpace, BuildReport)>
where
    R: LocatedRecord + Sync,
{
    config.validate().map_err(IndexError::Config)?;

    let mut builder = SpaceBuilder::new(dimensions.to_vec())?;
    builder.accumulate_batch(records, config)?;

    let mut indexer = builder.finish(config)?;
    for record in records {
        indexer.assign(record);
    }
    Ok(indexer.into_space())
}
