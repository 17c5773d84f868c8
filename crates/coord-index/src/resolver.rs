//! Record-to-index resolution against finalized coordinates.

use std::sync::Arc;

use crate::coordinate::{Coordinate, CoordinateLookup};
use crate::dimension::DynDimension;
use crate::error::{ExtractError, IndexError, Result};
use crate::space::{CoordinateSpace, IndexTuple};
use crate::value::CoordValue;

/// Outcome of resolving one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The record's values are all on their axes.
    Found(IndexTuple),
    /// `value` is not on the axis of `dimension`.
    Miss { dimension: String, value: CoordValue },
    /// `dimension` could not read a value from the record.
    Unextractable {
        dimension: String,
        error: ExtractError,
    },
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn indices(self) -> Option<IndexTuple> {
        match self {
            Self::Found(indices) => Some(indices),
            _ => None,
        }
    }
}

/// Maps records to index tuples using a space's lookup tables.
///
/// Resolution reads only immutable data, so one resolver can serve many
/// threads.
pub struct Resolver<'a, R: ?Sized> {
    dimensions: &'a [DynDimension<R>],
    lookups: &'a [Arc<CoordinateLookup>],
}

impl<'a, R: ?Sized> Resolver<'a, R> {
    /// Fails when `dimensions` do not line up with the space's coordinates.
    pub fn new(space: &'a CoordinateSpace, dimensions: &'a [DynDimension<R>]) -> Result<Self> {
        check_dimensions(space.coordinates(), dimensions)?;
        Ok(Self::from_parts(dimensions, space.lookups()))
    }

    pub(crate) fn from_parts(
        dimensions: &'a [DynDimension<R>],
        lookups: &'a [Arc<CoordinateLookup>],
    ) -> Self {
        Self {
            dimensions,
            lookups,
        }
    }

    pub fn resolve(&self, record: &R) -> Resolution {
        let mut indices = Vec::with_capacity(self.dimensions.len());
        for (dimension, lookup) in self.dimensions.iter().zip(self.lookups) {
            let value = match dimension.extract(record) {
                Ok(value) => value,
                Err(error) => {
                    return Resolution::Unextractable {
                        dimension: dimension.name().to_string(),
                        error,
                    }
                }
            };
            match lookup.get(&value) {
                Some(index) => indices.push(index),
                None => {
                    return Resolution::Miss {
                        dimension: dimension.name().to_string(),
                        value,
                    }
                }
            }
        }
        Resolution::Found(indices)
    }
}

/// Index tuple of `record` in `space`.
///
/// `Ok(None)` when some value is not on its axis; an error when a value
/// cannot be extracted at all.
pub fn lookup<R: ?Sized>(
    space: &CoordinateSpace,
    dimensions: &[DynDimension<R>],
    record: &R,
) -> Result<Option<IndexTuple>> {
    match Resolver::new(space, dimensions)?.resolve(record) {
        Resolution::Found(indices) => Ok(Some(indices)),
        Resolution::Miss { .. } => Ok(None),
        Resolution::Unextractable { dimension, error } => {
            Err(IndexError::extraction(dimension, error))
        }
    }
}

/// Same count and kinds, in the same order.
pub(crate) fn check_dimensions<R: ?Sized>(
    coordinates: &[Arc<Coordinate>],
    dimensions: &[DynDimension<R>],
) -> Result<()> {
    if coordinates.len() != dimensions.len() {
        return Err(IndexError::ArityMismatch {
            expected: coordinates.len(),
            found: dimensions.len(),
        });
    }
    for (coordinate, dimension) in coordinates.iter().zip(dimensions) {
        let kind = dimension.kind();
        if *coordinate.kind() != kind {
            return Err(IndexError::DimensionMismatch {
                expected: coordinate.kind().to_string(),
                found: kind.to_string(),
            });
        }
    }
    Ok(())
}
