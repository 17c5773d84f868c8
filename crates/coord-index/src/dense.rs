//! Dense view over a sparse coordinate space.
//!
//! The view is virtual: nothing of size `product(shape)` is allocated
//! unless [`DenseView::fill`] is called.

use std::sync::Arc;

use crate::coordinate::Coordinate;
use crate::error::{IndexError, Result};
use crate::space::{CoordinateSpace, SpaceEntry};

/// Content of one dense cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenseCell<'a> {
    Present(&'a SpaceEntry),
    Missing,
}

impl<'a> DenseCell<'a> {
    pub fn entry(&self) -> Option<&'a SpaceEntry> {
        match self {
            Self::Present(entry) => Some(entry),
            Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// A space seen as a dense array with its dimensions in a chosen order.
#[derive(Debug, Clone)]
pub struct DenseView<'a> {
    space: &'a CoordinateSpace,
    /// `order[k]` is the space dimension shown as view axis `k`.
    order: Vec<usize>,
    shape: Vec<usize>,
    len: usize,
}

impl<'a> DenseView<'a> {
    pub fn new(space: &'a CoordinateSpace, order: &[usize]) -> Result<Self> {
        let rank = space.rank();
        let mut used = vec![false; rank];
        let is_permutation = order.len() == rank
            && order.iter().all(|&d| {
                d < rank && !std::mem::replace(&mut used[d], true)
            });
        if !is_permutation {
            return Err(IndexError::InvalidDimensionOrder {
                order: order.to_vec(),
                rank,
            });
        }

        let space_shape = space.shape();
        let shape: Vec<usize> = order.iter().map(|&d| space_shape[d]).collect();
        let len = space
            .dense_size()
            .ok_or_else(|| IndexError::DenseTooLarge {
                shape: shape.clone(),
            })?;
        Ok(Self {
            space,
            order: order.to_vec(),
            shape,
            len,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Coordinates in view order.
    pub fn coordinates(&self) -> Vec<&'a Arc<Coordinate>> {
        let coordinates = self.space.coordinates();
        self.order.iter().map(|&d| &coordinates[d]).collect()
    }

    /// Number of cells of the dense array.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `index` (view order). `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<DenseCell<'a>> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        let mut tuple = vec![0; index.len()];
        for (k, &i) in index.iter().enumerate() {
            tuple[self.order[k]] = i;
        }
        Some(match self.space.entry_at(&tuple) {
            Some(entry) => DenseCell::Present(entry),
            None => DenseCell::Missing,
        })
    }

    /// Every cell in row-major order of the view.
    pub fn cells(&self) -> impl Iterator<Item = (Vec<usize>, DenseCell<'a>)> + '_ {
        DenseIndices::new(&self.shape).filter_map(move |index| {
            let cell = self.get(&index)?;
            Some((index, cell))
        })
    }

    pub fn present_count(&self) -> usize {
        self.space.cell_count()
    }

    pub fn missing_count(&self) -> usize {
        self.len() - self.present_count()
    }

    /// Allocate the dense array, mapping each present entry with `f`.
    pub fn fill<T, F>(&self, missing: T, f: F) -> Vec<T>
    where
        T: Clone,
        F: Fn(&SpaceEntry) -> T,
    {
        self.cells()
            .map(|(_, cell)| match cell {
                DenseCell::Present(entry) => f(entry),
                DenseCell::Missing => missing.clone(),
            })
            .collect()
    }
}

/// Dense view of `space` with dimensions arranged as `order`.
pub fn materialize_dense<'a>(space: &'a CoordinateSpace, order: &[usize]) -> Result<DenseView<'a>> {
    DenseView::new(space, order)
}

/// Row-major multi-index iterator.
struct DenseIndices {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl DenseIndices {
    fn new(shape: &[usize]) -> Self {
        let next = if shape.iter().any(|&n| n == 0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for DenseIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;

        let mut following = current.clone();
        for axis in (0..self.shape.len()).rev() {
            following[axis] += 1;
            if following[axis] < self.shape[axis] {
                self.next = Some(following);
                break;
            }
            following[axis] = 0;
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{SpaceSnapshot, SNAPSHOT_FORMAT_VERSION};
    use crate::config::DuplicatePolicy;
    use crate::value::{CoordValue, DimensionKind};

    fn wide_space(rank: usize, size: i64) -> CoordinateSpace {
        let coordinates = (0..rank)
            .map(|d| {
                Coordinate::from_sorted(
                    format!("axis{}", d),
                    DimensionKind::Custom(format!("axis{}", d)),
                    (0..size).map(CoordValue::Offset).collect(),
                )
            })
            .collect();
        CoordinateSpace::from_snapshot(SpaceSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            policy: DuplicatePolicy::LastWins,
            coordinates,
            entries: Vec::new(),
            next_position: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        // 2^16 values on each of five axes exceeds even a 64-bit count.
        let space = wide_space(5, 1 << 16);
        assert_eq!(space.dense_size(), None);
        assert!(matches!(
            DenseView::new(&space, &[0, 1, 2, 3, 4]),
            Err(IndexError::DenseTooLarge { .. })
        ));
    }

    #[test]
    fn test_len_counts_missing_cells() {
        let space = wide_space(2, 3);
        let view = DenseView::new(&space, &[1, 0]).unwrap();
        assert_eq!(view.len(), 9);
        assert_eq!(view.missing_count(), 9);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_dense_indices_row_major() {
        let all: Vec<_> = DenseIndices::new(&[2, 3]).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn test_dense_indices_empty_axis() {
        assert_eq!(DenseIndices::new(&[3, 0]).count(), 0);
    }

    #[test]
    fn test_dense_indices_single_cell() {
        assert_eq!(DenseIndices::new(&[1, 1, 1]).count(), 1);
    }
}
