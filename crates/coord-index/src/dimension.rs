//! The per-dimension capability: extract a value from a record, order two values.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ExtractError;
use crate::value::{CoordValue, DimensionKind};

/// One axis of a coordinate space over records of type `R`.
///
/// A dimension only knows how to read its value from a record and, if the
/// natural order of [`CoordValue`] is not wanted, how to order two values.
/// Deduplication, sorting and index assignment are shared by every
/// dimension and live in [`CoordinateBuilder`](crate::CoordinateBuilder).
pub trait Dimension<R: ?Sized>: Send + Sync {
    /// Short name used in logs, reports and snapshots.
    fn name(&self) -> &str;

    fn kind(&self) -> DimensionKind;

    fn extract(&self, record: &R) -> Result<CoordValue, ExtractError>;

    /// Total order over the values of this dimension.
    fn compare(&self, a: &CoordValue, b: &CoordValue) -> Ordering {
        a.cmp(b)
    }
}

/// Shared handle to a dimension.
pub type DynDimension<R> = Arc<dyn Dimension<R>>;

type CompareFn = Box<dyn Fn(&CoordValue, &CoordValue) -> Ordering + Send + Sync>;

/// A dimension made from closures, for record types without a dedicated
/// implementation.
///
/// ```
/// use coord_index::{CoordValue, DimensionKind, FnDimension};
///
/// struct Obs { station: String }
///
/// let station = FnDimension::new("station", DimensionKind::Custom("station".into()), |o: &Obs| {
///     Ok(CoordValue::Text(o.station.clone()))
/// });
/// # let _ = station;
/// ```
pub struct FnDimension<R: ?Sized, F> {
    name: String,
    kind: DimensionKind,
    extract: F,
    compare: Option<CompareFn>,
    _record: PhantomData<fn(&R)>,
}

impl<R: ?Sized, F> FnDimension<R, F>
where
    F: Fn(&R) -> Result<CoordValue, ExtractError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, kind: DimensionKind, extract: F) -> Self {
        Self {
            name: name.into(),
            kind,
            extract,
            compare: None,
            _record: PhantomData,
        }
    }

    /// Replace the natural value order.
    pub fn with_order<C>(mut self, compare: C) -> Self
    where
        C: Fn(&CoordValue, &CoordValue) -> Ordering + Send + Sync + 'static,
    {
        self.compare = Some(Box::new(compare));
        self
    }
}

impl<R: ?Sized, F> Dimension<R> for FnDimension<R, F>
where
    F: Fn(&R) -> Result<CoordValue, ExtractError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DimensionKind {
        self.kind.clone()
    }

    fn extract(&self, record: &R) -> Result<CoordValue, ExtractError> {
        (self.extract)(record)
    }

    fn compare(&self, a: &CoordValue, b: &CoordValue) -> Ordering {
        match &self.compare {
            Some(compare) => compare(a, b),
            None => a.cmp(b),
        }
    }
}

impl<R: ?Sized, F> fmt::Debug for FnDimension<R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDimension")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("custom_order", &self.compare.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_dimension_extracts() {
        let dim = FnDimension::new("n", DimensionKind::Custom("n".into()), |v: &i64| {
            if *v < 0 {
                Err(ExtractError::invalid("negative"))
            } else {
                Ok(CoordValue::Int(*v))
            }
        });

        assert_eq!(dim.name(), "n");
        assert_eq!(dim.extract(&4), Ok(CoordValue::Int(4)));
        assert!(matches!(dim.extract(&-1), Err(ExtractError::Invalid(_))));
    }

    #[test]
    fn test_fn_dimension_custom_order() {
        let dim = FnDimension::new("n", DimensionKind::Custom("n".into()), |v: &i64| {
            Ok(CoordValue::Int(*v))
        })
        .with_order(|a, b| b.cmp(a));

        assert_eq!(
            dim.compare(&CoordValue::Int(1), &CoordValue::Int(2)),
            Ordering::Greater
        );
    }
}
