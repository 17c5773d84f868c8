//! Coordinate Index Builder for GRIB Collections
//!
//! A GRIB collection is a flat stream of records, each describing one 2D
//! field at some forecast time, vertical level, ensemble member and run.
//! This crate turns that stream into a sparse N-dimensional index:
//!
//! - **Coordinates**: one sorted, duplicate-free axis per dimension
//! - **Index tuples**: every record mapped to its position on each axis
//! - **Dense views**: the sparse space seen as an array, holes marked missing
//!
//! # Architecture
//!
//! ```text
//! GRIB records (stream order)
//!      │
//!      ▼
//! SpaceBuilder::accumulate(record)         pass 1
//!      │
//!      ├─► CoordinateBuilder per dimension (Dimension::extract)
//!      │
//!      ▼
//! SpaceBuilder::finish()                   sort + freeze every axis
//!      │
//!      ▼
//! SpaceIndexer::assign(record)             pass 2
//!      │
//!      ├─► Resolver: value → index per axis (hash lookup)
//!      │         │
//!      │         ├─► Found: SpaceEntry { location, indices }
//!      │         │
//!      │         └─► Miss / Unextractable: BuildReport
//!      │
//!      ▼
//! CoordinateSpace (immutable, Arc-shared)
//!      │
//!      ├─► find([values]) / entry_at(indices) / lookup(record)
//!      ├─► materialize_dense(order)
//!      └─► save_json / extend(new records)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use coord_index::{build_space, CoordValue, DynDimension, ForecastTimeDimension,
//!     IndexConfig, VerticalDimension};
//! use grib2_parser::{GribRecord, Grib2Scanner};
//!
//! let records: Vec<GribRecord> = Grib2Scanner::new(bytes).filter_map(Result::ok).collect();
//! let dims: Vec<DynDimension<GribRecord>> = vec![
//!     Arc::new(ForecastTimeDimension::default()),
//!     Arc::new(VerticalDimension::of_type(100)),
//! ];
//!
//! let (space, report) = build_space(&dims, &records, &IndexConfig::default())?;
//! let level = CoordValue::level(100, 50_000.0).unwrap();
//! let entry = space.find(&[CoordValue::Offset(24), level]);
//! ```

pub mod builder;
pub mod config;
pub mod coordinate;
pub mod dense;
pub mod dimension;
pub mod error;
pub mod grib;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod space;
pub mod value;

// Re-export commonly used types at crate root
pub use builder::{AddOutcome, CoordinateBuilder};
pub use config::{DuplicatePolicy, IndexConfig};
pub use coordinate::{Coordinate, CoordinateLookup};
pub use dense::{materialize_dense, DenseCell, DenseView};
pub use dimension::{Dimension, DynDimension, FnDimension};
pub use error::{ExtractError, IndexError, Result};
pub use grib::{
    EnsembleDimension, ForecastTimeDimension, RuntimeDimension, TimeIntervalDimension,
    VerticalDimension,
};
pub use report::{BuildReport, DuplicateTuple, LookupMissRecord, SkippedRecord};
pub use resolver::{lookup, Resolution, Resolver};
pub use snapshot::{SpaceSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use space::{
    build_space, CoordinateSpace, IndexTuple, LocatedRecord, RecordLocation, SpaceBuilder,
    SpaceEntry, SpaceIndexer,
};
pub use value::{CoordValue, DimensionKind, EnsembleMember, TimeInterval, VerticalLevel};
