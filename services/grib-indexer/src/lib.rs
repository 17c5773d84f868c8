//! GRIB2 coordinate index builder.
//!
//! Walks directories of GRIB2 files (plain or gzip-compressed), scans every
//! field and indexes it over a configurable set of dimensions. The result is
//! written as a JSON index document that maps coordinate tuples back to the
//! byte range of each field.
//!
//! ```text
//! paths ─► load (walkdir, flate2, Grib2Scanner) ─► build_space ─► IndexDocument
//!                                                       │
//!                            lookup name=value ... ◄────┘
//! ```

pub mod config;
pub mod dims;
pub mod document;
pub mod index;
pub mod load;
pub mod query;

pub use config::IndexerConfig;
pub use dims::{build_dimensions, DimensionSpec, DimensionSpecError};
pub use document::{describe, IndexDocument};
pub use index::{build_index, update_index};
pub use load::{collect_inputs, decompress_gzip, load_records, LoadError, LoadedRecords};
pub use query::{lookup_values, parse_query, parse_value, LookupAnswer, LookupHit, QueryError};
