//! GRIB2 message scanner (WMO FM 92 GRIB Edition 2).
//!
//! This crate walks a GRIB2 byte stream message by message and extracts the
//! coordinate metadata needed to index an archive: reference time, forecast
//! offset or statistical interval, vertical level, ensemble member and the
//! byte location of every field. Payload values are never unpacked.
//!
//! # Example
//!
//! ```ignore
//! use grib2_parser::Grib2Scanner;
//!
//! let data = bytes::Bytes::from(std::fs::read("gfs.t00z.pgrb2.0p25.f006")?);
//! for record in Grib2Scanner::new(data) {
//!     let record = record?;
//!     println!("{} @ {}", record.parameter, record.offset);
//! }
//! ```

pub mod error;
pub mod record;
pub mod scanner;
pub mod sections;
pub mod tables;

pub use error::{Grib2Error, Result};
pub use record::{EnsembleInfo, FixedSurface, ForecastTime, GribRecord, ParameterId, TimeUnit};
pub use scanner::Grib2Scanner;
pub use tables::{Grib2Tables, LevelDescription};
