//! Error types for GRIB2 scanning.

use thiserror::Error;

/// Errors raised while scanning a GRIB2 stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Grib2Error {
    #[error("invalid GRIB2 format at offset {offset}: {reason}")]
    InvalidFormat { offset: u64, reason: String },

    #[error("invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("unsupported GRIB edition {edition} at offset {offset}")]
    UnsupportedEdition { edition: u8, offset: u64 },

    #[error("unsupported product definition template 4.{0}")]
    UnsupportedTemplate(u16),

    #[error("unsupported time range unit {0} (code table 4.4)")]
    UnsupportedTimeUnit(u8),

    #[error("message at offset {offset} declares {declared} bytes but only {available} remain")]
    Truncated {
        offset: u64,
        declared: u64,
        available: u64,
    },
}

impl Grib2Error {
    /// Create an InvalidSection error.
    pub fn section(section: u8, reason: impl Into<String>) -> Self {
        Self::InvalidSection {
            section,
            reason: reason.into(),
        }
    }

    /// Create an InvalidFormat error.
    pub fn format(offset: u64, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type for GRIB2 scanning.
pub type Result<T> = std::result::Result<T, Grib2Error>;
