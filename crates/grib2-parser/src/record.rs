//! Record metadata extracted from one GRIB2 field.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::error::{Grib2Error, Result};

/// Unit of a time range (GRIB2 code table 4.4).
///
/// Calendar units (month, year, decade, ...) have no fixed length and are
/// rejected rather than approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    ThreeHours,
    SixHours,
    TwelveHours,
    Day,
}

impl TimeUnit {
    /// Decode a code table 4.4 entry.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Minute),
            1 => Ok(Self::Hour),
            2 => Ok(Self::Day),
            10 => Ok(Self::ThreeHours),
            11 => Ok(Self::SixHours),
            12 => Ok(Self::TwelveHours),
            13 => Ok(Self::Second),
            other => Err(Grib2Error::UnsupportedTimeUnit(other)),
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::ThreeHours => 3 * 3_600,
            Self::SixHours => 6 * 3_600,
            Self::TwelveHours => 12 * 3_600,
            Self::Day => 86_400,
        }
    }

    /// Parse a unit name as used in configuration ("hour", "minute", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Some(Self::Second),
            "m" | "min" | "minute" | "minutes" => Some(Self::Minute),
            "h" | "hour" | "hours" => Some(Self::Hour),
            "3h" => Some(Self::ThreeHours),
            "6h" => Some(Self::SixHours),
            "12h" => Some(Self::TwelveHours),
            "d" | "day" | "days" => Some(Self::Day),
            _ => None,
        }
    }
}

/// Parameter identity: (discipline, category, number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId {
    pub discipline: u8,
    pub category: u8,
    pub number: u8,
}

impl ParameterId {
    pub fn new(discipline: u8, category: u8, number: u8) -> Self {
        Self {
            discipline,
            category,
            number,
        }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.discipline, self.category, self.number)
    }
}

/// Forecast time of a field, normalized to seconds after the reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastTime {
    /// Instantaneous product valid at `offset_secs`.
    Instant { offset_secs: i64 },
    /// Statistically processed product (accumulation, average, ...) over
    /// `[start_secs, end_secs]`.
    Interval { start_secs: i64, end_secs: i64 },
}

impl ForecastTime {
    /// Offset of the end of the validity period.
    pub fn end_secs(&self) -> i64 {
        match self {
            Self::Instant { offset_secs } => *offset_secs,
            Self::Interval { end_secs, .. } => *end_secs,
        }
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, Self::Interval { .. })
    }
}

/// First fixed surface of a field (code table 4.5) with the scale factor applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSurface {
    pub level_type: u8,
    pub value: f64,
}

/// Ensemble identification from templates 4.1 and 4.11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnsembleInfo {
    /// Type of ensemble forecast (code table 4.6).
    pub kind: u8,
    /// Perturbation number.
    pub perturbation: u8,
    /// Number of forecasts in the ensemble.
    pub size: u8,
}

/// Coordinate metadata and location of one GRIB2 field.
#[derive(Debug, Clone, PartialEq)]
pub struct GribRecord {
    /// Caller-assigned identifier of the source file.
    pub file_id: u32,
    /// Byte offset of the enclosing message in the source.
    pub offset: u64,
    /// Total length of the enclosing message.
    pub length: u64,
    /// Field position inside a multi-field message.
    pub field_index: u16,
    pub centre: u16,
    pub reference_time: DateTime<Utc>,
    /// Product definition template number (4.x).
    pub template: u16,
    pub parameter: ParameterId,
    pub forecast: ForecastTime,
    pub level: Option<FixedSurface>,
    pub ensemble: Option<EnsembleInfo>,
}

impl GribRecord {
    /// Valid time at the end of the forecast period.
    pub fn valid_time(&self) -> DateTime<Utc> {
        self.reference_time + Duration::seconds(self.forecast.end_secs())
    }
}
