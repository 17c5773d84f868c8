//! Coordinate values and dimension kinds.
//!
//! Every value that can appear on an axis is a [`CoordValue`]. The enum is
//! closed, hashable and totally ordered so that builders can deduplicate
//! with a `HashSet` and sort without consulting the record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Kind of a dimension. Two coordinates can only be merged when their
/// kinds match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    /// Forecast offset from the reference time.
    Time,
    /// Statistical processing interval (accumulations, averages).
    TimeInterval,
    /// Model run (reference) time.
    Runtime,
    Vertical,
    Ensemble,
    /// Caller-defined dimension.
    Custom(String),
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::TimeInterval => write!(f, "time_interval"),
            Self::Runtime => write!(f, "runtime"),
            Self::Vertical => write!(f, "vertical"),
            Self::Ensemble => write!(f, "ensemble"),
            Self::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// Statistical processing interval `[start, end]` in the dimension's time unit.
///
/// Intervals sort by their end first so that accumulations ending at the
/// same forecast hour sit next to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: i64,
    pub end: i64,
}

impl TimeInterval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> i64 {
        self.end - self.start
    }
}

impl Ord for TimeInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.end
            .cmp(&other.end)
            .then_with(|| self.start.cmp(&other.start))
    }
}

impl PartialOrd for TimeInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A vertical level: fixed surface type plus its value.
///
/// The value is compared bit for bit. `-0.0` is folded into `0.0` and NaN
/// is refused at construction, which makes equality, hashing and ordering
/// agree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawLevel", into = "RawLevel")]
pub struct VerticalLevel {
    level_type: u8,
    value: f64,
}

impl VerticalLevel {
    /// Returns `None` for NaN.
    pub fn new(level_type: u8, value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        let value = if value == 0.0 { 0.0 } else { value };
        Some(Self { level_type, value })
    }

    pub fn level_type(&self) -> u8 {
        self.level_type
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl PartialEq for VerticalLevel {
    fn eq(&self, other: &Self) -> bool {
        self.level_type == other.level_type && self.value.to_bits() == other.value.to_bits()
    }
}

impl Eq for VerticalLevel {}

impl Hash for VerticalLevel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level_type.hash(state);
        self.value.to_bits().hash(state);
    }
}

impl Ord for VerticalLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level_type
            .cmp(&other.level_type)
            .then_with(|| self.value.total_cmp(&other.value))
    }
}

impl PartialOrd for VerticalLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Serialize, Deserialize)]
struct RawLevel {
    level_type: u8,
    value: f64,
}

impl TryFrom<RawLevel> for VerticalLevel {
    type Error = String;

    fn try_from(raw: RawLevel) -> Result<Self, Self::Error> {
        VerticalLevel::new(raw.level_type, raw.value)
            .ok_or_else(|| format!("level type {} has a NaN value", raw.level_type))
    }
}

impl From<VerticalLevel> for RawLevel {
    fn from(level: VerticalLevel) -> Self {
        RawLevel {
            level_type: level.level_type,
            value: level.value,
        }
    }
}

/// One member of an ensemble.
///
/// `kind` follows GRIB2 code table 4.6: 0 and 1 are the high and low
/// resolution controls, anything else is a perturbed member. Controls
/// collate first, then members by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub kind: u8,
    pub number: u16,
}

impl EnsembleMember {
    pub fn new(kind: u8, number: u16) -> Self {
        Self { kind, number }
    }

    pub fn is_control(&self) -> bool {
        self.kind <= 1
    }
}

impl Ord for EnsembleMember {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .is_control()
            .cmp(&self.is_control())
            .then_with(|| self.number.cmp(&other.number))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for EnsembleMember {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A single value on a coordinate axis.
///
/// Values of different variants never share an axis in practice; the
/// derived cross-variant order only exists so the type is totally ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CoordValue {
    /// Forecast offset in whole time units.
    Offset(i64),
    Interval(TimeInterval),
    Runtime(DateTime<Utc>),
    Level(VerticalLevel),
    Ensemble(EnsembleMember),
    Int(i64),
    Text(String),
}

impl CoordValue {
    /// Level value, `None` for NaN.
    pub fn level(level_type: u8, value: f64) -> Option<Self> {
        VerticalLevel::new(level_type, value).map(Self::Level)
    }

    pub fn interval(start: i64, end: i64) -> Self {
        Self::Interval(TimeInterval::new(start, end))
    }

    pub fn member(kind: u8, number: u16) -> Self {
        Self::Ensemble(EnsembleMember::new(kind, number))
    }

    pub fn as_offset(&self) -> Option<i64> {
        match self {
            Self::Offset(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_level(&self) -> Option<&VerticalLevel> {
        match self {
            Self::Level(level) => Some(level),
            _ => None,
        }
    }
}

impl fmt::Display for CoordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(v) => write!(f, "{}", v),
            Self::Interval(i) => write!(f, "{}-{}", i.start, i.end),
            Self::Runtime(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Level(l) => write!(f, "{}:{}", l.level_type, l.value),
            Self::Ensemble(m) => write!(f, "{}/{}", m.kind, m.number),
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}
