//! `name=value` lookups against a built index.
//!
//! Values use the same text form the index prints: `24` for offsets,
//! `0-6` for intervals, RFC 3339 for runtimes, `100:50000` for levels
//! (type and value) and `3/7` for ensemble members (type and number).

use chrono::{DateTime, Utc};
use coord_index::{CoordValue, CoordinateSpace, DimensionKind, IndexTuple, SpaceEntry};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::document::IndexDocument;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("expected name=value, got '{0}'")]
    Syntax(String),

    #[error("index has no dimension named '{0}'")]
    UnknownDimension(String),

    #[error("dimension '{0}' given more than once")]
    Repeated(String),

    #[error("no value given for dimension '{0}'")]
    Incomplete(String),

    #[error("invalid {kind} value '{value}'")]
    InvalidValue { kind: DimensionKind, value: String },
}

/// Parse `text` as a value of a dimension of `kind`.
pub fn parse_value(kind: &DimensionKind, text: &str) -> Result<CoordValue, QueryError> {
    let text = text.trim();
    let invalid = || QueryError::InvalidValue {
        kind: kind.clone(),
        value: text.to_string(),
    };

    match kind {
        DimensionKind::Time => text.parse().map(CoordValue::Offset).map_err(|_| invalid()),
        DimensionKind::TimeInterval => {
            let (start, end) = text.split_once('-').ok_or_else(invalid)?;
            let start = start.trim().parse().map_err(|_| invalid())?;
            let end = end.trim().parse().map_err(|_| invalid())?;
            Ok(CoordValue::interval(start, end))
        }
        DimensionKind::Runtime => DateTime::parse_from_rfc3339(text)
            .map(|t| CoordValue::Runtime(t.with_timezone(&Utc)))
            .map_err(|_| invalid()),
        DimensionKind::Vertical => {
            let (level_type, value) = text.split_once(':').ok_or_else(invalid)?;
            let level_type = level_type.trim().parse().map_err(|_| invalid())?;
            let value = value.trim().parse().map_err(|_| invalid())?;
            CoordValue::level(level_type, value).ok_or_else(invalid)
        }
        DimensionKind::Ensemble => {
            let (member_kind, number) = text.split_once('/').ok_or_else(invalid)?;
            let member_kind = member_kind.trim().parse().map_err(|_| invalid())?;
            let number = number.trim().parse().map_err(|_| invalid())?;
            Ok(CoordValue::member(member_kind, number))
        }
        DimensionKind::Custom(_) => Ok(text
            .parse()
            .map(CoordValue::Int)
            .unwrap_or_else(|_| CoordValue::Text(text.to_string()))),
    }
}

/// Turn `name=value` pairs into one value per axis, in axis order.
pub fn parse_query(space: &CoordinateSpace, pairs: &[String]) -> Result<Vec<CoordValue>, QueryError> {
    let mut values: Vec<Option<CoordValue>> = vec![None; space.rank()];

    for pair in pairs {
        let (name, text) = pair
            .split_once('=')
            .ok_or_else(|| QueryError::Syntax(pair.clone()))?;
        let name = name.trim();
        let (axis, coordinate) = space
            .coordinate_named(name)
            .ok_or_else(|| QueryError::UnknownDimension(name.to_string()))?;
        if values[axis].is_some() {
            return Err(QueryError::Repeated(name.to_string()));
        }
        values[axis] = Some(parse_value(coordinate.kind(), text)?);
    }

    values
        .into_iter()
        .zip(space.coordinates())
        .map(|(value, coordinate)| {
            value.ok_or_else(|| QueryError::Incomplete(coordinate.name().to_string()))
        })
        .collect()
}

/// One located record answering a lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupHit {
    pub path: Option<PathBuf>,
    pub offset: u64,
    pub length: u64,
    pub field: u16,
    pub position: usize,
}

impl LookupHit {
    fn new(document: &IndexDocument, entry: &SpaceEntry) -> Self {
        Self {
            path: document.file_for(&entry.location).map(PathBuf::from),
            offset: entry.location.offset,
            length: entry.location.length,
            field: entry.location.field,
            position: entry.position,
        }
    }
}

/// Result of a lookup; `indices` is `None` when some value is not on its axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupAnswer {
    pub indices: Option<IndexTuple>,
    /// Every record at the cell, in stream order.
    pub hits: Vec<LookupHit>,
    /// The record the index's duplicate policy keeps for the cell.
    pub selected: Option<LookupHit>,
}

impl LookupAnswer {
    pub fn is_found(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// Resolve `pairs` to the records stored at that cell.
pub fn lookup_values(
    document: &IndexDocument,
    space: &CoordinateSpace,
    pairs: &[String],
) -> Result<LookupAnswer, QueryError> {
    let values = parse_query(space, pairs)?;
    let indices = space.indices_of(&values);

    let (hits, selected) = match &indices {
        Some(indices) => (
            space
                .entries_at(indices)
                .map(|entry| LookupHit::new(document, entry))
                .collect(),
            space
                .entry_at(indices)
                .map(|entry| LookupHit::new(document, entry)),
        ),
        None => (Vec::new(), None),
    };

    Ok(LookupAnswer {
        indices,
        hits,
        selected,
    })
}
