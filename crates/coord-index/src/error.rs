//! Error types for coordinate index building.

use thiserror::Error;

/// Why a dimension could not derive a value from a record.
///
/// Extraction failures are recoverable: the record is skipped for that
/// dimension and reported, the build carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The record carries no value for this dimension.
    #[error("missing value: {0}")]
    Missing(String),

    /// The record's value exists but this dimension cannot represent it.
    #[error("unsupported value: {0}")]
    Unsupported(String),

    /// The value is malformed.
    #[error("invalid value: {0}")]
    Invalid(String),
}

impl ExtractError {
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::Missing(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Errors that can occur while building, querying or persisting an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A builder operation was called in the wrong phase. Always a
    /// programming error.
    #[error("protocol violation on dimension '{dimension}': {operation} {reason}")]
    ProtocolViolation {
        dimension: String,
        operation: &'static str,
        reason: &'static str,
    },

    /// A record could not be mapped into a dimension during a query.
    #[error("dimension '{dimension}' could not extract a value: {source}")]
    Extraction {
        dimension: String,
        #[source]
        source: ExtractError,
    },

    /// A coordinate of one dimension kind was offered to another.
    #[error("dimension mismatch: expected '{expected}', found '{found}'")]
    DimensionMismatch { expected: String, found: String },

    /// The number of dimensions does not match the space.
    #[error("expected {expected} dimensions, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// A coordinate space needs at least one dimension.
    #[error("no dimensions supplied")]
    NoDimensions,

    /// A dense view was requested with an order that is not a permutation.
    #[error("invalid dimension order {order:?} for {rank} dimensions")]
    InvalidDimensionOrder { order: Vec<usize>, rank: usize },

    /// The dense array of a space has more cells than `usize` can count.
    #[error("dense shape {shape:?} overflows the addressable cell count")]
    DenseTooLarge { shape: Vec<usize> },

    /// The persisted form failed validation.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// The persisted form was written by an unknown format version.
    #[error("unsupported snapshot format version {0}")]
    UnsupportedVersion(u32),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage/IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IndexError {
    /// Create a ProtocolViolation error.
    pub fn protocol(dimension: impl Into<String>, operation: &'static str, reason: &'static str) -> Self {
        Self::ProtocolViolation {
            dimension: dimension.into(),
            operation,
            reason,
        }
    }

    /// Create an Extraction error.
    pub fn extraction(dimension: impl Into<String>, source: ExtractError) -> Self {
        Self::Extraction {
            dimension: dimension.into(),
            source,
        }
    }

    /// Create a CorruptSnapshot error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptSnapshot(msg.into())
    }

    /// True for errors that indicate misuse of the builder protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }
}

/// Result type for coordinate index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
