//! Configuration for index building.

use serde::{Deserialize, Serialize};

/// Which record wins a cell when several share the same index tuple.
///
/// Every record is kept in the space's entry list either way; the policy
/// only decides which one a cell query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The record latest in stream order wins.
    #[default]
    LastWins,
    /// The record earliest in stream order wins.
    FirstWins,
}

impl DuplicatePolicy {
    /// Parse from string (case-insensitive). Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "last-wins" | "last" => Some(Self::LastWins),
            "first-wins" | "first" => Some(Self::FirstWins),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastWins => "last-wins",
            Self::FirstWins => "first-wins",
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for building a coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Winner selection for duplicate index tuples.
    pub duplicate_policy: DuplicatePolicy,

    /// Accumulate and finish dimensions on the rayon pool.
    pub parallel: bool,

    /// Inputs shorter than this are accumulated sequentially even when
    /// `parallel` is set.
    pub parallel_threshold: usize,

    /// Number of skipped records logged individually before only a count
    /// is reported.
    pub log_skipped_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::LastWins,
            parallel: false,
            parallel_threshold: 1024,
            log_skipped_limit: 20,
        }
    }
}

impl IndexConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COORD_INDEX_DUPLICATE_POLICY") {
            if let Some(policy) = DuplicatePolicy::parse(&val) {
                config.duplicate_policy = policy;
            }
        }

        if let Ok(val) = std::env::var("COORD_INDEX_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("COORD_INDEX_PARALLEL_THRESHOLD") {
            if let Ok(n) = val.parse() {
                config.parallel_threshold = n;
            }
        }

        if let Ok(val) = std::env::var("COORD_INDEX_LOG_SKIPPED_LIMIT") {
            if let Ok(n) = val.parse() {
                config.log_skipped_limit = n;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.parallel && self.parallel_threshold == 0 {
            return Err("parallel_threshold must be > 0 when parallel is enabled".to_string());
        }

        Ok(())
    }

    /// Whether `records` inputs should take the parallel path.
    pub fn use_parallel(&self, records: usize) -> bool {
        self.parallel && records >= self.parallel_threshold
    }
}
