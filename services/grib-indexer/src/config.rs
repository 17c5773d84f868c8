//! Indexer configuration.
//!
//! Defaults come from the environment; a YAML file, when given, overrides
//! them. YAML values may reference environment variables with `${VAR}` or
//! `${VAR:-default}`.

use anyhow::{Context, Result};
use coord_index::IndexConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::dims::DimensionSpec;

/// Top-level indexer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Index building options
    pub index: IndexConfig,

    /// Dimensions of the space, in order (e.g. `time`, `vertical:100`).
    pub dimensions: Vec<String>,

    /// Only index records of this parameter (short name, e.g. `TMP`).
    pub parameter: Option<String>,

    /// Files read concurrently
    pub concurrency: usize,

    /// File name suffixes picked up when walking directories
    pub extensions: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            dimensions: vec!["time".to_string(), "vertical".to_string()],
            parameter: None,
            concurrency: 4,
            extensions: vec![
                ".grib2".to_string(),
                ".grb2".to_string(),
                ".grib2.gz".to_string(),
            ],
        }
    }
}

impl IndexerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            index: IndexConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = env::var("INDEXER_DIMENSIONS") {
            config.dimensions = split_list(&val);
        }

        if let Ok(val) = env::var("INDEXER_PARAMETER") {
            if !val.trim().is_empty() {
                config.parameter = Some(val.trim().to_string());
            }
        }

        if let Ok(val) = env::var("INDEXER_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.concurrency = n;
            }
        }

        config
    }

    /// Load a YAML file over the environment defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read indexer config from {:?}", path.as_ref()))?;

        let expanded = expand_env_vars(&content)?;

        let overrides: serde_yaml::Value = serde_yaml::from_str(&expanded)
            .with_context(|| "Failed to parse indexer config YAML")?;

        let mut merged = serde_yaml::to_value(Self::from_env())?;
        merge_yaml(&mut merged, overrides);

        let config: Self = serde_yaml::from_value(merged)
            .with_context(|| format!("Invalid indexer config in {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.index
            .validate()
            .map_err(|e| anyhow::anyhow!("index: {}", e))?;

        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be > 0");
        }

        if self.dimensions.is_empty() {
            anyhow::bail!("at least one dimension is required");
        }

        for name in &self.dimensions {
            name.parse::<DimensionSpec>()
                .with_context(|| format!("Invalid dimension '{}'", name))?;
        }

        Ok(())
    }

    /// Whether `file_name` looks like a GRIB2 file this indexer reads.
    pub fn accepts(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(&ext.to_lowercase()))
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Recursively overlay `overrides` onto `base`. Mappings merge, null keeps
/// the base value, anything else replaces it.
fn merge_yaml(base: &mut serde_yaml::Value, overrides: serde_yaml::Value) {
    match (base, overrides) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (_, serde_yaml::Value::Null) => {}
        (base, overrides) => *base = overrides,
    }
}

/// Expand environment variables in YAML content.
/// Supports ${VAR} and ${VAR:-default} syntax.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coord_index::DuplicatePolicy;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = IndexerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dimensions, vec!["time", "vertical"]);
    }

    #[test]
    fn test_accepts_extensions() {
        let config = IndexerConfig::default();
        assert!(config.accepts("gfs.t12z.pgrb2.0p25.f003.grib2"));
        assert!(config.accepts("HRRR.GRIB2.GZ"));
        assert!(!config.accepts("index.json"));
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        env::remove_var("GRIB_INDEXER_UNSET_VAR");
        let result = expand_env_vars("policy: ${GRIB_INDEXER_UNSET_VAR:-first-wins}").unwrap();
        assert_eq!(result, "policy: first-wins");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        env::remove_var("GRIB_INDEXER_REQUIRED_VAR");
        assert!(expand_env_vars("${GRIB_INDEXER_REQUIRED_VAR}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "dimensions: [time, \"vertical:100\", ensemble]\nparameter: TMP\nindex:\n  duplicate_policy: first-wins"
        )
        .unwrap();

        let config = IndexerConfig::from_yaml(file.path()).unwrap();
        assert_eq!(config.dimensions, vec!["time", "vertical:100", "ensemble"]);
        assert_eq!(config.parameter.as_deref(), Some("TMP"));
        assert_eq!(config.index.duplicate_policy, DuplicatePolicy::FirstWins);
        // Untouched nested keys keep their defaults.
        assert_eq!(config.index.log_skipped_limit, 20);
    }

    #[test]
    fn test_yaml_rejects_unknown_dimension() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dimensions: [time, humidity]").unwrap();
        assert!(IndexerConfig::from_yaml(file.path()).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" time, vertical:100 ,,"), vec!["time", "vertical:100"]);
    }
}
