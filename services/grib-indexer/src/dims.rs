//! Dimension names accepted on the command line and in configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use coord_index::{
    DynDimension, EnsembleDimension, ForecastTimeDimension, RuntimeDimension,
    TimeIntervalDimension, VerticalDimension,
};
use grib2_parser::{GribRecord, TimeUnit};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionSpecError {
    #[error("unknown dimension '{0}' (expected time, interval, runtime, vertical or ensemble)")]
    Unknown(String),

    #[error("unknown time unit '{0}'")]
    TimeUnit(String),

    #[error("invalid level type '{0}'")]
    LevelType(String),
}

/// One dimension of a GRIB space, parsed from names such as `time`,
/// `time:minute`, `vertical:100`, `vertical:100:desc` or `ensemble`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionSpec {
    Time(TimeUnit),
    Interval(TimeUnit),
    Runtime,
    Vertical {
        level_type: Option<u8>,
        descending: bool,
    },
    Ensemble,
}

impl DimensionSpec {
    pub fn build(&self) -> DynDimension<GribRecord> {
        match self {
            Self::Time(unit) => Arc::new(ForecastTimeDimension::new(*unit)),
            Self::Interval(unit) => Arc::new(TimeIntervalDimension::new(*unit)),
            Self::Runtime => Arc::new(RuntimeDimension),
            Self::Vertical {
                level_type,
                descending,
            } => {
                let dim = match level_type {
                    Some(t) => VerticalDimension::of_type(*t),
                    None => VerticalDimension::new(),
                };
                if *descending {
                    Arc::new(dim.descending())
                } else {
                    Arc::new(dim)
                }
            }
            Self::Ensemble => Arc::new(EnsembleDimension),
        }
    }
}

fn parse_unit(s: Option<&str>) -> Result<TimeUnit, DimensionSpecError> {
    match s {
        None => Ok(TimeUnit::Hour),
        Some(name) => {
            TimeUnit::from_name(name).ok_or_else(|| DimensionSpecError::TimeUnit(name.to_string()))
        }
    }
}

fn unit_name(unit: TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Second => "second",
        TimeUnit::Minute => "minute",
        TimeUnit::Hour => "hour",
        TimeUnit::ThreeHours => "3h",
        TimeUnit::SixHours => "6h",
        TimeUnit::TwelveHours => "12h",
        TimeUnit::Day => "day",
    }
}

impl FromStr for DimensionSpec {
    type Err = DimensionSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let mut parts = lower.split(':');
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        let flag = parts.next();

        match name {
            "time" => Ok(Self::Time(parse_unit(arg)?)),
            "interval" | "time_interval" => Ok(Self::Interval(parse_unit(arg)?)),
            "runtime" | "reftime" => Ok(Self::Runtime),
            "vertical" | "level" => {
                let level_type = match arg {
                    None | Some("") | Some("any") => None,
                    Some(t) => Some(
                        t.parse::<u8>()
                            .map_err(|_| DimensionSpecError::LevelType(t.to_string()))?,
                    ),
                };
                Ok(Self::Vertical {
                    level_type,
                    descending: matches!(flag, Some("desc") | Some("descending")),
                })
            }
            "ensemble" | "member" => Ok(Self::Ensemble),
            _ => Err(DimensionSpecError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for DimensionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time(unit) => write!(f, "time:{}", unit_name(*unit)),
            Self::Interval(unit) => write!(f, "interval:{}", unit_name(*unit)),
            Self::Runtime => write!(f, "runtime"),
            Self::Vertical {
                level_type,
                descending,
            } => {
                write!(f, "vertical")?;
                if let Some(t) = level_type {
                    write!(f, ":{}", t)?;
                }
                if *descending {
                    write!(f, ":desc")?;
                }
                Ok(())
            }
            Self::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// Parse every name and build the dimensions in order.
pub fn build_dimensions(names: &[String]) -> Result<Vec<DynDimension<GribRecord>>, DimensionSpecError> {
    names
        .iter()
        .map(|n| n.parse::<DimensionSpec>().map(|spec| spec.build()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use coord_index::{Dimension, DimensionKind};

    #[test]
    fn test_parse_names() {
        assert_eq!("time".parse(), Ok(DimensionSpec::Time(TimeUnit::Hour)));
        assert_eq!("TIME:minute".parse(), Ok(DimensionSpec::Time(TimeUnit::Minute)));
        assert_eq!("interval".parse(), Ok(DimensionSpec::Interval(TimeUnit::Hour)));
        assert_eq!("runtime".parse(), Ok(DimensionSpec::Runtime));
        assert_eq!(
            "vertical:100:desc".parse(),
            Ok(DimensionSpec::Vertical {
                level_type: Some(100),
                descending: true
            })
        );
        assert_eq!(
            "vertical".parse(),
            Ok(DimensionSpec::Vertical {
                level_type: None,
                descending: false
            })
        );
        assert_eq!("ensemble".parse(), Ok(DimensionSpec::Ensemble));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "humidity".parse::<DimensionSpec>(),
            Err(DimensionSpecError::Unknown(_))
        ));
        assert!(matches!(
            "time:fortnight".parse::<DimensionSpec>(),
            Err(DimensionSpecError::TimeUnit(_))
        ));
        assert!(matches!(
            "vertical:999".parse::<DimensionSpec>(),
            Err(DimensionSpecError::LevelType(_))
        ));
    }

    #[test]
    fn test_build_dimensions_in_order() {
        let names = vec!["runtime".to_string(), "time".to_string(), "vertical:100".to_string()];
        let dims = build_dimensions(&names).unwrap();
        let kinds: Vec<_> = dims.iter().map(|d| d.kind()).collect();
        assert_eq!(
            kinds,
            vec![DimensionKind::Runtime, DimensionKind::Time, DimensionKind::Vertical]
        );
    }

    #[test]
    fn test_display_round_trip() {
        let spec = DimensionSpec::Vertical {
            level_type: Some(100),
            descending: true,
        };
        assert_eq!(spec.to_string(), "vertical:100:desc");
        assert_eq!(spec.to_string().parse(), Ok(spec));

        let time = DimensionSpec::Interval(TimeUnit::SixHours);
        assert_eq!(time.to_string(), "interval:6h");
        assert_eq!(time.to_string().parse(), Ok(time));
    }
}
