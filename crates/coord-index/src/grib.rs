//! Dimensions over decoded GRIB2 records.

use std::cmp::Ordering;

use grib2_parser::{ForecastTime, GribRecord, TimeUnit};

use crate::dimension::Dimension;
use crate::error::ExtractError;
use crate::space::{LocatedRecord, RecordLocation};
use crate::value::{CoordValue, DimensionKind, EnsembleMember, TimeInterval};

impl LocatedRecord for GribRecord {
    fn location(&self) -> RecordLocation {
        RecordLocation {
            file: self.file_id,
            offset: self.offset,
            length: self.length,
            field: self.field_index,
        }
    }
}

fn whole_units(secs: i64, unit: TimeUnit) -> Result<i64, ExtractError> {
    let size = unit.seconds();
    if secs % size != 0 {
        return Err(ExtractError::invalid(format!(
            "{} s is not a whole number of {:?} units",
            secs, unit
        )));
    }
    Ok(secs / size)
}

/// Forecast offset of instantaneous products, in whole `unit`s.
#[derive(Debug, Clone)]
pub struct ForecastTimeDimension {
    unit: TimeUnit,
}

impl Default for ForecastTimeDimension {
    fn default() -> Self {
        Self::new(TimeUnit::Hour)
    }
}

impl ForecastTimeDimension {
    pub fn new(unit: TimeUnit) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }
}

impl Dimension<GribRecord> for ForecastTimeDimension {
    fn name(&self) -> &str {
        "time"
    }

    fn kind(&self) -> DimensionKind {
        DimensionKind::Time
    }

    fn extract(&self, record: &GribRecord) -> Result<CoordValue, ExtractError> {
        match record.forecast {
            ForecastTime::Instant { offset_secs } => {
                whole_units(offset_secs, self.unit).map(CoordValue::Offset)
            }
            ForecastTime::Interval { .. } => Err(ExtractError::unsupported(
                "statistically processed product has an interval, not an offset",
            )),
        }
    }
}

/// Statistical processing interval of accumulated or averaged products.
#[derive(Debug, Clone)]
pub struct TimeIntervalDimension {
    unit: TimeUnit,
}

impl Default for TimeIntervalDimension {
    fn default() -> Self {
        Self::new(TimeUnit::Hour)
    }
}

impl TimeIntervalDimension {
    pub fn new(unit: TimeUnit) -> Self {
        Self { unit }
    }
}

impl Dimension<GribRecord> for TimeIntervalDimension {
    fn name(&self) -> &str {
        "time_interval"
    }

    fn kind(&self) -> DimensionKind {
        DimensionKind::TimeInterval
    }

    fn extract(&self, record: &GribRecord) -> Result<CoordValue, ExtractError> {
        match record.forecast {
            ForecastTime::Interval {
                start_secs,
                end_secs,
            } => Ok(CoordValue::Interval(TimeInterval::new(
                whole_units(start_secs, self.unit)?,
                whole_units(end_secs, self.unit)?,
            ))),
            ForecastTime::Instant { .. } => {
                Err(ExtractError::missing("instantaneous product has no interval"))
            }
        }
    }
}

/// Reference time of the model run.
#[derive(Debug, Clone, Default)]
pub struct RuntimeDimension;

impl Dimension<GribRecord> for RuntimeDimension {
    fn name(&self) -> &str {
        "runtime"
    }

    fn kind(&self) -> DimensionKind {
        DimensionKind::Runtime
    }

    fn extract(&self, record: &GribRecord) -> Result<CoordValue, ExtractError> {
        Ok(CoordValue::Runtime(record.reference_time))
    }
}

/// Vertical level (first fixed surface).
///
/// Optionally restricted to one level type: records on other surfaces
/// fail extraction instead of being mixed into the axis.
#[derive(Debug, Clone, Default)]
pub struct VerticalDimension {
    level_type: Option<u8>,
    descending: bool,
}

impl VerticalDimension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only records on surfaces of `level_type`.
    pub fn of_type(level_type: u8) -> Self {
        Self {
            level_type: Some(level_type),
            descending: false,
        }
    }

    /// Order values from largest to smallest, e.g. pressure from the surface upward.
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }
}

impl Dimension<GribRecord> for VerticalDimension {
    fn name(&self) -> &str {
        "vertical"
    }

    fn kind(&self) -> DimensionKind {
        DimensionKind::Vertical
    }

    fn extract(&self, record: &GribRecord) -> Result<CoordValue, ExtractError> {
        let surface = record
            .level
            .ok_or_else(|| ExtractError::missing("record has no fixed surface"))?;

        if let Some(expected) = self.level_type {
            if surface.level_type != expected {
                return Err(ExtractError::unsupported(format!(
                    "level type {} (expected {})",
                    surface.level_type, expected
                )));
            }
        }

        CoordValue::level(surface.level_type, surface.value)
            .ok_or_else(|| ExtractError::invalid("level value is NaN"))
    }

    fn compare(&self, a: &CoordValue, b: &CoordValue) -> Ordering {
        match (self.descending, a.as_level(), b.as_level()) {
            (true, Some(x), Some(y)) => x
                .level_type()
                .cmp(&y.level_type())
                .then_with(|| y.value().total_cmp(&x.value())),
            _ => a.cmp(b),
        }
    }
}

/// Ensemble member of templates 4.1 and 4.11.
#[derive(Debug, Clone, Default)]
pub struct EnsembleDimension;

impl Dimension<GribRecord> for EnsembleDimension {
    fn name(&self) -> &str {
        "ensemble"
    }

    fn kind(&self) -> DimensionKind {
        DimensionKind::Ensemble
    }

    fn extract(&self, record: &GribRecord) -> Result<CoordValue, ExtractError> {
        record
            .ensemble
            .map(|e| CoordValue::Ensemble(EnsembleMember::new(e.kind, u16::from(e.perturbation))))
            .ok_or_else(|| ExtractError::missing("deterministic product has no ensemble member"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use grib2_parser::{EnsembleInfo, FixedSurface, ParameterId};

    fn record(forecast: ForecastTime, level: Option<FixedSurface>) -> GribRecord {
        GribRecord {
            file_id: 3,
            offset: 1024,
            length: 180,
            field_index: 1,
            centre: 7,
            reference_time: Utc.with_ymd_and_hms(2025, 12, 10, 12, 0, 0).unwrap(),
            template: 0,
            parameter: ParameterId::new(0, 0, 0),
            forecast,
            level,
            ensemble: None,
        }
    }

    fn instant(hours: i64) -> ForecastTime {
        ForecastTime::Instant {
            offset_secs: hours * 3600,
        }
    }

    fn isobaric(pa: f64) -> Option<FixedSurface> {
        Some(FixedSurface {
            level_type: 100,
            value: pa,
        })
    }

    #[test]
    fn test_location() {
        let r = record(instant(0), None);
        assert_eq!(
            r.location(),
            RecordLocation {
                file: 3,
                offset: 1024,
                length: 180,
                field: 1
            }
        );
    }

    #[test]
    fn test_forecast_time_in_hours() {
        let dim = ForecastTimeDimension::default();
        assert_eq!(dim.extract(&record(instant(24), None)), Ok(CoordValue::Offset(24)));
    }

    #[test]
    fn test_forecast_time_in_minutes() {
        let dim = ForecastTimeDimension::new(TimeUnit::Minute);
        let r = record(ForecastTime::Instant { offset_secs: 5400 }, None);
        assert_eq!(dim.extract(&r), Ok(CoordValue::Offset(90)));
    }

    #[test]
    fn test_fractional_offset_fails() {
        let dim = ForecastTimeDimension::default();
        let r = record(ForecastTime::Instant { offset_secs: 5400 }, None);
        assert!(matches!(dim.extract(&r), Err(ExtractError::Invalid(_))));
    }

    #[test]
    fn test_interval_product_has_no_offset() {
        let forecast = ForecastTime::Interval {
            start_secs: 0,
            end_secs: 6 * 3600,
        };
        let r = record(forecast, None);

        assert!(matches!(
            ForecastTimeDimension::default().extract(&r),
            Err(ExtractError::Unsupported(_))
        ));
        assert_eq!(
            TimeIntervalDimension::default().extract(&r),
            Ok(CoordValue::interval(0, 6))
        );
        assert!(TimeIntervalDimension::default()
            .extract(&record(instant(6), None))
            .is_err());
    }

    #[test]
    fn test_runtime() {
        let r = record(instant(0), None);
        assert_eq!(
            RuntimeDimension.extract(&r),
            Ok(CoordValue::Runtime(r.reference_time))
        );
    }

    #[test]
    fn test_vertical_restricted_to_type() {
        let dim = VerticalDimension::of_type(100);
        assert_eq!(
            dim.extract(&record(instant(0), isobaric(50_000.0))),
            Ok(CoordValue::level(100, 50_000.0).unwrap())
        );

        let surface = Some(FixedSurface {
            level_type: 1,
            value: 0.0,
        });
        assert!(matches!(
            dim.extract(&record(instant(0), surface)),
            Err(ExtractError::Unsupported(_))
        ));
        assert!(matches!(
            dim.extract(&record(instant(0), None)),
            Err(ExtractError::Missing(_))
        ));
    }

    #[test]
    fn test_vertical_descending_order() {
        let dim = VerticalDimension::of_type(100).descending();
        let low = CoordValue::level(100, 85_000.0).unwrap();
        let high = CoordValue::level(100, 25_000.0).unwrap();
        assert_eq!(dim.compare(&low, &high), Ordering::Less);
        assert_eq!(VerticalDimension::new().compare(&low, &high), Ordering::Greater);
    }

    #[test]
    fn test_ensemble_member() {
        let mut r = record(instant(0), None);
        assert!(EnsembleDimension.extract(&r).is_err());

        r.ensemble = Some(EnsembleInfo {
            kind: 3,
            perturbation: 12,
            size: 30,
        });
        assert_eq!(EnsembleDimension.extract(&r), Ok(CoordValue::member(3, 12)));
    }
}
