//! Coordinate building and space assembly over simple in-memory records.

use std::sync::Arc;

use coord_index::{
    build_space, lookup, materialize_dense, CoordValue, CoordinateBuilder, DenseCell,
    DimensionKind, DynDimension, ExtractError, FnDimension, IndexConfig, IndexError,
    LocatedRecord, RecordLocation, Resolution, Resolver,
};
use test_utils::{permutation, PRESSURE_LEVELS_PA, UNORDERED_FORECAST_HOURS};

#[derive(Debug, Clone)]
struct Field {
    hour: i64,
    pressure_hpa: Option<i64>,
    offset: u64,
}

impl LocatedRecord for Field {
    fn location(&self) -> RecordLocation {
        RecordLocation {
            file: 1,
            offset: self.offset,
            length: 64,
            field: 0,
        }
    }
}

fn field(hour: i64, pressure_hpa: i64, offset: u64) -> Field {
    Field {
        hour,
        pressure_hpa: Some(pressure_hpa),
        offset,
    }
}

fn time_dim() -> DynDimension<Field> {
    Arc::new(FnDimension::new("time", DimensionKind::Time, |f: &Field| {
        Ok(CoordValue::Offset(f.hour))
    }))
}

fn pressure_dim() -> DynDimension<Field> {
    Arc::new(FnDimension::new(
        "pressure",
        DimensionKind::Vertical,
        |f: &Field| {
            f.pressure_hpa
                .and_then(|p| CoordValue::level(100, p as f64 * 100.0))
                .ok_or_else(|| ExtractError::missing("no pressure level"))
        },
    ))
}

fn hpa(p: i64) -> CoordValue {
    CoordValue::level(100, p as f64 * 100.0).unwrap()
}

fn offsets(values: &[CoordValue]) -> Vec<i64> {
    values.iter().filter_map(|v| v.as_offset()).collect()
}

#[test]
fn test_unordered_offsets_become_sorted_axis() {
    let mut builder = CoordinateBuilder::new(time_dim());
    for (i, h) in UNORDERED_FORECAST_HOURS.iter().enumerate() {
        builder.add_record(&field(*h as i64, 500, i as u64)).unwrap();
    }
    let coordinate = builder.finish().unwrap();

    assert_eq!(offsets(coordinate.values()), vec![0, 3, 6, 12]);
    assert_eq!(builder.index_of(&field(6, 500, 0)).unwrap(), Some(2));
    assert_eq!(builder.index_of(&field(9, 500, 0)).unwrap(), None);
}

#[test]
fn test_axis_is_independent_of_arrival_order() {
    let hours: Vec<i64> = (0..24).map(|h| h * 3 % 40).collect();

    let build = |order: &[usize]| {
        let mut builder = CoordinateBuilder::new(time_dim());
        for &i in order {
            builder.add_record(&field(hours[i], 500, 0)).unwrap();
        }
        builder.finish().unwrap()
    };

    let reference = build(&(0..hours.len()).collect::<Vec<_>>());
    for stride in [5, 7, 11, 13] {
        let shuffled = build(&permutation(hours.len(), stride));
        assert_eq!(*shuffled, *reference);
    }

    let values = offsets(reference.values());
    assert!(values.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_two_by_two_with_one_hole() {
    let records = vec![
        field(0, 500, 0),
        field(6, 500, 100),
        field(6, 850, 200),
    ];
    let dims = vec![time_dim(), pressure_dim()];
    let (space, report) = build_space(&dims, &records, &IndexConfig::default()).unwrap();

    assert!(report.is_clean());
    assert_eq!(space.shape(), vec![2, 2]);

    let dense = materialize_dense(&space, &[0, 1]).unwrap();
    assert_eq!(dense.len(), 4);
    assert_eq!(dense.present_count(), 3);
    assert_eq!(dense.missing_count(), 1);
    assert_eq!(dense.get(&[0, 1]), Some(DenseCell::Missing));
    assert_eq!(
        dense.get(&[1, 1]).and_then(|c| c.entry()).map(|e| e.location.offset),
        Some(200)
    );
    assert_eq!(dense.get(&[2, 0]), None);

    let offsets = dense.fill(-1i64, |e| e.location.offset as i64);
    assert_eq!(offsets, vec![0, -1, 100, 200]);
}

#[test]
fn test_dense_view_in_transposed_order() {
    let records = vec![
        field(0, 500, 0),
        field(6, 500, 100),
        field(6, 850, 200),
    ];
    let dims = vec![time_dim(), pressure_dim()];
    let (space, _) = build_space(&dims, &records, &IndexConfig::default()).unwrap();

    let dense = materialize_dense(&space, &[1, 0]).unwrap();
    assert_eq!(dense.coordinates()[0].name(), "pressure");
    assert_eq!(dense.fill(-1i64, |e| e.location.offset as i64), vec![0, 100, -1, 200]);

    let missing: Vec<_> = dense
        .cells()
        .filter(|(_, cell)| cell.is_missing())
        .map(|(index, _)| index)
        .collect();
    assert_eq!(missing, vec![vec![1, 0]]);
}

#[test]
fn test_invalid_dimension_order() {
    let dims = vec![time_dim(), pressure_dim()];
    let (space, _) =
        build_space(&dims, &[field(0, 500, 0)], &IndexConfig::default()).unwrap();

    for order in [vec![0], vec![0, 0], vec![0, 2], vec![1, 0, 2]] {
        assert!(matches!(
            materialize_dense(&space, &order),
            Err(IndexError::InvalidDimensionOrder { .. })
        ));
    }
}

#[test]
fn test_every_record_gets_a_valid_tuple() {
    let mut records = Vec::new();
    for (i, h) in [12i64, 0, 6, 3].iter().enumerate() {
        for (j, p) in PRESSURE_LEVELS_PA.iter().enumerate() {
            records.push(field(*h, (*p / 100) as i64, (i * 100 + j) as u64));
        }
    }
    let dims = vec![time_dim(), pressure_dim()];
    let (space, report) = build_space(&dims, &records, &IndexConfig::default()).unwrap();

    assert_eq!(report.records_indexed, records.len());
    assert_eq!(space.shape(), vec![4, PRESSURE_LEVELS_PA.len()]);
    assert_eq!(space.density(), 1.0);

    for (record, entry) in records.iter().zip(space.entries()) {
        let tuple = lookup(&space, &dims, record).unwrap().unwrap();
        assert_eq!(tuple, entry.indices);
        for (d, &i) in tuple.iter().enumerate() {
            assert!(i < space.shape()[d]);
        }
        assert_eq!(entry.location, record.location());
    }
}

#[test]
fn test_lookup_miss_is_not_index_zero() {
    let dims = vec![time_dim(), pressure_dim()];
    let (space, _) =
        build_space(&dims, &[field(0, 500, 0)], &IndexConfig::default()).unwrap();

    assert_eq!(lookup(&space, &dims, &field(0, 500, 9)).unwrap(), Some(vec![0, 0]));
    assert_eq!(lookup(&space, &dims, &field(9, 500, 9)).unwrap(), None);

    let unextractable = Field {
        hour: 0,
        pressure_hpa: None,
        offset: 0,
    };
    assert!(matches!(
        lookup(&space, &dims, &unextractable),
        Err(IndexError::Extraction { .. })
    ));
}

#[test]
fn test_resolver_reports_which_dimension_missed() {
    let dims = vec![time_dim(), pressure_dim()];
    let (space, _) =
        build_space(&dims, &[field(0, 500, 0)], &IndexConfig::default()).unwrap();
    let resolver = Resolver::new(&space, &dims).unwrap();

    assert_eq!(
        resolver.resolve(&field(0, 700, 0)),
        Resolution::Miss {
            dimension: "pressure".to_string(),
            value: hpa(700),
        }
    );

    let wrong_order = vec![pressure_dim(), time_dim()];
    assert!(matches!(
        Resolver::new(&space, &wrong_order),
        Err(IndexError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_space_is_shareable_across_threads() {
    let records: Vec<Field> = (0..50).map(|i| field(i % 10, 500, i as u64)).collect();
    let dims = vec![time_dim(), pressure_dim()];
    let (space, _) = build_space(&dims, &records, &IndexConfig::default()).unwrap();
    let space = Arc::new(space);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let space = Arc::clone(&space);
            std::thread::spawn(move || space.find(&[CoordValue::Offset(t), hpa(500)]).is_some())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
