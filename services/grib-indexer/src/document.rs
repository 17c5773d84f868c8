//! The index file written by `grib-indexer build`.

use chrono::{DateTime, Utc};
use coord_index::{
    materialize_dense, BuildReport, CoordValue, CoordinateSpace, RecordLocation, SpaceSnapshot,
};
use grib2_parser::{FixedSurface, Grib2Tables};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

/// A coordinate space together with the files its locations point into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub created: DateTime<Utc>,
    /// Source files; `RecordLocation::file` indexes this list.
    pub files: Vec<PathBuf>,
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub parameter: Option<String>,
    pub report: BuildReport,
    /// Messages the scanner could not decode, over every indexed file.
    #[serde(default)]
    pub scan_errors: usize,
    /// Records dropped by the parameter filter.
    #[serde(default)]
    pub filtered: usize,
    pub space: SpaceSnapshot,
}

impl IndexDocument {
    pub fn new(
        space: &CoordinateSpace,
        report: BuildReport,
        files: Vec<PathBuf>,
        dimensions: Vec<String>,
        parameter: Option<String>,
    ) -> Self {
        Self {
            created: Utc::now(),
            files,
            dimensions,
            parameter,
            report,
            scan_errors: 0,
            filtered: 0,
            space: space.to_snapshot(),
        }
    }

    /// Rebuild the space, validating the stored tuples.
    pub fn to_space(&self) -> coord_index::Result<CoordinateSpace> {
        CoordinateSpace::from_snapshot(self.space.clone())
    }

    /// Path of the file a location refers to.
    pub fn file_for(&self, location: &RecordLocation) -> Option<&Path> {
        self.files.get(location.file as usize).map(PathBuf::as_path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> coord_index::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> coord_index::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

const MAX_LISTED_VALUES: usize = 12;

/// Levels read as "500 mb"; everything else keeps its query form.
fn value_label(tables: &Grib2Tables, value: &CoordValue) -> String {
    match value {
        CoordValue::Level(level) => tables.level_description(&FixedSurface {
            level_type: level.level_type(),
            value: level.value(),
        }),
        other => other.to_string(),
    }
}

/// Human-readable summary of a space: axes, fill and build report.
pub fn describe(document: &IndexDocument, space: &CoordinateSpace) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "created:    {}", document.created.to_rfc3339());
    let _ = writeln!(out, "files:      {}", document.files.len());
    if let Some(parameter) = &document.parameter {
        let _ = writeln!(out, "parameter:  {}", parameter);
    }
    let _ = writeln!(out, "report:     {}", document.report);
    if document.scan_errors > 0 || document.filtered > 0 {
        let _ = writeln!(
            out,
            "dropped:    {} undecodable, {} filtered",
            document.scan_errors, document.filtered
        );
    }

    let tables = Grib2Tables::ncep();
    for coordinate in space.coordinates() {
        let values: Vec<String> = coordinate
            .values()
            .iter()
            .take(MAX_LISTED_VALUES)
            .map(|v| value_label(&tables, v))
            .collect();
        let more = coordinate.size().saturating_sub(MAX_LISTED_VALUES);
        let _ = write!(
            out,
            "axis {} ({}): {} values [{}",
            coordinate.name(),
            coordinate.kind(),
            coordinate.size(),
            values.join(", ")
        );
        if more > 0 {
            let _ = write!(out, ", ... {} more", more);
        }
        let _ = writeln!(out, "]");
    }

    let order: Vec<usize> = (0..space.rank()).collect();
    match materialize_dense(space, &order) {
        Ok(view) => {
            let _ = writeln!(
                out,
                "cells:      {} present, {} missing of {} ({:.1}% dense)",
                view.present_count(),
                view.missing_count(),
                view.len(),
                space.density() * 100.0
            );
        }
        Err(e) => {
            let _ = writeln!(out, "cells:      {} present ({})", space.cell_count(), e);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use coord_index::{build_space, CoordValue, DynDimension, FnDimension, IndexConfig};
    use coord_index::{DimensionKind, ExtractError, LocatedRecord};
    use std::sync::Arc;

    struct Rec {
        hour: i64,
        file: u32,
    }

    impl LocatedRecord for Rec {
        fn location(&self) -> RecordLocation {
            RecordLocation {
                file: self.file,
                offset: self.hour as u64 * 100,
                length: 100,
                field: 0,
            }
        }
    }

    fn space() -> (CoordinateSpace, BuildReport) {
        let dims: Vec<DynDimension<Rec>> = vec![Arc::new(FnDimension::new(
            "time",
            DimensionKind::Time,
            |r: &Rec| Ok::<_, ExtractError>(CoordValue::Offset(r.hour)),
        ))];
        let records = vec![Rec { hour: 6, file: 1 }, Rec { hour: 0, file: 0 }];
        build_space(&dims, &records, &IndexConfig::default()).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let (space, report) = space();
        let doc = IndexDocument::new(
            &space,
            report,
            vec![PathBuf::from("f000.grib2"), PathBuf::from("f006.grib2")],
            vec!["time".to_string()],
            None,
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        doc.save(&path).unwrap();
        let loaded = IndexDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);

        let restored = loaded.to_space().unwrap();
        let entry = restored.find(&[CoordValue::Offset(6)]).unwrap();
        assert_eq!(loaded.file_for(&entry.location), Some(Path::new("f006.grib2")));
    }

    #[test]
    fn test_describe_lists_axes() {
        let (space, report) = space();
        let doc = IndexDocument::new(&space, report, vec![], vec!["time".to_string()], None);
        let text = describe(&doc, &space);
        assert!(text.contains("axis time (time): 2 values [0, 6]"));
        assert!(text.contains("2 present, 0 missing of 2"));
        assert!(!text.contains("dropped:"));
    }

    #[test]
    fn test_describe_counts_dropped_messages() {
        let (space, report) = space();
        let mut doc = IndexDocument::new(&space, report, vec![], vec!["time".to_string()], None);
        doc.scan_errors = 2;
        doc.filtered = 5;
        assert!(describe(&doc, &space).contains("dropped:    2 undecodable, 5 filtered"));
    }

    #[test]
    fn test_older_documents_default_drop_counts() {
        let (space, report) = space();
        let doc = IndexDocument::new(&space, report, vec![], vec!["time".to_string()], None);
        let mut json = serde_json::to_value(&doc).unwrap();
        let object = json.as_object_mut().unwrap();
        object.remove("scan_errors");
        object.remove("filtered");

        let loaded: IndexDocument = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.scan_errors, 0);
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_save_writes_complete_file() {
        let (space, report) = space();
        let doc = IndexDocument::new(&space, report, vec![], vec!["time".to_string()], None);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        doc.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let on_disk: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(on_disk, serde_json::to_value(&doc).unwrap());

        assert!(doc.save(dir.path().join("missing").join("index.json")).is_err());
    }
}
