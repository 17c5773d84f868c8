//! GRIB2 parameter and level lookup tables.
//!
//! Tables translate numeric codes into short names and level descriptions
//! for logs and inventories. They are plain values: build one (usually with
//! [`Grib2Tables::ncep`]) at startup and pass it by reference to whatever
//! needs names. Nothing here is global.

use std::collections::HashMap;

use crate::record::{FixedSurface, GribRecord, ParameterId};

/// Level description - either static text or a template with a value placeholder
#[derive(Debug, Clone)]
pub enum LevelDescription {
    /// Static description (e.g., "surface", "mean sea level")
    Static(String),
    /// Template with `{value}` or `{value_hpa}` placeholder (e.g., "{value_hpa} mb")
    Template(String),
}

impl LevelDescription {
    /// Format the level description, substituting placeholders if it's a template.
    ///
    /// Supported placeholders:
    /// - `{value}` - level value as decoded (e.g., 50000 for 500 mb in Pa)
    /// - `{value_hpa}` - value converted from Pa to hPa
    pub fn format(&self, value: f64) -> String {
        match self {
            LevelDescription::Static(s) => s.clone(),
            LevelDescription::Template(t) => t
                .replace("{value_hpa}", &format_number(value / 100.0))
                .replace("{value}", &format_number(value)),
        }
    }
}

/// GRIB2 parameter and level lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    parameters: HashMap<ParameterId, String>,
    levels: HashMap<u8, LevelDescription>,
}

impl Grib2Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables covering the WMO codes used by NCEP models (GFS, HRRR, GEFS).
    pub fn ncep() -> Self {
        let mut tables = Self::new();

        for (d, c, n, name) in [
            (0, 0, 0, "TMP"),
            (0, 0, 2, "POT"),
            (0, 0, 6, "DPT"),
            (0, 1, 0, "SPFH"),
            (0, 1, 1, "RH"),
            (0, 1, 3, "PWAT"),
            (0, 1, 7, "PRATE"),
            (0, 1, 8, "APCP"),
            (0, 1, 10, "ACPCP"),
            (0, 2, 0, "WDIR"),
            (0, 2, 1, "WIND"),
            (0, 2, 2, "UGRD"),
            (0, 2, 3, "VGRD"),
            (0, 2, 8, "VVEL"),
            (0, 2, 10, "ABSV"),
            (0, 2, 22, "GUST"),
            (0, 3, 0, "PRES"),
            (0, 3, 1, "PRMSL"),
            (0, 3, 5, "HGT"),
            (0, 6, 1, "TCDC"),
            (0, 7, 6, "CAPE"),
            (0, 7, 7, "CIN"),
            (0, 16, 196, "REFC"),
            (0, 19, 0, "VIS"),
        ] {
            tables.add_parameter(ParameterId::new(d, c, n), name.to_string());
        }

        use LevelDescription::{Static, Template};
        tables.add_level(1, Static("surface".to_string()));
        tables.add_level(7, Static("tropopause".to_string()));
        tables.add_level(8, Static("top of atmosphere".to_string()));
        tables.add_level(100, Template("{value_hpa} mb".to_string()));
        tables.add_level(101, Static("mean sea level".to_string()));
        tables.add_level(102, Template("{value} m above MSL".to_string()));
        tables.add_level(103, Template("{value} m above ground".to_string()));
        tables.add_level(104, Template("sigma level {value}".to_string()));
        tables.add_level(105, Template("hybrid level {value}".to_string()));
        tables.add_level(106, Template("{value} m below surface".to_string()));
        tables.add_level(200, Static("entire atmosphere".to_string()));

        tables
    }

    /// Add a parameter mapping
    pub fn add_parameter(&mut self, id: ParameterId, name: String) {
        self.parameters.insert(id, name);
    }

    /// Add a level description mapping
    pub fn add_level(&mut self, level_type: u8, description: LevelDescription) {
        self.levels.insert(level_type, description);
    }

    /// Look up parameter short name.
    ///
    /// Returns "P{discipline}_{category}_{number}" if not found.
    pub fn parameter_name(&self, id: &ParameterId) -> String {
        self.parameters
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("P{}_{}_{}", id.discipline, id.category, id.number))
    }

    /// Reverse lookup of a short name, case-insensitive.
    pub fn parameter_id(&self, name: &str) -> Option<ParameterId> {
        self.parameters
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, _)| *id)
    }

    /// Look up level description.
    ///
    /// Returns "Level type {type} value {value}" if not found.
    pub fn level_description(&self, surface: &FixedSurface) -> String {
        match self.levels.get(&surface.level_type) {
            Some(desc) => desc.format(surface.value),
            None => format!(
                "Level type {} value {}",
                surface.level_type,
                format_number(surface.value)
            ),
        }
    }

    /// One-line description of a record, e.g. "TMP 500 mb".
    pub fn describe(&self, record: &GribRecord) -> String {
        let name = self.parameter_name(&record.parameter);
        match &record.level {
            Some(level) => format!("{} {}", name, self.level_description(level)),
            None => name,
        }
    }

    /// Get the number of parameters in the table
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Get the number of level types in the table
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Check if the tables are empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.levels.is_empty()
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
