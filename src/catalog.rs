//! Rack component catalog
//!
//! Columns (uprights) and beams are looked up by the strength the rack
//! cascade requires. `TableCatalog` keeps the tables in memory and reads them
//! from TOML; its default tables cover a common range of light-duty racking.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse catalog TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// An upright profile
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RackColumn {
    pub name: String,
    /// Profile size along the rack length
    pub length: f64,
    /// Steel thickness
    pub thickness: f64,
    /// Tallest upright this profile can be made into
    pub max_height: f64,
}

impl RackColumn {
    /// At least as long and as thick as `other`
    pub fn dominates(&self, other: &RackColumn) -> bool {
        self.length >= other.length && self.thickness >= other.thickness
    }
}

/// A pallet beam profile
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RackBeam {
    pub name: String,
    /// Profile height
    pub height: f64,
    /// Longest span the beam is rated for
    pub max_span: f64,
    /// Load one beam may carry at `max_span`
    pub max_load: f64,
    /// Narrowest upright the beam connector fits
    pub min_column_length: f64,
}

/// Thickness an upright needs for a given frame load
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadClass {
    pub max_frame_load: f64,
    pub min_thickness: f64,
}

/// Lookup tables of valid columns and beams
pub trait Catalog {
    /// Weakest column at least `min_length` long and `min_thickness` thick
    fn find_column(&self, min_length: f64, min_thickness: f64) -> Option<RackColumn>;

    /// Lowest beam that spans `span` while carrying `load`
    fn find_beam(&self, span: f64, load: f64) -> Option<RackBeam>;

    fn column_by_name(&self, name: &str) -> Option<RackColumn>;

    /// Thickness an upright frame needs to carry `frame_load`
    fn min_thickness(&self, frame_load: f64) -> Option<f64>;
}

/// TOML structure for deserializing catalogs
#[derive(Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    columns: Vec<RackColumn>,
    #[serde(default)]
    beams: Vec<RackBeam>,
    #[serde(default)]
    load_classes: Vec<LoadClass>,
}

/// In-memory catalog tables
#[derive(Debug, Clone)]
pub struct TableCatalog {
    pub columns: Vec<RackColumn>,
    pub beams: Vec<RackBeam>,
    pub load_classes: Vec<LoadClass>,
}

const DEFAULT_CATALOG: &str = r#"
[[columns]]
name = "C80/1.5"
length = 80.0
thickness = 1.5
max_height = 6000.0

[[columns]]
name = "C80/2.0"
length = 80.0
thickness = 2.0
max_height = 8000.0

[[columns]]
name = "C100/2.0"
length = 100.0
thickness = 2.0
max_height = 10000.0

[[columns]]
name = "C100/2.5"
length = 100.0
thickness = 2.5
max_height = 12000.0

[[columns]]
name = "C120/2.5"
length = 120.0
thickness = 2.5
max_height = 14000.0

[[columns]]
name = "C120/3.0"
length = 120.0
thickness = 3.0
max_height = 16000.0

[[beams]]
name = "B80"
height = 80.0
max_span = 2700.0
max_load = 1000.0
min_column_length = 80.0

[[beams]]
name = "B100"
height = 100.0
max_span = 3300.0
max_load = 1600.0
min_column_length = 80.0

[[beams]]
name = "B120"
height = 120.0
max_span = 3600.0
max_load = 2200.0
min_column_length = 100.0

[[beams]]
name = "B140"
height = 140.0
max_span = 3900.0
max_load = 3000.0
min_column_length = 100.0

[[beams]]
name = "B160"
height = 160.0
max_span = 4200.0
max_load = 4000.0
min_column_length = 120.0

# Frame load (kg) an upright of the given thickness carries
[[load_classes]]
max_frame_load = 6000.0
min_thickness = 1.5

[[load_classes]]
max_frame_load = 12000.0
min_thickness = 2.0

[[load_classes]]
max_frame_load = 18000.0
min_thickness = 2.5

[[load_classes]]
max_frame_load = 26000.0
min_thickness = 3.0
"#;

impl TableCatalog {
    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a catalog from a TOML string
    pub fn from_str(content: &str) -> Result<Self, CatalogError> {
        let parsed: TomlCatalog = toml::from_str(content)?;

        let mut load_classes = parsed.load_classes;
        load_classes.sort_by(|a, b| a.max_frame_load.total_cmp(&b.max_frame_load));

        Ok(TableCatalog {
            columns: parsed.columns,
            beams: parsed.beams,
            load_classes,
        })
    }
}

impl Catalog for TableCatalog {
    fn find_column(&self, min_length: f64, min_thickness: f64) -> Option<RackColumn> {
        self.columns
            .iter()
            .filter(|c| c.length >= min_length && c.thickness >= min_thickness)
            .min_by(|a, b| {
                a.length
                    .total_cmp(&b.length)
                    .then(a.thickness.total_cmp(&b.thickness))
            })
            .cloned()
    }

    fn find_beam(&self, span: f64, load: f64) -> Option<RackBeam> {
        self.beams
            .iter()
            .filter(|b| b.max_span >= span && b.max_load >= load)
            .min_by(|a, b| {
                a.height
                    .total_cmp(&b.height)
                    .then(a.max_load.total_cmp(&b.max_load))
            })
            .cloned()
    }

    fn column_by_name(&self, name: &str) -> Option<RackColumn> {
        self.columns.iter().find(|c| c.name == name).cloned()
    }

    fn min_thickness(&self, frame_load: f64) -> Option<f64> {
        self.load_classes
            .iter()
            .find(|class| class.max_frame_load >= frame_load)
            .map(|class| class.min_thickness)
    }
}

impl Default for TableCatalog {
    fn default() -> Self {
        Self::from_str(DEFAULT_CATALOG).expect("Default catalog should be valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = TableCatalog::default();
        assert_eq!(catalog.columns.len(), 6);
        assert_eq!(catalog.beams.len(), 5);
        assert_eq!(catalog.load_classes.len(), 4);
    }

    #[test]
    fn test_find_column_picks_weakest_dominating() {
        let catalog = TableCatalog::default();
        let column = catalog.find_column(80.0, 1.5).expect("column");
        assert_eq!(column.name, "C80/1.5");

        let column = catalog.find_column(90.0, 2.1).expect("column");
        assert_eq!(column.name, "C100/2.5");

        assert!(catalog.find_column(130.0, 1.5).is_none());
    }

    #[test]
    fn test_find_beam_by_span_and_load() {
        let catalog = TableCatalog::default();
        assert_eq!(catalog.find_beam(1340.0, 400.0).unwrap().name, "B80");
        assert_eq!(catalog.find_beam(1340.0, 1250.0).unwrap().name, "B100");
        assert_eq!(catalog.find_beam(3500.0, 100.0).unwrap().name, "B120");
        assert!(catalog.find_beam(1340.0, 5000.0).is_none());
        assert!(catalog.find_beam(5000.0, 100.0).is_none());
    }

    #[test]
    fn test_min_thickness_by_frame_load() {
        let catalog = TableCatalog::default();
        assert_eq!(catalog.min_thickness(400.0), Some(1.5));
        assert_eq!(catalog.min_thickness(6000.0), Some(1.5));
        assert_eq!(catalog.min_thickness(6001.0), Some(2.0));
        assert_eq!(catalog.min_thickness(30000.0), None);
    }

    #[test]
    fn test_column_dominance() {
        let catalog = TableCatalog::default();
        let weak = catalog.column_by_name("C80/2.0").unwrap();
        let strong = catalog.column_by_name("C100/2.5").unwrap();
        let odd = catalog.column_by_name("C100/2.0").unwrap();
        assert!(strong.dominates(&weak));
        assert!(!weak.dominates(&strong));
        assert!(odd.dominates(&weak));

        let thick_short = RackColumn {
            thickness: 2.5,
            ..weak
        };
        assert!(!odd.dominates(&thick_short));
    }

    #[test]
    fn test_parse_custom_catalog() {
        let toml_str = r#"
[[columns]]
name = "U90"
length = 90.0
thickness = 2.0
max_height = 9000.0

[[load_classes]]
max_frame_load = 20000.0
min_thickness = 2.0

[[load_classes]]
max_frame_load = 5000.0
min_thickness = 1.0
"#;
        let catalog = TableCatalog::from_str(toml_str).expect("Should parse");
        assert_eq!(catalog.columns[0].name, "U90");
        assert!(catalog.beams.is_empty());
        assert_eq!(catalog.min_thickness(4000.0), Some(1.0));
        assert!(catalog.find_beam(1000.0, 10.0).is_none());
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = TableCatalog::from_str("[[columns]]\nname = 3");
        assert!(result.is_err());
    }
}
