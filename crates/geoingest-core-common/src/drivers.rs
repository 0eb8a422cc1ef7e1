//! Driver registry for the formats `geoingest` can consume and produce.
//!
//! Each driver carries its support status for the three operations the CLI
//! exposes (info, read, write) and the file extensions it claims, so a driver
//! can be picked either by name or guessed from an input path.
//!
//! # Examples
//!
//! ```
//! use geoingest_core_common::drivers::{find_driver, guess_driver};
//!
//! let geojson = find_driver("geojson").expect("GeoJSON driver should exist");
//! assert!(geojson.capabilities.read.is_supported());
//!
//! let csv = guess_driver("parcels.csv").expect("csv extension is registered");
//! assert_eq!(csv.short_name, "CSV");
//! ```

use std::path::Path;

/// Support status for a specific driver operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The feature is fully supported and implemented.
    Supported,
    /// The feature is not supported by the driver.
    NotSupported,
    /// The feature is planned for future implementation.
    Planned,
}

impl SupportStatus {
    /// Returns `true` if the operation is fully supported and implemented.
    ///
    /// ```
    /// use geoingest_core_common::SupportStatus;
    ///
    /// assert!(SupportStatus::Supported.is_supported());
    /// assert!(!SupportStatus::Planned.is_supported());
    /// ```
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, SupportStatus::Supported)
    }

    /// Returns the string representation of this support status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::NotSupported => "Not Supported",
            SupportStatus::Planned => "Planned",
        }
    }
}

/// Capabilities supported by a driver.
#[derive(Debug, Clone, Copy)]
pub struct DriverCapabilities {
    /// Summarising a dataset without ingesting it.
    pub info: SupportStatus,
    /// Reading features from this format.
    pub read: SupportStatus,
    /// Writing the ingested collection to this format.
    pub write: SupportStatus,
}

impl DriverCapabilities {
    /// Returns `true` if at least one operation is fully supported.
    #[must_use]
    pub fn has_supported_operation(&self) -> bool {
        self.info.is_supported() || self.read.is_supported() || self.write.is_supported()
    }
}

/// A format driver definition.
#[derive(Debug, Clone)]
pub struct Driver {
    /// Short name used in the CLI and for driver identification (e.g., `"GeoJSON"`).
    pub short_name: &'static str,
    /// Long descriptive name for display purposes.
    pub long_name: &'static str,
    /// Lower-case file extensions claimed by the driver, without the dot.
    pub extensions: &'static [&'static str],
    /// Operations supported by this driver (info, read, write).
    pub capabilities: DriverCapabilities,
}

impl Driver {
    /// Creates a new driver definition with specified capabilities.
    #[must_use]
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        extensions: &'static [&'static str],
        info: SupportStatus,
        read: SupportStatus,
        write: SupportStatus,
    ) -> Self {
        Self {
            short_name,
            long_name,
            extensions,
            capabilities: DriverCapabilities { info, read, write },
        }
    }

    /// Returns `true` when `extension` (case-insensitive, no dot) belongs to this driver.
    #[must_use]
    pub fn claims_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Returns the complete registry of known drivers, regardless of support status.
#[must_use]
pub fn get_drivers() -> Vec<Driver> {
    use SupportStatus::{NotSupported, Planned, Supported};

    vec![
        Driver::new(
            "GeoJSON",
            "GeoJSON",
            &["geojson", "json"],
            Supported,
            Supported,
            Supported,
        ),
        Driver::new(
            "GeoJSONSeq",
            "GeoJSONSeq: sequence of GeoJSON features",
            &["geojsonl", "geojsons", "ndjson", "jsonl"],
            Supported,
            Supported,
            NotSupported,
        ),
        Driver::new(
            "CSV",
            "Comma Separated Value (.csv)",
            &["csv", "tsv"],
            Supported,
            Supported,
            NotSupported,
        ),
        Driver::new(
            "ESRI Shapefile",
            "ESRI Shapefile / DBF",
            &["shp"],
            Planned,
            Planned,
            NotSupported,
        ),
        Driver::new(
            "GPKG",
            "GeoPackage vector",
            &["gpkg"],
            Planned,
            Planned,
            NotSupported,
        ),
        Driver::new(
            "FlatGeobuf",
            "FlatGeobuf",
            &["fgb"],
            Planned,
            Planned,
            NotSupported,
        ),
        Driver::new(
            "KML",
            "Keyhole Markup Language",
            &["kml"],
            NotSupported,
            NotSupported,
            NotSupported,
        ),
    ]
}

/// Returns all drivers that have at least one fully supported operation.
#[must_use]
pub fn get_available_drivers() -> Vec<Driver> {
    get_drivers()
        .into_iter()
        .filter(|d| d.capabilities.has_supported_operation())
        .collect()
}

/// Finds a driver by its short name (case-insensitive).
#[must_use]
pub fn find_driver(name: &str) -> Option<Driver> {
    get_drivers()
        .into_iter()
        .find(|d| d.short_name.eq_ignore_ascii_case(name))
}

/// Guesses the driver for a dataset path from its file extension.
///
/// Returns `None` when the path has no extension or no driver claims it.
#[must_use]
pub fn guess_driver(path: impl AsRef<Path>) -> Option<Driver> {
    let extension = path.as_ref().extension()?.to_str()?;
    get_drivers()
        .into_iter()
        .find(|d| d.claims_extension(extension))
}

/// Returns all driver short names in alphabetically sorted order.
#[must_use]
pub fn get_driver_names() -> Vec<&'static str> {
    let mut names: Vec<_> = get_drivers().iter().map(|d| d.short_name).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_driver_case_insensitive() {
        let driver = find_driver("geojsonseq");
        assert!(driver.is_some());
        assert_eq!(driver.unwrap().short_name, "GeoJSONSeq");
    }

    #[test]
    fn test_find_unknown_driver() {
        assert!(find_driver("Parquet").is_none());
    }

    #[test]
    fn test_available_drivers() {
        let drivers = get_available_drivers();
        assert_eq!(drivers.len(), 3);
        assert!(drivers.iter().any(|d| d.short_name == "GeoJSON"));
        assert!(drivers.iter().any(|d| d.short_name == "GeoJSONSeq"));
        assert!(drivers.iter().any(|d| d.short_name == "CSV"));
    }

    #[test]
    fn test_only_geojson_writes() {
        let writers: Vec<_> = get_drivers()
            .into_iter()
            .filter(|d| d.capabilities.write.is_supported())
            .collect();
        assert_eq!(writers.len(), 1);
        assert_eq!(writers[0].short_name, "GeoJSON");
    }

    #[test]
    fn test_guess_driver_from_extension() {
        assert_eq!(guess_driver("a/b/fires.GeoJSON").unwrap().short_name, "GeoJSON");
        assert_eq!(guess_driver("fires.ndjson").unwrap().short_name, "GeoJSONSeq");
        assert_eq!(guess_driver("fires.tsv").unwrap().short_name, "CSV");
        assert!(guess_driver("fires").is_none());
        assert!(guess_driver("fires.xyz").is_none());
    }

    #[test]
    fn test_driver_names_sorted() {
        let names = get_driver_names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"CSV"));
    }

    #[test]
    fn test_support_status() {
        assert!(SupportStatus::Supported.is_supported());
        assert!(!SupportStatus::Planned.is_supported());
        assert_eq!(SupportStatus::NotSupported.as_str(), "Not Supported");
    }
}
