//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting dataset information, drivers and ingest results.

use std::path::Path;

use tabled::{Table, Tabled};

use geoingest_core::types::{DatasetInfo, IngestStats};
use geoingest_core_common::Driver;

/// Table row representation for displaying geometry type counts.
#[derive(Tabled)]
pub struct GeometryRow {
    /// Geometry type name.
    #[tabled(rename = "Geometry Type")]
    pub geometry_type: String,
    /// Number of features with that geometry type.
    #[tabled(rename = "Features")]
    pub count: usize,
}

/// Table row representation for displaying field/column information.
#[derive(Tabled)]
pub struct FieldRow {
    /// Name of the field.
    #[tabled(rename = "Field")]
    pub name: String,
    /// JSON type(s) seen for the field.
    #[tabled(rename = "Type")]
    pub data_type: String,
    /// Number of features with a non-null value.
    #[tabled(rename = "Non-null")]
    pub non_null: usize,
}

/// Table row representation for displaying driver information.
#[derive(Tabled)]
pub struct DriverRow {
    /// Short identifier for the driver (e.g., `GeoJSON`, `CSV`).
    #[tabled(rename = "Short Name")]
    pub short_name: String,
    /// Full descriptive name of the driver format.
    #[tabled(rename = "Long Name")]
    pub long_name: String,
    /// File extensions claimed by the driver.
    #[tabled(rename = "Extensions")]
    pub extensions: String,
    /// Support status for reading dataset metadata and information.
    #[tabled(rename = "Info")]
    pub info: String,
    /// Support status for reading data from this format.
    #[tabled(rename = "Read")]
    pub read: String,
    /// Support status for writing data to this format.
    #[tabled(rename = "Write")]
    pub write: String,
}

/// Table row representation for the ingest summary.
#[derive(Tabled)]
pub struct StatsRow {
    /// Counter name.
    #[tabled(rename = "Features")]
    pub label: &'static str,
    /// Counter value.
    #[tabled(rename = "Count")]
    pub count: usize,
}

/// Renders the driver registry as a table.
pub fn drivers_table(drivers: &[Driver]) -> String {
    let rows: Vec<DriverRow> = drivers
        .iter()
        .map(|d| DriverRow {
            short_name: d.short_name.to_string(),
            long_name: d.long_name.to_string(),
            extensions: d.extensions.join(", "),
            info: d.capabilities.info.as_str().to_string(),
            read: d.capabilities.read.as_str().to_string(),
            write: d.capabilities.write.as_str().to_string(),
        })
        .collect();

    Table::new(rows).to_string()
}

fn stats_rows(stats: &IngestStats) -> Vec<StatsRow> {
    vec![
        StatsRow {
            label: "skipped",
            count: stats.skipped,
        },
        StatsRow {
            label: "kept",
            count: stats.kept,
        },
        StatsRow {
            label: "merged",
            count: stats.merged,
        },
        StatsRow {
            label: "errored",
            count: stats.errored,
        },
        StatsRow {
            label: "written",
            count: stats.output(),
        },
    ]
}

/// Display the ingest counters after a run.
pub fn display_ingest_stats(stats: &IngestStats, output: &Path) {
    println!("\nWrote {} feature(s) to {}\n", stats.output(), output.display());
    println!("{}", Table::new(stats_rows(stats)));
}

/// Display dataset information in a formatted table.
///
/// Presents the dataset path, driver, CRS and extent, then the geometry
/// types and property fields seen in the dataset.
pub fn display_dataset_info(info: &DatasetInfo) {
    println!("\nDataset: {}", info.dataset);
    println!("Driver: {} ({})", info.driver, info.driver_long_name);
    println!("CRS: {}", info.crs.as_deref().unwrap_or("N/A (assumed EPSG:4326)"));
    println!("Features: {}", info.feature_count);
    if info.null_geometry_count > 0 {
        println!("Features without geometry: {}", info.null_geometry_count);
    }
    if info.unreadable_count > 0 {
        println!("Unreadable records: {}", info.unreadable_count);
    }
    if let Some([min_x, min_y, max_x, max_y]) = info.bbox {
        println!("Extent: ({min_x}, {min_y}) - ({max_x}, {max_y})");
    }

    if !info.geometry_types.is_empty() {
        println!("\n=== Geometry Types ===");

        let geo_rows: Vec<GeometryRow> = info
            .geometry_types
            .iter()
            .map(|(geometry_type, count)| GeometryRow {
                geometry_type: geometry_type.clone(),
                count: *count,
            })
            .collect();

        println!("{}", Table::new(geo_rows));
    }

    if !info.fields.is_empty() {
        println!("\n=== Fields ===");

        let field_rows: Vec<FieldRow> = info
            .fields
            .iter()
            .map(|f| FieldRow {
                name: f.name.clone(),
                data_type: f.data_type.clone(),
                non_null: f.non_null,
            })
            .collect();

        println!("{}", Table::new(field_rows));
    }
}
