//! Streaming CSV [`FeatureSource`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use geoingest_core_common::{
    FeatureSource, SourceFeature, SourcePosition, SourceReadError, SourceResult,
};
use geojson::{Geometry, JsonObject, JsonValue};
use log::debug;

use crate::geospatial::{lonlat_to_geometry, wkt_to_geometry};

const WKT_COLUMNS: &[&str] = &["wkt", "geometry", "geom", "the_geom"];
const LON_COLUMNS: &[&str] = &["lon", "lng", "long", "longitude", "x"];
const LAT_COLUMNS: &[&str] = &["lat", "latitude", "y"];

/// Where the geometry of each record comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeometryColumns {
    /// Detect a WKT column or a longitude/latitude pair from the header.
    #[default]
    Auto,
    /// Well-Known Text in a single column.
    Wkt {
        /// Column name.
        column: String,
    },
    /// Separate longitude and latitude columns.
    LonLat {
        /// Longitude (x) column name.
        lon: String,
        /// Latitude (y) column name.
        lat: String,
    },
}

/// Options for reading a CSV file.
#[derive(Debug, Clone)]
pub struct CsvSourceOptions {
    /// Field delimiter.
    pub delimiter: u8,
    /// Geometry column configuration.
    pub geometry: GeometryColumns,
    /// CRS of the coordinates. CSV has no way to declare one itself.
    pub crs: Option<String>,
}

impl Default for CsvSourceOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            geometry: GeometryColumns::Auto,
            crs: None,
        }
    }
}

impl CsvSourceOptions {
    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read geometries from a WKT column.
    #[must_use]
    pub fn with_wkt_column(mut self, column: impl Into<String>) -> Self {
        self.geometry = GeometryColumns::Wkt {
            column: column.into(),
        };
        self
    }

    /// Build point geometries from longitude/latitude columns.
    #[must_use]
    pub fn with_lonlat_columns(mut self, lon: impl Into<String>, lat: impl Into<String>) -> Self {
        self.geometry = GeometryColumns::LonLat {
            lon: lon.into(),
            lat: lat.into(),
        };
        self
    }

    /// Declare the CRS of the coordinates.
    #[must_use]
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum GeometryIndex {
    None,
    Wkt(usize),
    LonLat(usize, usize),
}

/// Features streamed from a CSV file, one per record.
pub struct CsvSource {
    crs: Option<String>,
    headers: StringRecord,
    geometry: GeometryIndex,
    records: StringRecordsIntoIter<Box<dyn Read + Send>>,
    record_number: u64,
    context: String,
}

impl CsvSource {
    /// Opens a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, the header cannot be
    /// read, or a configured geometry column is missing.
    pub fn open(path: impl AsRef<Path>, options: CsvSourceOptions) -> SourceResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceReadError::Io {
            source,
            context: Some(path.display().to_string()),
        })?;
        Self::from_reader(file, options, path.display().to_string())
    }

    /// Reads CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be read or a configured geometry
    /// column is missing.
    pub fn from_reader(
        reader: impl Read + Send + 'static,
        options: CsvSourceOptions,
        context: impl Into<String>,
    ) -> SourceResult<Self> {
        let context = context.into();
        let reader: Box<dyn Read + Send> = Box::new(reader);
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|err| csv_error(&err, &context, "Failed to read CSV header"))?
            .clone();
        let geometry = resolve_geometry(&headers, &options.geometry).map_err(|message| {
            SourceReadError::Parse {
                message,
                position: Some(SourcePosition::line(1)),
                context: Some(context.clone()),
            }
        })?;
        debug!("CSV source {context}: headers={headers:?}, geometry={geometry:?}");

        Ok(Self {
            crs: options.crs,
            headers,
            geometry,
            records: csv_reader.into_records(),
            record_number: 0,
            context,
        })
    }

    fn decode(&self, record: &StringRecord) -> SourceResult<SourceFeature> {
        let position = SourcePosition {
            line: record.position().map(csv::Position::line),
            record: Some(self.record_number),
            feature: None,
        };

        let geometry = self
            .record_geometry(record)
            .map_err(|message| SourceReadError::Geometry {
                message,
                position: Some(position),
            })?;

        let skip = match self.geometry {
            GeometryIndex::None => vec![],
            GeometryIndex::Wkt(idx) => vec![idx],
            GeometryIndex::LonLat(lon, lat) => vec![lon, lat],
        };
        let properties: JsonObject = self
            .headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !skip.contains(idx))
            .map(|(idx, name)| {
                let value = match record.get(idx) {
                    Some(cell) if !cell.is_empty() => JsonValue::String(cell.to_string()),
                    _ => JsonValue::Null,
                };
                (name.to_string(), value)
            })
            .collect();

        Ok(SourceFeature::new(geometry, properties))
    }

    fn record_geometry(&self, record: &StringRecord) -> Result<Option<Geometry>, String> {
        match self.geometry {
            GeometryIndex::None => Ok(None),
            GeometryIndex::Wkt(idx) => wkt_to_geometry(record.get(idx).unwrap_or_default()),
            GeometryIndex::LonLat(lon, lat) => lonlat_to_geometry(
                record.get(lon).unwrap_or_default(),
                record.get(lat).unwrap_or_default(),
            ),
        }
    }
}

fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        candidates
            .iter()
            .any(|candidate| header.trim().eq_ignore_ascii_case(candidate))
    })
}

fn resolve_geometry(
    headers: &StringRecord,
    columns: &GeometryColumns,
) -> Result<GeometryIndex, String> {
    let required = |name: &str| {
        find_column(headers, &[name]).ok_or_else(|| format!("Geometry column '{name}' not found"))
    };

    match columns {
        GeometryColumns::Wkt { column } => Ok(GeometryIndex::Wkt(required(column)?)),
        GeometryColumns::LonLat { lon, lat } => {
            Ok(GeometryIndex::LonLat(required(lon)?, required(lat)?))
        },
        GeometryColumns::Auto => {
            if let Some(idx) = find_column(headers, WKT_COLUMNS) {
                return Ok(GeometryIndex::Wkt(idx));
            }
            match (
                find_column(headers, LON_COLUMNS),
                find_column(headers, LAT_COLUMNS),
            ) {
                (Some(lon), Some(lat)) => Ok(GeometryIndex::LonLat(lon, lat)),
                _ => Ok(GeometryIndex::None),
            }
        },
    }
}

fn csv_error(err: &csv::Error, context: &str, what: &str) -> SourceReadError {
    SourceReadError::Parse {
        message: format!("{what}: {err}"),
        position: err.position().map(|pos| SourcePosition {
            line: Some(pos.line()),
            record: Some(pos.record()),
            feature: None,
        }),
        context: Some(context.to_string()),
    }
}

impl Iterator for CsvSource {
    type Item = SourceResult<SourceFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.record_number += 1;
        Some(match record {
            Ok(record) => self.decode(&record),
            Err(err) => Err(csv_error(&err, &self.context, "Failed to read CSV record")),
        })
    }
}

impl FeatureSource for CsvSource {
    fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    fn driver_name(&self) -> &'static str {
        "CSV"
    }
}
