//! Core ingest operations.
//!
//! [`ingest`] runs the single pass over a feature source: filtering, 2D
//! normalisation, reprojection to WGS84, validity repair, winding order,
//! property mapping, optional merging and the computed `acres`/`bbox`/`id`
//! fields. [`open_source`] and [`dataset_info`] resolve drivers and read
//! datasets for it.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use geo::BoundingRect;
use geo_types::Geometry;
use geoingest_core_common::drivers::{Driver, find_driver, guess_driver};
use geoingest_core_common::{FeatureSource, SourceFeature, SourceReadError, geometry_type_name};
use geoingest_csv::{CsvSource, CsvSourceOptions};
use geoingest_geojson::GeoJsonSource;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use log::{debug, error, info};

use crate::error::{
    ConfigError, DriverError, FeatureError, FormatError, GeoIngestError, IoError, Result,
    driver_not_found,
};
use crate::filter::FeatureFilter;
use crate::geometry::{fix_geometry, force_2d, force_ccw, to_geo};
use crate::measure::{area_acres, collection_bbox, feature_bbox};
use crate::merge::merge_features;
use crate::properties::PropertyTransformer;
use crate::reproject::{Crs, Reprojector};
use crate::types::{DatasetInfo, FieldInfo, IngestStats, IngestedFeature};

/// Default number of decimals kept in output coordinates.
pub const DEFAULT_PRECISION: u32 = 6;

const MAX_PRECISION: u32 = 15;

/// Configuration of an ingest run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// CRS of the output coordinates
    pub target_crs: Crs,
    /// CRS of the input, overriding whatever the source declares
    pub source_crs: Option<Crs>,
    /// Decimals kept in output coordinates; `None` keeps full precision
    pub precision: Option<u32>,
    /// Split geometries that cross the antimeridian
    pub antimeridian_cutting: bool,
    /// Merge features sharing this source property
    pub merge_on: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            target_crs: Crs::wgs84(),
            source_crs: None,
            precision: Some(DEFAULT_PRECISION),
            antimeridian_cutting: true,
            merge_on: None,
        }
    }
}

impl IngestOptions {
    /// Creates the default options: WGS84 output, 6 decimals, cutting on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output CRS.
    #[must_use]
    pub fn with_target_crs(mut self, crs: Crs) -> Self {
        self.target_crs = crs;
        self
    }

    /// Override the CRS declared by the source.
    #[must_use]
    pub fn with_source_crs(mut self, crs: Crs) -> Self {
        self.source_crs = Some(crs);
        self
    }

    /// Set the output precision.
    #[must_use]
    pub fn with_precision(mut self, precision: Option<u32>) -> Self {
        self.precision = precision;
        self
    }

    /// Enable or disable antimeridian cutting.
    #[must_use]
    pub fn with_antimeridian_cutting(mut self, enabled: bool) -> Self {
        self.antimeridian_cutting = enabled;
        self
    }

    /// Merge features sharing the source property `key`.
    #[must_use]
    pub fn with_merge_on(mut self, key: impl Into<String>) -> Self {
        self.merge_on = Some(key.into());
        self
    }

    /// Checks the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a precision above 15 decimals or an
    /// empty merge key.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(precision) = self.precision.filter(|p| *p > MAX_PRECISION) {
            return Err(ConfigError::InvalidOption {
                option: "precision".to_string(),
                message: format!("{precision} decimals exceeds the maximum of {MAX_PRECISION}"),
            });
        }
        if self.merge_on.as_deref().is_some_and(|key| key.trim().is_empty()) {
            return Err(ConfigError::InvalidOption {
                option: "merge-on".to_string(),
                message: "merge key cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Result of an ingest run.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    /// The output collection
    pub collection: FeatureCollection,
    /// Run counters
    pub stats: IngestStats,
}

/// Ingests every feature of `source` into a WGS84 `GeoJSON` collection.
///
/// Features rejected by `filter` are skipped. A feature that fails any step
/// (undecodable record, missing geometry, reprojection failure, property
/// mapping failure) is logged and counted as errored; the run carries on.
///
/// # Errors
///
/// Returns an error only for run-level problems: invalid options or a CRS
/// that cannot be resolved.
pub fn ingest<S, T>(
    source: S,
    transformer: &T,
    options: &IngestOptions,
    filter: Option<&dyn FeatureFilter>,
) -> Result<IngestOutput>
where
    S: FeatureSource,
    T: PropertyTransformer + ?Sized,
{
    options.validate()?;

    let source_crs = resolve_source_crs(&source, options)?;
    info!(
        "Ingesting {} source: {} -> {}",
        source.driver_name(),
        source_crs,
        options.target_crs
    );
    let reprojector = Reprojector::new(source_crs, options.target_crs.clone())?
        .with_precision(options.precision)
        .with_antimeridian_cutting(options.antimeridian_cutting);

    let mut stats = IngestStats::default();
    let mut features = Vec::new();

    for (index, item) in source.enumerate() {
        let raw = match item {
            Ok(raw) => raw,
            Err(err) => {
                error!("Feature {index}: {}", FeatureError::from(err));
                stats.errored += 1;
                continue;
            },
        };
        if filter.is_some_and(|filter| !filter.keep(&raw)) {
            stats.skipped += 1;
            continue;
        }

        let SourceFeature {
            id,
            geometry,
            properties,
        } = raw;
        match process_feature(geometry, &properties, transformer, &reprojector) {
            Ok((geometry, transformed)) => {
                let mut feature = IngestedFeature::new(geometry, transformed);
                feature.id = id;
                if options.merge_on.is_some() {
                    feature = feature.with_original_properties(properties);
                }
                features.push(feature);
            },
            Err(err) => {
                error!("Feature {index}: {err}: {}", JsonValue::Object(properties));
                stats.errored += 1;
            },
        }
    }

    stats.kept = features.len();
    if let Some(key) = &options.merge_on {
        features = merge_features(features, key);
        stats.merged = stats.kept - features.len();
    }

    let collection = build_collection(features);
    info!("{stats}");

    Ok(IngestOutput { collection, stats })
}

fn resolve_source_crs<S: FeatureSource>(source: &S, options: &IngestOptions) -> Result<Crs> {
    if let Some(crs) = &options.source_crs {
        return Ok(crs.clone());
    }
    match source.crs() {
        Some(declared) => Ok(Crs::parse(declared)?),
        None => {
            info!(
                "{} source declares no CRS; assuming {}",
                source.driver_name(),
                Crs::wgs84()
            );
            Ok(Crs::wgs84())
        },
    }
}

fn process_feature<T: PropertyTransformer + ?Sized>(
    geometry: Option<geojson::Geometry>,
    properties: &JsonObject,
    transformer: &T,
    reprojector: &Reprojector,
) -> std::result::Result<(Geometry<f64>, JsonObject), FeatureError> {
    let geometry = geometry.ok_or(FeatureError::EmptyGeometry)?;

    let geometry = to_geo(force_2d(geometry)?)?;
    let geometry = reprojector.transform(&geometry)?;
    let geometry = force_ccw(fix_geometry(geometry));

    let transformed = transformer.transform(properties)?;
    Ok((geometry, transformed))
}

fn build_collection(features: Vec<IngestedFeature>) -> FeatureCollection {
    let features: Vec<Feature> = features.into_iter().map(finish_feature).collect();
    let bbox = collection_bbox(
        features
            .iter()
            .filter_map(|feature| feature.bbox.as_deref())
            .filter_map(|bbox| <&[f64; 4]>::try_from(bbox).ok()),
    );

    FeatureCollection {
        bbox: bbox.map(Vec::from),
        features,
        foreign_members: None,
    }
}

fn finish_feature(feature: IngestedFeature) -> Feature {
    let IngestedFeature {
        id,
        geometry,
        mut properties,
        ..
    } = feature;

    properties.insert("acres".to_string(), JsonValue::from(area_acres(&geometry)));
    let id = properties.get("id").and_then(feature_id).or(id);

    Feature {
        bbox: feature_bbox(&geometry).map(Vec::from),
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&geometry))),
        id,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn feature_id(value: &JsonValue) -> Option<Id> {
    match value {
        JsonValue::Null => None,
        JsonValue::Number(number) => Some(Id::Number(number.clone())),
        JsonValue::String(text) => Some(Id::String(text.clone())),
        other => Some(Id::String(other.to_string())),
    }
}

/// Per-format options used when opening a source.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Options for the CSV driver
    pub csv: CsvSourceOptions,
}

impl SourceOptions {
    /// Set the CSV options.
    #[must_use]
    pub fn with_csv(mut self, csv: CsvSourceOptions) -> Self {
        self.csv = csv;
        self
    }
}

/// Resolves the driver for `path`: by name when given, otherwise from the
/// file extension.
///
/// # Errors
///
/// Returns a [`DriverError`] if the named driver does not exist or no
/// driver claims the extension.
pub fn resolve_driver(path: &Path, driver: Option<&str>) -> Result<Driver> {
    let driver = match driver {
        Some(name) => find_driver(name).ok_or_else(|| driver_not_found(name))?,
        None => guess_driver(path).ok_or_else(|| DriverError::Undetermined {
            path: path.to_path_buf(),
        })?,
    };
    debug!("Using driver {} for {}", driver.short_name, path.display());
    Ok(driver)
}

/// Opens a dataset as a boxed feature source.
///
/// # Errors
///
/// Returns an error if the driver cannot be resolved or cannot read, the
/// file does not exist, or the source cannot be opened.
pub fn open_source(
    path: impl AsRef<Path>,
    driver: Option<&str>,
    options: &SourceOptions,
) -> Result<Box<dyn FeatureSource + Send>> {
    let path = path.as_ref();
    let driver = resolve_driver(path, driver)?;

    if !driver.capabilities.read.is_supported() {
        return Err(DriverError::OperationNotSupported {
            driver: driver.short_name.to_string(),
            operation: "reading".to_string(),
        }
        .into());
    }
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let format_error = |source: SourceReadError| {
        GeoIngestError::from(FormatError::Source {
            format: driver.short_name.to_string(),
            source,
        })
    };

    let source: Box<dyn FeatureSource + Send> = match driver.short_name {
        "GeoJSON" => Box::new(GeoJsonSource::open(path).map_err(format_error)?),
        "GeoJSONSeq" => Box::new(GeoJsonSource::open_sequence(path).map_err(format_error)?),
        "CSV" => {
            let mut csv = options.csv.clone();
            let is_tsv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));
            if is_tsv && csv.delimiter == b',' {
                csv = csv.with_delimiter(b'\t');
            }
            Box::new(CsvSource::open(path, csv).map_err(format_error)?)
        },
        other => {
            return Err(DriverError::OperationNotSupported {
                driver: other.to_string(),
                operation: "reading".to_string(),
            }
            .into());
        },
    };
    info!("Opened {} ({})", path.display(), driver.short_name);
    Ok(source)
}

#[derive(Default)]
struct FieldStats {
    types: BTreeSet<&'static str>,
    non_null: usize,
}

/// Reads a dataset and summarises its contents.
///
/// # Errors
///
/// Returns an error if the dataset cannot be opened or its driver does not
/// support the info operation.
pub fn dataset_info(
    path: impl AsRef<Path>,
    driver: Option<&str>,
    options: &SourceOptions,
) -> Result<DatasetInfo> {
    let path = path.as_ref();
    let resolved = resolve_driver(path, driver)?;
    if !resolved.capabilities.info.is_supported() {
        return Err(DriverError::OperationNotSupported {
            driver: resolved.short_name.to_string(),
            operation: "info".to_string(),
        }
        .into());
    }

    let source = open_source(path, Some(resolved.short_name), options)?;
    let mut info = DatasetInfo {
        dataset: path.display().to_string(),
        driver: resolved.short_name.to_string(),
        driver_long_name: resolved.long_name.to_string(),
        crs: source.crs().map(str::to_string),
        ..DatasetInfo::default()
    };

    let mut field_order: Vec<String> = Vec::new();
    let mut fields: HashMap<String, FieldStats> = HashMap::new();
    let mut boxes = Vec::new();

    for item in source {
        let feature = match item {
            Ok(feature) => feature,
            Err(err) => {
                debug!("Unreadable record: {err}");
                info.unreadable_count += 1;
                continue;
            },
        };
        info.feature_count += 1;

        match &feature.geometry {
            Some(geometry) => {
                *info
                    .geometry_types
                    .entry(geometry_type_name(&geometry.value).to_string())
                    .or_default() += 1;
                if let Some(bbox) = Geometry::<f64>::try_from(geometry.clone())
                    .ok()
                    .and_then(|g| g.bounding_rect())
                {
                    boxes.push([bbox.min().x, bbox.min().y, bbox.max().x, bbox.max().y]);
                }
            },
            None => info.null_geometry_count += 1,
        }

        for (name, value) in &feature.properties {
            let stats = fields.entry(name.clone()).or_insert_with(|| {
                field_order.push(name.clone());
                FieldStats::default()
            });
            stats.types.insert(json_type_name(value));
            if !value.is_null() {
                stats.non_null += 1;
            }
        }
    }

    info.bbox = collection_bbox(&boxes);
    info.fields = field_order
        .into_iter()
        .filter_map(|name| {
            let stats = fields.remove(&name)?;
            Some(FieldInfo {
                data_type: stats.types.into_iter().collect::<Vec<_>>().join("|"),
                non_null: stats.non_null,
                name,
            })
        })
        .collect();

    Ok(info)
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => "integer",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
