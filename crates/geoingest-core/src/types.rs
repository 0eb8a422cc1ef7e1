//! Data types shared by the ingest operations.

use std::collections::BTreeMap;
use std::fmt;

use geo_types::Geometry;
use geojson::JsonObject;
use geojson::feature::Id;

/// A feature that made it through the per-feature pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedFeature {
    /// Identifier carried by the source record.
    pub id: Option<Id>,
    /// 2D, WGS84, repaired and counter-clockwise geometry.
    pub geometry: Geometry<f64>,
    /// Output properties produced by the transformer.
    pub properties: JsonObject,
    /// Source properties, kept only while a merge is pending.
    pub original_properties: Option<JsonObject>,
}

impl IngestedFeature {
    /// Creates a feature without original properties.
    #[must_use]
    pub fn new(geometry: Geometry<f64>, properties: JsonObject) -> Self {
        Self {
            id: None,
            geometry,
            properties,
            original_properties: None,
        }
    }

    /// Keeps the source properties for a later merge.
    #[must_use]
    pub fn with_original_properties(mut self, properties: JsonObject) -> Self {
        self.original_properties = Some(properties);
        self
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Features rejected by the filter
    pub skipped: usize,
    /// Features that passed the pipeline, counted before merging
    pub kept: usize,
    /// Features absorbed by merging (`kept` minus the final count)
    pub merged: usize,
    /// Features dropped because of an error
    pub errored: usize,
}

impl IngestStats {
    /// Number of features in the output.
    #[must_use]
    pub fn output(&self) -> usize {
        self.kept - self.merged
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped {} features, kept {} features, merged {} features, errored {} features",
            self.skipped, self.kept, self.merged, self.errored
        )
    }
}

/// Summary of a dataset produced by [`crate::operations::dataset_info`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetInfo {
    /// Path to the dataset
    pub dataset: String,
    /// Driver name
    pub driver: String,
    /// Driver long name
    pub driver_long_name: String,
    /// CRS declared by the source
    pub crs: Option<String>,
    /// Features decoded successfully
    pub feature_count: usize,
    /// Records that failed to decode
    pub unreadable_count: usize,
    /// Features without geometry
    pub null_geometry_count: usize,
    /// Feature count per geometry type
    pub geometry_types: BTreeMap<String, usize>,
    /// Property fields in first-seen order
    pub fields: Vec<FieldInfo>,
    /// Extent of all coordinates in source units
    pub bbox: Option<[f64; 4]>,
}

/// A property field seen in a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// JSON type(s) seen for the field, e.g. `string` or `number|null`
    pub data_type: String,
    /// Number of features where the field is present and not null
    pub non_null: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_display_and_output() {
        let stats = IngestStats {
            skipped: 1,
            kept: 5,
            merged: 2,
            errored: 3,
        };
        assert_eq!(stats.output(), 3);
        assert_eq!(
            stats.to_string(),
            "skipped 1 features, kept 5 features, merged 2 features, errored 3 features"
        );
    }
}
