//! The feature source abstraction every input format implements.

use std::fmt;

use geojson::{Geometry, JsonObject, feature::Id};

use crate::error::SourceResult;

/// One raw feature as read from a source.
///
/// The geometry is kept in its `GeoJSON` form so that extra ordinates
/// (Z, M) survive until the ingest pipeline explicitly drops them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFeature {
    /// Identifier carried by the source record, if any.
    pub id: Option<Id>,
    /// Raw geometry; `None` for features without geometry.
    pub geometry: Option<Geometry>,
    /// Attribute table of the record.
    pub properties: JsonObject,
}

impl SourceFeature {
    /// Creates a feature from a geometry and its properties.
    #[must_use]
    pub fn new(geometry: Option<Geometry>, properties: JsonObject) -> Self {
        Self {
            id: None,
            geometry,
            properties,
        }
    }

    /// Returns the property `key`, treating JSON `null` as missing.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key).filter(|value| !value.is_null())
    }
}

impl From<geojson::Feature> for SourceFeature {
    fn from(feature: geojson::Feature) -> Self {
        Self {
            id: feature.id,
            geometry: feature.geometry,
            properties: feature.properties.unwrap_or_default(),
        }
    }
}

impl fmt::Display for SourceFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geometry = self
            .geometry
            .as_ref()
            .map_or("None", |g| geometry_type_name(&g.value));
        write!(
            f,
            "SourceFeature(geometry={geometry}, properties={})",
            serde_json::Value::Object(self.properties.clone())
        )
    }
}

/// Returns the `GeoJSON` type name of a geometry value.
#[must_use]
pub fn geometry_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// A stream of features together with the coordinate reference system the
/// source declares for them.
///
/// Sources yield one item per record. Records that cannot be decoded are
/// yielded as errors so callers can skip them without losing the rest of
/// the stream.
pub trait FeatureSource: Iterator<Item = SourceResult<SourceFeature>> {
    /// CRS identifier declared by the source (`EPSG:3857`, an OGC URN, or a
    /// `+proj=` definition). `None` means the source does not say.
    fn crs(&self) -> Option<&str>;

    /// Short name of the driver that produced this source.
    fn driver_name(&self) -> &'static str;
}

impl<S: FeatureSource + ?Sized> FeatureSource for Box<S> {
    fn crs(&self) -> Option<&str> {
        (**self).crs()
    }

    fn driver_name(&self) -> &'static str {
        (**self).driver_name()
    }
}
