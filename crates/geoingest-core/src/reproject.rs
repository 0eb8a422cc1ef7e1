//! Coordinate reference systems and reprojection.
//!
//! CRS identifiers are resolved against the EPSG database shipped by
//! `crs-definitions`; the coordinate math is done by `proj4rs`. Geographic
//! targets additionally get antimeridian cutting, and every output
//! coordinate is rounded to a fixed number of decimals.

use std::fmt;

use geo::{BooleanOps, BoundingRect, MapCoords, Translate};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPolygon, Polygon, Rect,
    coord,
};
use log::debug;
use proj4rs::Proj;

use crate::error::ProjectionError;

/// EPSG code of WGS 84 longitude/latitude, the output convention.
pub const WGS84_EPSG: u16 = 4326;

/// A resolved coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crs {
    label: String,
    definition: String,
}

impl Crs {
    /// WGS 84 longitude/latitude.
    #[must_use]
    pub fn wgs84() -> Self {
        Self {
            label: format!("EPSG:{WGS84_EPSG}"),
            definition: "+proj=longlat +datum=WGS84 +no_defs".to_string(),
        }
    }

    /// Looks up an EPSG code.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownEpsgCode`] for codes not in the database.
    pub fn from_epsg(code: u16) -> Result<Self, ProjectionError> {
        if code == WGS84_EPSG {
            return Ok(Self::wgs84());
        }
        let definition =
            crs_definitions::from_code(code).ok_or(ProjectionError::UnknownEpsgCode { code })?;
        Ok(Self {
            label: format!("EPSG:{code}"),
            definition: definition.proj4.to_string(),
        })
    }

    /// Parses a CRS identifier.
    ///
    /// Accepted forms: `EPSG:<code>`, `urn:ogc:def:crs:EPSG::<code>`,
    /// `http://www.opengis.net/def/crs/EPSG/0/<code>`, the `CRS84` names
    /// (`CRS84`, `OGC:CRS84`, `urn:ogc:def:crs:OGC:1.3:CRS84`), `WGS84`, and
    /// raw proj4 definitions starting with `+`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnknownCrs`] for unrecognised text and
    /// [`ProjectionError::UnknownEpsgCode`] for unknown codes.
    pub fn parse(text: &str) -> Result<Self, ProjectionError> {
        let trimmed = text.trim();
        if trimmed.starts_with('+') {
            return Ok(Self {
                label: trimmed.to_string(),
                definition: trimmed.to_string(),
            });
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper == "WGS84" || upper == "CRS84" || upper.ends_with(":CRS84") {
            return Ok(Self::wgs84());
        }

        let unknown = || ProjectionError::UnknownCrs {
            crs: trimmed.to_string(),
        };
        if !upper.contains("EPSG") {
            return Err(unknown());
        }
        let code = upper
            .rsplit([':', '/'])
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(unknown)?;
        Self::from_epsg(code)
    }

    /// Human readable identifier (`EPSG:3857` or the proj4 string).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The proj4 definition.
    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Returns `true` for longitude/latitude systems.
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        self.definition.contains("+proj=longlat") || self.definition.contains("+proj=latlong")
    }

    fn to_proj(&self) -> Result<Proj, ProjectionError> {
        Proj::from_proj_string(&self.definition).map_err(|err| {
            ProjectionError::InvalidDefinition {
                crs: self.label.clone(),
                message: err.to_string(),
            }
        })
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Reprojects geometries from a source CRS to a target CRS.
pub struct Reprojector {
    source: Crs,
    target: Crs,
    projections: Option<(Proj, Proj)>,
    precision: Option<u32>,
    antimeridian_cutting: bool,
}

impl Reprojector {
    /// Builds a reprojector. Identical definitions skip the coordinate math.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::InvalidDefinition`] if either definition is
    /// rejected by `proj4rs`.
    pub fn new(source: Crs, target: Crs) -> Result<Self, ProjectionError> {
        let projections = if source.definition == target.definition {
            None
        } else {
            Some((source.to_proj()?, target.to_proj()?))
        };
        debug!(
            "Reprojector {source} -> {target} ({})",
            if projections.is_some() { "transform" } else { "identity" }
        );
        Ok(Self {
            source,
            target,
            projections,
            precision: None,
            antimeridian_cutting: false,
        })
    }

    /// Round output coordinates to `decimals` places.
    #[must_use]
    pub fn with_precision(mut self, decimals: Option<u32>) -> Self {
        self.precision = decimals;
        self
    }

    /// Split geometries crossing the ±180° meridian (geographic targets only).
    #[must_use]
    pub fn with_antimeridian_cutting(mut self, enabled: bool) -> Self {
        self.antimeridian_cutting = enabled;
        self
    }

    /// Reprojects, cuts and rounds a geometry.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Transform`] if any coordinate fails to
    /// transform or transforms to a non-finite value.
    pub fn transform(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, ProjectionError> {
        let mut geometry = if self.projections.is_some() {
            geometry.try_map_coords(|c| self.transform_coord(c))?
        } else {
            geometry.clone()
        };

        if self.antimeridian_cutting && self.target.is_geographic() {
            geometry = cut_antimeridian(geometry);
        }

        if let Some(decimals) = self.precision {
            let factor = 10f64.powi(decimals as i32);
            geometry = geometry.map_coords(|c| coord! {
                x: (c.x * factor).round() / factor,
                y: (c.y * factor).round() / factor,
            });
        }

        Ok(geometry)
    }

    fn transform_coord(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let Some((source, target)) = &self.projections else {
            return Ok(c);
        };

        let mut point = if self.source.is_geographic() {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };
        proj4rs::transform::transform(source, target, &mut point).map_err(|err| {
            ProjectionError::Transform {
                x: c.x,
                y: c.y,
                message: err.to_string(),
            }
        })?;

        let (x, y) = if self.target.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::Transform {
                x: c.x,
                y: c.y,
                message: "result is not finite".to_string(),
            });
        }
        Ok(coord! { x: x, y: y })
    }
}

/// Splits longitude/latitude geometries that cross the antimeridian.
///
/// Lines are broken where a segment jumps by more than 180° of longitude.
/// Polygons are unwrapped to continuous longitude and clipped into the parts
/// that fall within each 360° window, shifted back into [-180, 180].
#[must_use]
pub fn cut_antimeridian(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::LineString(line) => {
            let mut parts = split_linestring(&line);
            if parts.len() == 1 {
                Geometry::LineString(parts.remove(0))
            } else {
                Geometry::MultiLineString(MultiLineString::new(parts))
            }
        },
        Geometry::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
            lines.iter().flat_map(split_linestring).collect(),
        )),
        Geometry::Polygon(polygon) => cut_polygons(vec![polygon], false),
        Geometry::MultiPolygon(polygons) => cut_polygons(polygons.0, true),
        Geometry::GeometryCollection(collection) => Geometry::GeometryCollection(
            GeometryCollection::new_from(collection.0.into_iter().map(cut_antimeridian).collect()),
        ),
        other => other,
    }
}

fn split_linestring(line: &LineString<f64>) -> Vec<LineString<f64>> {
    let mut parts = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();

    for c in line.coords() {
        if let Some(prev) = current.last().copied() {
            let dx = c.x - prev.x;
            if dx.abs() > 180.0 {
                // crossing eastward when the raw delta is negative
                let (unwrapped_x, edge) = if dx < 0.0 {
                    (c.x + 360.0, 180.0)
                } else {
                    (c.x - 360.0, -180.0)
                };
                let t = (edge - prev.x) / (unwrapped_x - prev.x);
                let y = prev.y + t * (c.y - prev.y);
                current.push(coord! { x: edge, y: y });
                parts.push(LineString::new(std::mem::take(&mut current)));
                current.push(coord! { x: -edge, y: y });
            }
        }
        current.push(*c);
    }

    if !current.is_empty() {
        parts.push(LineString::new(current));
    }
    parts
}

fn unwrap_ring(ring: &LineString<f64>, reference_x: f64) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    let mut previous_x = reference_x;
    for c in ring.coords() {
        let mut x = c.x;
        while x - previous_x > 180.0 {
            x -= 360.0;
        }
        while previous_x - x > 180.0 {
            x += 360.0;
        }
        coords.push(coord! { x: x, y: c.y });
        previous_x = x;
    }
    LineString::new(coords)
}

fn cut_polygons(polygons: Vec<Polygon<f64>>, multi: bool) -> Geometry<f64> {
    let mut pieces: Vec<Polygon<f64>> = Vec::new();

    for polygon in polygons {
        let Some(first) = polygon.exterior().0.first().copied() else {
            continue;
        };
        let exterior = unwrap_ring(polygon.exterior(), first.x);
        let closes = match (exterior.0.first(), exterior.0.last()) {
            (Some(a), Some(b)) => (a.x - b.x).abs() < 1e-9,
            _ => true,
        };
        if !closes {
            debug!("Polygon ring encircles a pole; leaving it uncut");
            pieces.push(polygon);
            continue;
        }

        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| unwrap_ring(ring, first.x))
            .collect();
        let unwrapped = Polygon::new(exterior, interiors);

        let Some(bounds) = unwrapped.bounding_rect() else {
            continue;
        };
        if bounds.min().x >= -180.0 && bounds.max().x <= 180.0 {
            pieces.push(unwrapped);
            continue;
        }

        for window in [-1.0_f64, 0.0, 1.0] {
            let offset = window * 360.0;
            let clip = Rect::new(
                coord! { x: -180.0 + offset, y: -90.0 },
                coord! { x: 180.0 + offset, y: 90.0 },
            )
            .to_polygon();
            let part = unwrapped.intersection(&clip);
            pieces.extend(part.translate(-offset, 0.0));
        }
    }

    if !multi && pieces.len() == 1 {
        Geometry::Polygon(pieces.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(pieces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use geo_types::{line_string, point, polygon};

    #[test]
    fn parse_epsg_forms() {
        assert_eq!(Crs::parse("EPSG:3857").unwrap().label(), "EPSG:3857");
        assert_eq!(Crs::parse("epsg:3857").unwrap().label(), "EPSG:3857");
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::2263").unwrap().label(),
            "EPSG:2263"
        );
        assert_eq!(
            Crs::parse("http://www.opengis.net/def/crs/EPSG/0/32633")
                .unwrap()
                .label(),
            "EPSG:32633"
        );
    }

    #[test]
    fn parse_wgs84_aliases() {
        for text in ["urn:ogc:def:crs:OGC:1.3:CRS84", "CRS84", "OGC:CRS84", "WGS84", "EPSG:4326"] {
            let crs = Crs::parse(text).unwrap();
            assert_eq!(crs, Crs::wgs84(), "{text}");
            assert!(crs.is_geographic());
        }
    }

    #[test]
    fn parse_proj_string() {
        let crs = Crs::parse(" +proj=merc +datum=WGS84 +units=m +no_defs ").unwrap();
        assert!(!crs.is_geographic());
        assert_eq!(crs.definition(), "+proj=merc +datum=WGS84 +units=m +no_defs");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Crs::parse("not a crs").unwrap_err(),
            ProjectionError::UnknownCrs { .. }
        ));
        assert!(matches!(
            Crs::parse("EPSG:abc").unwrap_err(),
            ProjectionError::UnknownCrs { .. }
        ));
        assert!(matches!(
            Crs::parse("EPSG:1").unwrap_err(),
            ProjectionError::UnknownEpsgCode { code: 1 }
        ));
    }

    #[test]
    fn web_mercator_to_wgs84() {
        let reprojector = Reprojector::new(Crs::parse("EPSG:3857").unwrap(), Crs::wgs84())
            .unwrap()
            .with_precision(Some(6));
        let input = Geometry::Point(point!(x: 1_113_194.907_932_735_7, y: 1_118_889.974_857_959_3));

        let Geometry::Point(output) = reprojector.transform(&input).unwrap() else {
            panic!("expected point")
        };
        assert!((output.x() - 10.0).abs() < 1e-5, "{output:?}");
        assert!((output.y() - 10.0).abs() < 1e-5, "{output:?}");
    }

    #[test]
    fn wgs84_to_web_mercator() {
        let reprojector =
            Reprojector::new(Crs::wgs84(), Crs::parse("EPSG:3857").unwrap()).unwrap();
        let Geometry::Point(output) = reprojector
            .transform(&Geometry::Point(point!(x: 180.0, y: 0.0)))
            .unwrap()
        else {
            panic!("expected point")
        };
        assert!((output.x() - 20_037_508.342_789_244).abs() < 1e-3, "{output:?}");
        assert!(output.y().abs() < 1e-6);
    }

    #[test]
    fn identity_only_rounds() {
        let reprojector = Reprojector::new(Crs::wgs84(), Crs::wgs84())
            .unwrap()
            .with_precision(Some(6));
        let input = Geometry::Point(point!(x: 1.123_456_789, y: -2.987_654_321));
        assert_eq!(
            reprojector.transform(&input).unwrap(),
            Geometry::Point(point!(x: 1.123_457, y: -2.987_654))
        );
    }

    #[test]
    fn split_line_across_antimeridian() {
        let line = line_string![(x: 170.0, y: 0.0), (x: -170.0, y: 10.0)];
        let Geometry::MultiLineString(parts) = cut_antimeridian(Geometry::LineString(line)) else {
            panic!("expected multilinestring")
        };
        assert_eq!(parts.0.len(), 2);
        assert_eq!(
            parts.0[0],
            line_string![(x: 170.0, y: 0.0), (x: 180.0, y: 5.0)]
        );
        assert_eq!(
            parts.0[1],
            line_string![(x: -180.0, y: 5.0), (x: -170.0, y: 10.0)]
        );
    }

    #[test]
    fn split_line_westward() {
        let line = line_string![(x: -175.0, y: 0.0), (x: 175.0, y: 0.0), (x: 170.0, y: 0.0)];
        let Geometry::MultiLineString(parts) = cut_antimeridian(Geometry::LineString(line)) else {
            panic!("expected multilinestring")
        };
        assert_eq!(parts.0[0].0.last().unwrap().x, -180.0);
        assert_eq!(parts.0[1].0.first().unwrap().x, 180.0);
        assert_eq!(parts.0[1].0.len(), 3);
    }

    #[test]
    fn line_not_crossing_is_untouched() {
        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)]);
        assert_eq!(cut_antimeridian(line.clone()), line);
    }

    #[test]
    fn cut_polygon_across_antimeridian() {
        let polygon = polygon![
            (x: 170.0, y: -10.0),
            (x: -170.0, y: -10.0),
            (x: -170.0, y: 10.0),
            (x: 170.0, y: 10.0),
        ];

        let Geometry::MultiPolygon(parts) = cut_antimeridian(Geometry::Polygon(polygon)) else {
            panic!("expected multipolygon")
        };
        assert_eq!(parts.0.len(), 2);
        for part in &parts.0 {
            let bounds = part.bounding_rect().unwrap();
            assert!(bounds.min().x >= -180.0 && bounds.max().x <= 180.0);
            assert!((part.unsigned_area() - 200.0).abs() < 1e-6);
        }
    }

    #[test]
    fn polygon_inside_range_is_untouched() {
        let polygon = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]);
        assert_eq!(cut_antimeridian(polygon.clone()), polygon);
    }

    #[test]
    fn single_part_multipolygon_keeps_its_type() {
        let multi = Geometry::MultiPolygon(MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]));
        assert_eq!(cut_antimeridian(multi.clone()), multi);

        let reprojector = Reprojector::new(Crs::wgs84(), Crs::wgs84())
            .unwrap()
            .with_antimeridian_cutting(true);
        assert!(matches!(
            reprojector.transform(&multi).unwrap(),
            Geometry::MultiPolygon(parts) if parts.0.len() == 1
        ));
    }

    #[test]
    fn transform_applies_cutting_for_geographic_targets() {
        let reprojector = Reprojector::new(Crs::wgs84(), Crs::wgs84())
            .unwrap()
            .with_antimeridian_cutting(true);
        let line = Geometry::LineString(line_string![(x: 179.0, y: 0.0), (x: -179.0, y: 0.0)]);
        assert!(matches!(
            reprojector.transform(&line).unwrap(),
            Geometry::MultiLineString(_)
        ));

        let uncut = Reprojector::new(Crs::wgs84(), Crs::wgs84()).unwrap();
        assert_eq!(uncut.transform(&line).unwrap(), line);
    }
}
