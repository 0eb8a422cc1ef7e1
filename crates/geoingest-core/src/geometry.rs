//! Geometry normalisation: dimensionality, validity and winding order.
//!
//! Validity checks, the self-union repair and ring orientation are all
//! delegated to the `geo` crate.

use geo::orient::{Direction, Orient};
use geo::{BooleanOps, Validation};
use geo_types::{Geometry, MultiPolygon};
use geojson::{PolygonType, Position, Value};
use log::debug;

use crate::error::FeatureError;

/// Drops every ordinate beyond X/Y (Z, M) from a raw `GeoJSON` geometry.
///
/// The geometry's own `bbox` is discarded since it may be 3D.
///
/// # Errors
///
/// Returns [`FeatureError::EmptyGeometry`] when the geometry holds no
/// coordinates, and [`FeatureError::Geometry`] when a position has fewer
/// than two ordinates.
pub fn force_2d(geometry: geojson::Geometry) -> Result<geojson::Geometry, FeatureError> {
    let value = force_value_2d(geometry.value)?;
    if is_empty(&value) {
        return Err(FeatureError::EmptyGeometry);
    }
    Ok(geojson::Geometry::new(value))
}

fn force_value_2d(value: Value) -> Result<Value, FeatureError> {
    Ok(match value {
        Value::Point(position) => Value::Point(force_position_2d(position)?),
        Value::MultiPoint(points) => Value::MultiPoint(force_linestring_2d(points)?),
        Value::LineString(line) => Value::LineString(force_linestring_2d(line)?),
        Value::MultiLineString(lines) => Value::MultiLineString(
            lines
                .into_iter()
                .map(force_linestring_2d)
                .collect::<Result<_, _>>()?,
        ),
        Value::Polygon(rings) => Value::Polygon(force_polygon_2d(rings)?),
        Value::MultiPolygon(polygons) => Value::MultiPolygon(
            polygons
                .into_iter()
                .map(force_polygon_2d)
                .collect::<Result<_, _>>()?,
        ),
        Value::GeometryCollection(geometries) => Value::GeometryCollection(
            geometries
                .into_iter()
                .map(|g| force_value_2d(g.value).map(geojson::Geometry::new))
                .collect::<Result<_, _>>()?,
        ),
    })
}

fn force_polygon_2d(rings: PolygonType) -> Result<PolygonType, FeatureError> {
    rings.into_iter().map(force_linestring_2d).collect()
}

fn force_linestring_2d(line: Vec<Position>) -> Result<Vec<Position>, FeatureError> {
    line.into_iter().map(force_position_2d).collect()
}

fn force_position_2d(mut position: Position) -> Result<Position, FeatureError> {
    if position.len() < 2 {
        return Err(FeatureError::Geometry(format!(
            "position {position:?} has fewer than 2 ordinates"
        )));
    }
    position.truncate(2);
    Ok(position)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Point(_) => false,
        Value::MultiPoint(line) | Value::LineString(line) => line.is_empty(),
        Value::MultiLineString(lines) => lines.iter().all(Vec::is_empty),
        Value::Polygon(rings) => rings.first().is_none_or(Vec::is_empty),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .all(|rings| rings.first().is_none_or(Vec::is_empty)),
        Value::GeometryCollection(geometries) => geometries.iter().all(|g| is_empty(&g.value)),
    }
}

/// Converts a raw `GeoJSON` geometry into a `geo` geometry.
///
/// # Errors
///
/// Returns [`FeatureError::Geometry`] when the conversion fails.
pub fn to_geo(geometry: geojson::Geometry) -> Result<Geometry<f64>, FeatureError> {
    Geometry::<f64>::try_from(geometry)
        .map_err(|err| FeatureError::Geometry(format!("Failed to convert GeoJSON geometry: {err}")))
}

/// Repairs an invalid polygonal geometry.
///
/// Invalid polygons (self-intersections, bow-ties, overlapping members) are
/// rebuilt with a boolean self-union. The repair is only used when it yields
/// a non-empty polygonal result; otherwise, and for valid or non-polygonal
/// input, the geometry is returned unchanged.
#[must_use]
pub fn fix_geometry(geometry: Geometry<f64>) -> Geometry<f64> {
    let multi = match &geometry {
        Geometry::Polygon(polygon) if !polygon.is_valid() => {
            MultiPolygon::new(vec![polygon.clone()])
        },
        Geometry::MultiPolygon(multi) if !multi.is_valid() => multi.clone(),
        _ => return geometry,
    };

    let repaired = multi.union(&MultiPolygon::new(vec![]));
    match repaired.0.len() {
        0 => {
            debug!("Validity repair produced an empty geometry; keeping the original");
            geometry
        },
        1 => repaired.0.into_iter().next().map_or(geometry, Geometry::Polygon),
        _ => Geometry::MultiPolygon(repaired),
    }
}

/// Orients polygons so exterior rings run counter-clockwise and interior
/// rings clockwise. Other geometry types are returned unchanged.
#[must_use]
pub fn force_ccw(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::Polygon(polygon) => Geometry::Polygon(polygon.orient(Direction::Default)),
        Geometry::MultiPolygon(multi) => Geometry::MultiPolygon(multi.orient(Direction::Default)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Winding};
    use geo_types::{LineString, Polygon, polygon};

    fn raw(value: Value) -> geojson::Geometry {
        geojson::Geometry::new(value)
    }

    #[test]
    fn force_2d_point() {
        let geometry = force_2d(raw(Value::Point(vec![1.0, 2.0, 3.0, 4.0]))).unwrap();
        assert_eq!(geometry.value, Value::Point(vec![1.0, 2.0]));
    }

    #[test]
    fn force_2d_polygon_and_clears_bbox() {
        let mut input = raw(Value::Polygon(vec![vec![
            vec![0.0, 0.0, 5.0],
            vec![1.0, 0.0, 5.0],
            vec![1.0, 1.0, 5.0],
            vec![0.0, 0.0, 5.0],
        ]]));
        input.bbox = Some(vec![0.0, 0.0, 5.0, 1.0, 1.0, 5.0]);

        let geometry = force_2d(input).unwrap();
        assert!(geometry.bbox.is_none());
        let Value::Polygon(rings) = geometry.value else {
            panic!("expected polygon")
        };
        assert!(rings[0].iter().all(|p| p.len() == 2));
    }

    #[test]
    fn force_2d_multipolygon_and_collection() {
        let geometry = force_2d(raw(Value::GeometryCollection(vec![
            raw(Value::MultiPolygon(vec![vec![vec![
                vec![0.0, 0.0, 1.0],
                vec![1.0, 0.0, 1.0],
                vec![0.0, 1.0, 1.0],
                vec![0.0, 0.0, 1.0],
            ]]])),
            raw(Value::MultiLineString(vec![vec![
                vec![0.0, 0.0, 9.0],
                vec![2.0, 2.0, 9.0],
            ]])),
        ])))
        .unwrap();

        let Value::GeometryCollection(members) = geometry.value else {
            panic!("expected collection")
        };
        assert_eq!(
            members[1].value,
            Value::MultiLineString(vec![vec![vec![0.0, 0.0], vec![2.0, 2.0]]])
        );
    }

    #[test]
    fn force_2d_rejects_short_positions() {
        let err = force_2d(raw(Value::LineString(vec![vec![0.0, 0.0], vec![1.0]]))).unwrap_err();
        assert!(matches!(err, FeatureError::Geometry(_)));
    }

    #[test]
    fn force_2d_rejects_empty() {
        assert!(matches!(
            force_2d(raw(Value::Polygon(vec![]))).unwrap_err(),
            FeatureError::EmptyGeometry
        ));
        assert!(matches!(
            force_2d(raw(Value::MultiPoint(vec![]))).unwrap_err(),
            FeatureError::EmptyGeometry
        ));
    }

    #[test]
    fn to_geo_converts() {
        let geometry =
            to_geo(raw(Value::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]]))).unwrap();
        assert_eq!(
            geometry,
            Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]))
        );
    }

    #[test]
    fn fix_repairs_bow_tie() {
        let bow_tie: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(!bow_tie.is_valid());

        let input = Geometry::Polygon(bow_tie);
        assert!(input.unsigned_area().abs() < 1e-9);

        // both lobes survive the repair
        let fixed = fix_geometry(input.clone());
        assert_ne!(fixed, input);
        assert!((fixed.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fix_keeps_valid_geometry() {
        let square: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let fixed = fix_geometry(Geometry::Polygon(square.clone()));
        assert_eq!(fixed, Geometry::Polygon(square));
    }

    #[test]
    fn fix_ignores_lines() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (0.0, 0.0)]));
        assert_eq!(fix_geometry(line.clone()), line);
    }

    #[test]
    fn force_ccw_orients_rings() {
        let clockwise: Polygon<f64> = polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 0.0, y: 10.0),
                (x: 10.0, y: 10.0),
                (x: 10.0, y: 0.0),
            ],
            interiors: [
                [
                    (x: 2.0, y: 2.0),
                    (x: 4.0, y: 2.0),
                    (x: 4.0, y: 4.0),
                    (x: 2.0, y: 4.0),
                ],
            ],
        );
        assert!(clockwise.exterior().is_cw());

        let Geometry::Polygon(oriented) = force_ccw(Geometry::Polygon(clockwise)) else {
            panic!("expected polygon")
        };
        assert!(oriented.exterior().is_ccw());
        assert!(oriented.interiors()[0].is_cw());
    }

    #[test]
    fn force_ccw_multipolygon_members() {
        let cw: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
        ];
        let Geometry::MultiPolygon(oriented) =
            force_ccw(Geometry::MultiPolygon(MultiPolygon::new(vec![cw.clone(), cw])))
        else {
            panic!("expected multipolygon")
        };
        assert!(oriented.iter().all(|p| p.exterior().is_ccw()));
    }
}
