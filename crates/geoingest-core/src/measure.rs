//! Area and extent measures attached to ingested features.

use geo::{BoundingRect, GeodesicArea};
use geo_types::{Geometry, Rect};

/// Square metres in one international acre.
pub const ACRE_SQ_METERS: f64 = 4_046.856_422_4;

/// Geodesic area of a WGS84 geometry in acres.
///
/// Points and lines have no area and yield `0.0`.
#[must_use]
pub fn area_acres(geometry: &Geometry<f64>) -> f64 {
    geometry.geodesic_area_unsigned() / ACRE_SQ_METERS
}

/// Bounding box as `[min_x, min_y, max_x, max_y]`, or `None` for an empty
/// geometry.
#[must_use]
pub fn feature_bbox(geometry: &Geometry<f64>) -> Option<[f64; 4]> {
    geometry.bounding_rect().map(rect_to_bbox)
}

/// Union of all feature boxes, or `None` when no feature has one.
#[must_use]
pub fn collection_bbox<'a, I>(boxes: I) -> Option<[f64; 4]>
where
    I: IntoIterator<Item = &'a [f64; 4]>,
{
    boxes.into_iter().fold(None, |acc, bbox| {
        Some(match acc {
            None => *bbox,
            Some([min_x, min_y, max_x, max_y]) => [
                min_x.min(bbox[0]),
                min_y.min(bbox[1]),
                max_x.max(bbox[2]),
                max_y.max(bbox[3]),
            ],
        })
    })
}

fn rect_to_bbox(rect: Rect<f64>) -> [f64; 4] {
    [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
}
