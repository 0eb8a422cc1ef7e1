//! Merging of features that share a key property.

use std::collections::HashMap;

use geo::BooleanOps;
use geo_types::{Geometry, GeometryCollection, MultiPolygon};
use log::debug;

use crate::geometry::force_ccw;
use crate::types::IngestedFeature;

/// Collapses features sharing the same value of `key` into one feature.
///
/// The key is looked up in each feature's original properties, falling back
/// to its output properties. Groups appear in the order their first member
/// appears; features without the key are kept on their own. A merged
/// feature takes its id and properties from the first member. Polygonal
/// members are unioned; any other mix becomes a `GeometryCollection`.
#[must_use]
pub fn merge_features(features: Vec<IngestedFeature>, key: &str) -> Vec<IngestedFeature> {
    let mut groups: Vec<Vec<IngestedFeature>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for feature in features {
        let group_key = feature
            .original_properties
            .as_ref()
            .unwrap_or(&feature.properties)
            .get(key)
            .filter(|value| !value.is_null())
            .map(ToString::to_string);

        match group_key {
            Some(group_key) => {
                if let Some(&position) = index.get(&group_key) {
                    groups[position].push(feature);
                } else {
                    index.insert(group_key, groups.len());
                    groups.push(vec![feature]);
                }
            },
            None => groups.push(vec![feature]),
        }
    }

    groups.into_iter().filter_map(collapse).collect()
}

fn collapse(group: Vec<IngestedFeature>) -> Option<IngestedFeature> {
    let mut members = group.into_iter();
    let mut first = members.next()?;
    let rest: Vec<IngestedFeature> = members.collect();
    if rest.is_empty() {
        return Some(first);
    }

    debug!("Merging {} features into one", rest.len() + 1);
    let geometries = std::iter::once(first.geometry.clone())
        .chain(rest.into_iter().map(|feature| feature.geometry))
        .collect::<Vec<_>>();
    first.geometry = merge_geometries(geometries);
    Some(first)
}

fn merge_geometries(geometries: Vec<Geometry<f64>>) -> Geometry<f64> {
    let polygonal = geometries
        .iter()
        .all(|g| matches!(g, Geometry::Polygon(_) | Geometry::MultiPolygon(_)));

    if !polygonal {
        let members = geometries
            .into_iter()
            .flat_map(|g| match g {
                Geometry::GeometryCollection(collection) => collection.0,
                other => vec![other],
            })
            .collect::<Vec<_>>();
        return Geometry::GeometryCollection(GeometryCollection::new_from(members));
    }

    let union = geometries
        .into_iter()
        .map(|g| match g {
            Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
            Geometry::MultiPolygon(multi) => multi,
            _ => MultiPolygon::new(vec![]),
        })
        .reduce(|acc, next| acc.union(&next))
        .unwrap_or_else(|| MultiPolygon::new(vec![]));

    let merged = if union.0.len() == 1 {
        union
            .0
            .into_iter()
            .next()
            .map_or_else(|| Geometry::MultiPolygon(MultiPolygon::new(vec![])), Geometry::Polygon)
    } else {
        Geometry::MultiPolygon(union)
    };
    force_ccw(merged)
}
