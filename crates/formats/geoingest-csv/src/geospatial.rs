//! Geometry decoding for CSV cells.
//!
//! Geometries arrive either as Well-Known Text in a single column or as a
//! pair of numeric longitude/latitude columns. Both are turned into raw
//! `GeoJSON` geometries so the ingest pipeline sees the same model it gets
//! from `GeoJSON` inputs.

use geojson::{Geometry, Value};
use geozero::ToJson;
use geozero::wkt::Wkt;

/// Decode a WKT cell.
///
/// Blank cells yield `Ok(None)`: the record simply has no geometry.
///
/// # Errors
///
/// Returns a description of the failure if the text is not valid WKT.
pub fn wkt_to_geometry(cell: &str) -> Result<Option<Geometry>, String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let json = Wkt(trimmed)
        .to_json()
        .map_err(|err| format!("Failed to decode WKT geometry: {err}"))?;
    serde_json::from_str::<Geometry>(&json)
        .map(Some)
        .map_err(|err| format!("Failed to decode WKT geometry: {err}"))
}

/// Build a point from longitude/latitude cells.
///
/// Both cells blank yields `Ok(None)`.
///
/// # Errors
///
/// Returns a description of the failure if only one cell is present or a
/// cell is not a finite number.
pub fn lonlat_to_geometry(lon: &str, lat: &str) -> Result<Option<Geometry>, String> {
    let (lon, lat) = (lon.trim(), lat.trim());
    match (lon.is_empty(), lat.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => {
            let x = parse_ordinate(lon, "longitude")?;
            let y = parse_ordinate(lat, "latitude")?;
            Ok(Some(Geometry::new(Value::Point(vec![x, y]))))
        },
        _ => Err("Only one of longitude/latitude is set".to_string()),
    }
}

fn parse_ordinate(cell: &str, name: &str) -> Result<f64, String> {
    cell.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("Invalid {name} value '{cell}'"))
}
