//! `GeoJSON` parsing helpers shared by the collection and sequence sources.

use std::io::BufRead;

use geoingest_core_common::{SourceFeature, SourcePosition, SourceReadError, SourceResult};
use geojson::{Feature, Geometry, JsonObject, JsonValue};

/// A fully parsed `GeoJSON` document.
#[derive(Debug)]
pub struct ParsedDocument {
    /// CRS named by the legacy top-level `crs` member, if present.
    pub crs: Option<String>,
    /// One entry per feature; malformed features are kept as errors.
    pub features: Vec<SourceResult<SourceFeature>>,
}

/// Parse a `GeoJSON` document (`FeatureCollection`, `Feature` or bare geometry).
///
/// The document must be valid JSON with a recognised top-level `type`.
/// Individual features that fail to decode do not fail the document; they
/// are returned as error entries at their position in the collection.
pub fn parse_document(bytes: &[u8], context: impl Into<String>) -> SourceResult<ParsedDocument> {
    let context = context.into();
    let value: JsonValue =
        serde_json::from_slice(bytes).map_err(|err| SourceReadError::Parse {
            message: format!("Failed to parse GeoJSON document: {err}"),
            position: Some(SourcePosition::line(err.line() as u64)),
            context: Some(context.clone()),
        })?;

    let JsonValue::Object(mut object) = value else {
        return Err(SourceReadError::Parse {
            message: format!("Expected a JSON object, found {}", describe_value(&value)),
            position: None,
            context: Some(context),
        });
    };

    let crs = object.get("crs").and_then(crs_from_member);
    let kind = object
        .get("type")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();

    let features = match kind.as_str() {
        "FeatureCollection" => {
            let Some(JsonValue::Array(features)) = object.remove("features") else {
                return Err(SourceReadError::Parse {
                    message: "FeatureCollection has no 'features' array".to_string(),
                    position: None,
                    context: Some(context),
                });
            };
            features
                .into_iter()
                .enumerate()
                .map(|(index, feature)| {
                    decode_feature(feature).map_err(|message| SourceReadError::Geometry {
                        message,
                        position: Some(SourcePosition::feature(index)),
                    })
                })
                .collect()
        },
        "Feature" => vec![decode_feature(JsonValue::Object(object)).map_err(|message| {
            SourceReadError::Geometry {
                message,
                position: Some(SourcePosition::feature(0)),
            }
        })],
        "" => {
            return Err(SourceReadError::Parse {
                message: "GeoJSON object has no 'type' member".to_string(),
                position: None,
                context: Some(context),
            });
        },
        _ => {
            let geometry = Geometry::from_json_object(object).map_err(|err| {
                SourceReadError::Parse {
                    message: format!("Failed to convert GeoJSON geometry: {err}"),
                    position: None,
                    context: Some(context.clone()),
                }
            })?;
            vec![Ok(SourceFeature::new(Some(geometry), JsonObject::new()))]
        },
    };

    Ok(ParsedDocument { crs, features })
}

fn decode_feature(value: JsonValue) -> Result<SourceFeature, String> {
    Feature::from_json_value(value)
        .map(SourceFeature::from)
        .map_err(|err| format!("Failed to decode GeoJSON feature: {err}"))
}

/// Extracts a CRS identifier from a legacy `crs` member.
///
/// Handles the named form (`{"type": "name", "properties": {"name": ...}}`)
/// and the 2008 EPSG form (`{"type": "EPSG", "properties": {"code": ...}}`).
pub fn crs_from_member(member: &JsonValue) -> Option<String> {
    let properties = member.get("properties")?;
    match member.get("type")?.as_str()? {
        "name" => properties
            .get("name")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        kind if kind.eq_ignore_ascii_case("epsg") => {
            let code = properties.get("code")?;
            code.as_u64()
                .map(|code| code.to_string())
                .or_else(|| code.as_str().map(str::to_string))
                .map(|code| format!("EPSG:{code}"))
        },
        _ => None,
    }
}

/// Lazily decodes a newline-delimited `GeoJSON` sequence.
///
/// Each non-empty line holds one `Feature`, `FeatureCollection` or geometry;
/// an optional RFC 8142 record separator (`0x1E`) prefix is ignored. Lines
/// that fail to decode are yielded as errors carrying their line number.
pub struct SequenceLines<R> {
    reader: R,
    line_number: u64,
    pending: std::vec::IntoIter<SourceResult<SourceFeature>>,
    context: String,
    done: bool,
}

impl<R: BufRead> SequenceLines<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R, context: impl Into<String>) -> Self {
        Self {
            reader,
            line_number: 0,
            pending: Vec::new().into_iter(),
            context: context.into(),
            done: false,
        }
    }

    fn decode_line(&self, line: &str) -> Vec<SourceResult<SourceFeature>> {
        let position = SourcePosition::line(self.line_number);
        match parse_document(line.as_bytes(), self.context.clone()) {
            Ok(document) => document
                .features
                .into_iter()
                .map(|feature| {
                    feature.map_err(|err| match err {
                        SourceReadError::Geometry { message, .. } => SourceReadError::Geometry {
                            message,
                            position: Some(position.clone()),
                        },
                        other => other,
                    })
                })
                .collect(),
            Err(err) => vec![Err(SourceReadError::Parse {
                message: format!("Failed to parse GeoJSON feature: {err}"),
                position: Some(position),
                context: Some(self.context.clone()),
            })],
        }
    }
}

impl<R: BufRead> Iterator for SequenceLines<R> {
    type Item = SourceResult<SourceFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.next() {
                return Some(item);
            }
            if self.done {
                return None;
            }

            let mut raw = Vec::new();
            match self.reader.read_until(b'\n', &mut raw) {
                Ok(0) => {
                    self.done = true;
                    return None;
                },
                Ok(_) => self.line_number += 1,
                Err(source) => {
                    self.done = true;
                    return Some(Err(SourceReadError::Io {
                        source,
                        context: Some(self.context.clone()),
                    }));
                },
            }

            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line.trim_matches(|c: char| c.is_whitespace() || c == '\u{1e}'),
                Err(err) => {
                    return Some(Err(SourceReadError::Parse {
                        message: format!("GeoJSON line is not valid UTF-8: {err}"),
                        position: Some(SourcePosition::line(self.line_number)),
                        context: Some(self.context.clone()),
                    }));
                },
            };

            if line.is_empty() {
                continue;
            }

            self.pending = self.decode_line(line).into_iter();
        }
    }
}

/// Helper to describe JSON value kinds for error messages.
pub(crate) fn describe_value(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;
    use serde_json::json;

    #[test]
    fn parse_feature_collection_with_crs() {
        let data = br#"{
  "type": "FeatureCollection",
  "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
  "features": [
    {"type":"Feature","geometry":{"type":"Point","coordinates":[1.0,2.0,3.0]},"properties":{"name":"A"}},
    {"type":"Feature","geometry":null,"properties":{"value":42}}
  ]
}"#;

        let document = parse_document(data, "test").expect("parse");
        assert_eq!(document.crs.as_deref(), Some("urn:ogc:def:crs:EPSG::3857"));
        assert_eq!(document.features.len(), 2);

        let first = document.features[0].as_ref().unwrap();
        assert_eq!(
            first.geometry.as_ref().unwrap().value,
            Value::Point(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(first.properties.get("name").unwrap(), "A");

        let second = document.features[1].as_ref().unwrap();
        assert!(second.geometry.is_none());
        assert_eq!(second.properties.get("value").unwrap(), 42);
    }

    #[test]
    fn malformed_feature_is_isolated() {
        let data = br#"{"type":"FeatureCollection","features":[
    {"type":"Feature","geometry":{"type":"Point","coordinates":"oops"},"properties":{}},
    {"type":"Feature","geometry":{"type":"Point","coordinates":[3,4]},"properties":{"id":2}}
]}"#;

        let document = parse_document(data, "test").expect("parse");
        assert_eq!(document.features.len(), 2);
        match &document.features[0] {
            Err(SourceReadError::Geometry { position, .. }) => {
                assert_eq!(position.as_ref().unwrap().feature, Some(0));
            },
            other => panic!("expected geometry error, got {other:?}"),
        }
        assert!(document.features[1].is_ok());
    }

    #[test]
    fn parse_single_feature_without_properties() {
        let data = br#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]}}"#;

        let document = parse_document(data, "test").expect("parse");
        assert!(document.crs.is_none());
        assert_eq!(document.features.len(), 1);
        assert!(document.features[0].as_ref().unwrap().properties.is_empty());
    }

    #[test]
    fn parse_single_geometry() {
        let data = br#"{"type":"LineString","coordinates":[[7.0,8.0],[9.0,10.0]]}"#;

        let document = parse_document(data, "test").expect("parse");
        assert_eq!(document.features.len(), 1);
        let feature = document.features[0].as_ref().unwrap();
        assert!(matches!(
            feature.geometry.as_ref().unwrap().value,
            Value::LineString(_)
        ));
    }

    #[test]
    fn parse_rejects_non_object() {
        let err = parse_document(b"[1, 2]", "array").unwrap_err();
        assert!(err.to_string().contains("Expected a JSON object, found array"));
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = parse_document(b"not valid json", "invalid").unwrap_err();
        match err {
            SourceReadError::Parse {
                message, context, ..
            } => {
                assert!(message.contains("Failed to parse GeoJSON document"));
                assert_eq!(context.as_deref(), Some("invalid"));
            },
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn crs_member_forms() {
        assert_eq!(
            crs_from_member(&json!({"type": "EPSG", "properties": {"code": 2263}})),
            Some("EPSG:2263".to_string())
        );
        assert_eq!(
            crs_from_member(&json!({"type": "name", "properties": {"name": "EPSG:4269"}})),
            Some("EPSG:4269".to_string())
        );
        assert_eq!(
            crs_from_member(&json!({"type": "link", "properties": {"href": "x"}})),
            None
        );
    }

    #[test]
    fn sequence_with_empty_lines_and_record_separators() {
        let data = "\u{1e}{\"type\":\"Feature\",\"geometry\":{\"type\":\"Point\",\"coordinates\":[0,0]},\"properties\":{\"id\":1}}\n\n{\"type\":\"Feature\",\"geometry\":{\"type\":\"Point\",\"coordinates\":[1,1]},\"properties\":{\"id\":2}}\n";

        let features: Vec<_> = SequenceLines::new(data.as_bytes(), "seq").collect();
        assert_eq!(features.len(), 2);
        assert!(features.iter().all(Result::is_ok));
    }

    #[test]
    fn sequence_bad_line_does_not_stop_stream() {
        let data = br#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{"id":1}}
not valid json
{"type":"Feature","geometry":{"type":"Point","coordinates":[2,2]},"properties":{"id":3}}"#;

        let features: Vec<_> = SequenceLines::new(&data[..], "seq").collect();
        assert_eq!(features.len(), 3);
        match &features[1] {
            Err(SourceReadError::Parse { position, .. }) => {
                assert_eq!(position.as_ref().unwrap().line, Some(2));
            },
            other => panic!("Expected Parse error, got {other:?}"),
        }
        assert!(features[2].is_ok());
    }

    #[test]
    fn sequence_flattens_collections() {
        let data = br#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{}},{"type":"Feature","geometry":null,"properties":{}}]}"#;

        let features: Vec<_> = SequenceLines::new(&data[..], "seq").collect();
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn sequence_invalid_utf8() {
        let mut data = Vec::from(&b"{"[..]);
        data.push(0xFF);
        data.extend_from_slice(b"}\n");

        let features: Vec<_> = SequenceLines::new(&data[..], "bad_utf8").collect();
        assert_eq!(features.len(), 1);
        assert!(
            features[0]
                .as_ref()
                .unwrap_err()
                .to_string()
                .contains("not valid UTF-8")
        );
    }

    #[test]
    fn describe_value_kinds() {
        assert_eq!(describe_value(&JsonValue::Null), "null");
        assert_eq!(describe_value(&json!(42)), "number");
        assert_eq!(describe_value(&json!({})), "object");
    }
}
