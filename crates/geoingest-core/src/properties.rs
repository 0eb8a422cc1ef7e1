//! Property transformation.
//!
//! A [`PropertyTransformer`] turns the attribute table of a source feature
//! into the output properties, and may reject the feature. [`PropertyMap`]
//! is the configurable implementation used by the CLI: a JSON object whose
//! keys are output property names and whose values are rules.
//!
//! ```json
//! {
//!   "name": "FIRE_NAME",
//!   "id": { "field": "OBJECTID", "required": true, "convert": "string" },
//!   "year": { "fields": ["YEAR_", "FIRE_YEAR"], "convert": "integer" },
//!   "agency": { "field": "AGENCY", "default": "unknown", "convert": "upper" },
//!   "source": { "value": "calfire" }
//! }
//! ```

use std::path::Path;

use geojson::{JsonObject, JsonValue};
use serde::Deserialize;

use crate::error::{ConfigError, GeoIngestError, IoErrorExt, PropertyMappingError};

/// Maps source properties to output properties for one feature.
pub trait PropertyTransformer {
    /// Produce the output properties.
    ///
    /// # Errors
    ///
    /// Returns a [`PropertyMappingError`] when the feature cannot be mapped;
    /// the feature is then dropped from the output.
    fn transform(&self, properties: &JsonObject) -> Result<JsonObject, PropertyMappingError>;
}

impl<F> PropertyTransformer for F
where
    F: Fn(&JsonObject) -> Result<JsonObject, PropertyMappingError>,
{
    fn transform(&self, properties: &JsonObject) -> Result<JsonObject, PropertyMappingError> {
        self(properties)
    }
}

/// Value conversions applied after a rule resolves its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conversion {
    /// Render as a JSON string.
    String,
    /// Parse into a JSON integer.
    Integer,
    /// Parse into a JSON float.
    Float,
    /// Upper-case a string.
    Upper,
    /// Lower-case a string.
    Lower,
    /// Trim surrounding whitespace from a string.
    Trim,
}

impl Conversion {
    fn name(self) -> &'static str {
        match self {
            Conversion::String => "string",
            Conversion::Integer => "integer",
            Conversion::Float => "float",
            Conversion::Upper => "upper",
            Conversion::Lower => "lower",
            Conversion::Trim => "trim",
        }
    }

    fn apply(self, value: JsonValue) -> Option<JsonValue> {
        match (self, value) {
            (Conversion::String, JsonValue::String(s)) => Some(JsonValue::String(s)),
            (Conversion::String, other) => Some(JsonValue::String(other.to_string())),
            (Conversion::Integer, JsonValue::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(JsonValue::from),
            (Conversion::Integer, JsonValue::String(s)) => {
                s.trim().parse::<i64>().ok().map(JsonValue::from)
            },
            (Conversion::Float, JsonValue::Number(n)) => n.as_f64().map(JsonValue::from),
            (Conversion::Float, JsonValue::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(JsonValue::from),
            (Conversion::Upper, JsonValue::String(s)) => Some(JsonValue::String(s.to_uppercase())),
            (Conversion::Lower, JsonValue::String(s)) => Some(JsonValue::String(s.to_lowercase())),
            (Conversion::Trim, JsonValue::String(s)) => {
                Some(JsonValue::String(s.trim().to_string()))
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    value: Option<JsonValue>,
    #[serde(default)]
    default: Option<JsonValue>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    convert: Option<Conversion>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Field(String),
    Spec(RuleSpec),
}

/// How one output property is produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRule {
    sources: Vec<String>,
    constant: Option<JsonValue>,
    default: Option<JsonValue>,
    required: bool,
    convert: Option<Conversion>,
}

impl PropertyRule {
    /// Copy a source field unchanged.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            sources: vec![name.into()],
            constant: None,
            default: None,
            required: false,
            convert: None,
        }
    }

    /// Always emit `value`.
    #[must_use]
    pub fn constant(value: JsonValue) -> Self {
        Self {
            sources: Vec::new(),
            constant: Some(value),
            default: None,
            required: false,
            convert: None,
        }
    }

    /// Fail the feature when no value resolves.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when no source field has a value.
    #[must_use]
    pub fn with_default(mut self, value: JsonValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Conversion applied to the resolved value.
    #[must_use]
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.convert = Some(conversion);
        self
    }

    fn resolve(
        &self,
        target: &str,
        properties: &JsonObject,
    ) -> Result<Option<JsonValue>, PropertyMappingError> {
        let found = self.constant.clone().or_else(|| {
            self.sources
                .iter()
                .filter_map(|source| properties.get(source))
                .find(|value| !value.is_null())
                .cloned()
        });

        let Some(value) = found.or_else(|| self.default.clone()) else {
            if self.required {
                return Err(PropertyMappingError::MissingRequired {
                    target: target.to_string(),
                });
            }
            return Ok(None);
        };

        match self.convert {
            None => Ok(Some(value)),
            Some(conversion) => {
                let rendered = value.to_string();
                conversion
                    .apply(value)
                    .map(Some)
                    .ok_or_else(|| PropertyMappingError::Conversion {
                        target: target.to_string(),
                        value: rendered,
                        conversion: conversion.name().to_string(),
                    })
            },
        }
    }
}

impl TryFrom<RawRule> for PropertyRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        match raw {
            RawRule::Field(name) => Ok(Self::field(name)),
            RawRule::Spec(spec) => {
                let mut sources = spec.fields;
                if let Some(field) = spec.field {
                    sources.insert(0, field);
                }
                if sources.is_empty() && spec.value.is_none() && spec.default.is_none() {
                    return Err(
                        "rule needs at least one of 'field', 'fields', 'value' or 'default'"
                            .to_string(),
                    );
                }
                if !sources.is_empty() && spec.value.is_some() {
                    return Err("'value' cannot be combined with 'field'/'fields'".to_string());
                }
                Ok(Self {
                    sources,
                    constant: spec.value,
                    default: spec.default,
                    required: spec.required,
                    convert: spec.convert,
                })
            },
        }
    }
}

/// Configurable mapping from source properties to output properties.
///
/// Only mapped keys appear in the output. A rule that resolves no value and
/// is not required leaves its key out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyMap {
    rules: Vec<(String, PropertyRule)>,
    passthrough: bool,
}

impl PropertyMap {
    /// A map that copies every source property unchanged.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            rules: Vec::new(),
            passthrough: true,
        }
    }

    /// An empty map; add rules with [`PropertyMap::with_rule`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the rule for output property `target`.
    #[must_use]
    pub fn with_rule(mut self, target: impl Into<String>, rule: PropertyRule) -> Self {
        let target = target.into();
        self.rules.retain(|(existing, _)| *existing != target);
        self.rules.push((target, rule));
        self
    }

    /// Number of configured rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parses a JSON property map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if the JSON is malformed or a
    /// rule is inconsistent.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidOption {
            option: "property-map".to_string(),
            message,
        };

        let raw: serde_json::Map<String, JsonValue> =
            serde_json::from_str(text).map_err(|err| invalid(err.to_string()))?;

        let mut map = Self::new();
        for (target, value) in raw {
            let rule: RawRule = serde_json::from_value(value)
                .map_err(|err| invalid(format!("rule '{target}': {err}")))?;
            let rule = PropertyRule::try_from(rule)
                .map_err(|message| invalid(format!("rule '{target}': {message}")))?;
            map = map.with_rule(target, rule);
        }
        Ok(map)
    }

    /// Reads a JSON property map from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if its contents are invalid.
    pub fn from_path(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_read_context("property map", path)?;
        Self::from_json_str(&text).map_err(GeoIngestError::from)
    }
}

impl PropertyTransformer for PropertyMap {
    fn transform(&self, properties: &JsonObject) -> Result<JsonObject, PropertyMappingError> {
        if self.passthrough {
            return Ok(properties.clone());
        }

        let mut output = JsonObject::new();
        for (target, rule) in &self.rules {
            if let Some(value) = rule.resolve(target, properties)? {
                output.insert(target.clone(), value);
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn passthrough_copies() {
        let input = props(json!({"a": 1, "b": "x"}));
        assert_eq!(PropertyMap::passthrough().transform(&input).unwrap(), input);
    }

    #[test]
    fn plain_field_rules() {
        let map =
            PropertyMap::from_json_str(r#"{"name": "FIRE_NAME", "missing": "NOPE"}"#).unwrap();
        let output = map
            .transform(&props(json!({"FIRE_NAME": "Camp", "OTHER": 3})))
            .unwrap();
        assert_eq!(output, props(json!({"name": "Camp"})));
    }

    #[test]
    fn fallback_fields_skip_nulls() {
        let map =
            PropertyMap::from_json_str(r#"{"year": {"fields": ["YEAR_", "FIRE_YEAR"]}}"#).unwrap();
        let output = map
            .transform(&props(json!({"YEAR_": null, "FIRE_YEAR": 2018})))
            .unwrap();
        assert_eq!(output.get("year"), Some(&json!(2018)));
    }

    #[test]
    fn required_missing_fails() {
        let map = PropertyMap::from_json_str(r#"{"id": {"field": "OBJECTID", "required": true}}"#)
            .unwrap();
        let err = map.transform(&props(json!({"OTHER": 1}))).unwrap_err();
        assert_eq!(
            err,
            PropertyMappingError::MissingRequired {
                target: "id".to_string()
            }
        );
    }

    #[test]
    fn constants_defaults_and_conversions() {
        let map = PropertyMap::from_json_str(
            r#"{
                "source": {"value": "calfire"},
                "agency": {"field": "AGENCY", "default": "unknown", "convert": "upper"},
                "acres_reported": {"field": "GIS_ACRES", "convert": "float"},
                "id": {"field": "OBJECTID", "convert": "string"},
                "count": {"field": "N", "convert": "integer"}
            }"#,
        )
        .unwrap();
        assert_eq!(map.len(), 5);

        let output = map
            .transform(&props(json!({"GIS_ACRES": "12.5", "OBJECTID": 7, "N": " 42 "})))
            .unwrap();
        assert_eq!(
            output,
            props(json!({
                "source": "calfire",
                "agency": "UNKNOWN",
                "acres_reported": 12.5,
                "id": "7",
                "count": 42
            }))
        );
    }

    #[test]
    fn failed_conversion_names_value() {
        let map = PropertyMap::new().with_rule(
            "count",
            PropertyRule::field("N").with_conversion(Conversion::Integer),
        );
        let err = map.transform(&props(json!({"N": "many"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Property mapping failed: cannot convert 'count' value \"many\" to integer"
        );
    }

    #[test]
    fn builder_rules_replace_existing_targets() {
        let map = PropertyMap::new()
            .with_rule("a", PropertyRule::field("x"))
            .with_rule("a", PropertyRule::constant(json!(1)).required())
            .with_rule("b", PropertyRule::field("y").with_default(json!(false)));
        assert_eq!(map.len(), 2);
        let output = map.transform(&JsonObject::new()).unwrap();
        assert_eq!(output, props(json!({"a": 1, "b": false})));
    }

    #[test]
    fn invalid_configurations() {
        assert!(PropertyMap::from_json_str("[1]").is_err());
        assert!(PropertyMap::from_json_str(r#"{"a": {"required": true}}"#).is_err());
        assert!(PropertyMap::from_json_str(r#"{"a": {"field": "x", "value": 1}}"#).is_err());
        assert!(
            PropertyMap::from_json_str(r#"{"a": {"field": "x", "convert": "roman"}}"#).is_err()
        );
        let err = PropertyMap::from_json_str(r#"{"a": 5}"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid property-map option: rule 'a'"));
    }

    #[test]
    fn closures_are_transformers() {
        let reject = |_: &JsonObject| -> Result<JsonObject, PropertyMappingError> {
            Err(PropertyMappingError::Custom("nope".to_string()))
        };
        assert_eq!(
            reject.transform(&JsonObject::new()).unwrap_err().to_string(),
            "Property mapping failed: nope"
        );
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        std::fs::write(&path, r#"{"name": "NAME"}"#).unwrap();
        assert_eq!(PropertyMap::from_path(&path).unwrap().len(), 1);

        let missing = PropertyMap::from_path(dir.path().join("nope.json")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read property map file"));
    }
}
