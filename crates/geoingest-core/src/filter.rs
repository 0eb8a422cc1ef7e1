//! Feature filters applied before any other processing.

use std::fmt;
use std::str::FromStr;

use geoingest_core_common::SourceFeature;
use serde_json::Value;

use crate::error::ConfigError;

/// Decides whether a source feature enters the pipeline.
///
/// Rejected features are counted as skipped, not as errors.
pub trait FeatureFilter {
    /// Returns `true` to keep `feature`.
    fn keep(&self, feature: &SourceFeature) -> bool;
}

impl<F> FeatureFilter for F
where
    F: Fn(&SourceFeature) -> bool,
{
    fn keep(&self, feature: &SourceFeature) -> bool {
        self(feature)
    }
}

/// Keeps (or drops) features by the value of one property.
///
/// Parsed from `key=v1,v2` (keep features whose `key` is one of the values)
/// or `key!=v1,v2` (keep features whose `key` is none of them). Property
/// values are compared by their text, so `YEAR=2018` matches both `2018`
/// and `"2018"`. A feature without the property only passes a `!=` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter {
    key: String,
    values: Vec<String>,
    negate: bool,
}

impl PropertyFilter {
    /// Keep features whose `key` equals one of `values`.
    #[must_use]
    pub fn one_of<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
            negate: false,
        }
    }

    /// Keep features whose `key` equals none of `values`.
    #[must_use]
    pub fn none_of<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            negate: true,
            ..Self::one_of(key, values)
        }
    }

    /// Parses a filter expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if the expression has no `=`,
    /// an empty key, or no values.
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidOption {
            option: "filter".to_string(),
            message: format!("'{expression}': {message}"),
        };

        let (key, values, negate) = match expression.split_once("!=") {
            Some((key, values)) => (key, values, true),
            None => match expression.split_once('=') {
                Some((key, values)) => (key, values, false),
                None => {
                    return Err(invalid(
                        "expected key=value[,value...] or key!=value[,value...]",
                    ));
                },
            },
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(invalid("missing property name"));
        }

        let values: Vec<String> = values
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return Err(invalid("missing values"));
        }

        Ok(Self {
            key: key.to_string(),
            values,
            negate,
        })
    }

    /// The property this filter inspects.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn matches(&self, value: &Value) -> bool {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.values.iter().any(|candidate| *candidate == text)
    }
}

impl FeatureFilter for PropertyFilter {
    fn keep(&self, feature: &SourceFeature) -> bool {
        let matched = feature
            .property(&self.key)
            .is_some_and(|value| self.matches(value));
        matched != self.negate
    }
}

impl FromStr for PropertyFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.negate { "!=" } else { "=" };
        write!(f, "{}{op}{}", self.key, self.values.join(","))
    }
}

/// Keeps a feature only if every filter keeps it.
#[derive(Debug, Clone, Default)]
pub struct AllOf(pub Vec<PropertyFilter>);

impl FeatureFilter for AllOf {
    fn keep(&self, feature: &SourceFeature) -> bool {
        self.0.iter().all(|filter| filter.keep(feature))
    }
}
