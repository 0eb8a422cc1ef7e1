use std::fmt;

use thiserror::Error;

/// A position within a source file, such as a CSV record or a GeoJSON sequence line.
///
/// All indices are 1-based where possible to align with human expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Logical record number reported by the parser
    pub record: Option<u64>,
    /// Feature index within a collection (0-based, as in the input array)
    pub feature: Option<u64>,
}

impl SourcePosition {
    /// Position of the `index`-th feature of a collection.
    #[must_use]
    pub fn feature(index: usize) -> Self {
        Self {
            feature: Some(index as u64),
            ..Self::default()
        }
    }

    /// Position of a 1-based line.
    #[must_use]
    pub fn line(line: u64) -> Self {
        Self {
            line: Some(line),
            ..Self::default()
        }
    }

    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.record.is_none() && self.feature.is_none()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(record) = self.record {
            parts.push(format!("record {record}"));
        }
        if let Some(feature) = self.feature {
            parts.push(format!("feature {feature}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

fn fmt_context(context: Option<&String>) -> String {
    context
        .map(|c| format!(" while reading {c}"))
        .unwrap_or_default()
}

fn fmt_position(position: Option<&SourcePosition>) -> String {
    position.map(|pos| format!(" at {pos}")).unwrap_or_default()
}

/// Errors raised while pulling features out of a source.
///
/// Sources report whole-file problems (unreadable file, unparsable document)
/// from their constructors, and per-record problems as items of the feature
/// stream so the ingest loop can count them and move on.
#[derive(Debug, Error)]
pub enum SourceReadError {
    /// An underlying I/O failure occurred.
    #[error("I/O error{}: {source}", fmt_context(.context.as_ref()))]
    Io {
        /// The originating error.
        #[source]
        source: std::io::Error,
        /// Optional context describing what was being read.
        context: Option<String>,
    },

    /// Parsing failed for the input source.
    #[error(
        "Parse error{}{}: {message}",
        fmt_context(.context.as_ref()),
        fmt_position(.position.as_ref())
    )]
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },

    /// A record was readable but its geometry could not be decoded.
    #[error("Invalid geometry{}: {message}", fmt_position(.position.as_ref()))]
    Geometry {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
    },
}

impl SourceReadError {
    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            SourceReadError::Io {
                context: existing, ..
            }
            | SourceReadError::Parse {
                context: existing, ..
            } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
            SourceReadError::Geometry { message, .. } => {
                message.push_str(" (");
                message.push_str(&context);
                message.push(')');
            },
        }
        self
    }
}

/// Result type alias that uses [`SourceReadError`].
pub type SourceResult<T> = Result<T, SourceReadError>;
