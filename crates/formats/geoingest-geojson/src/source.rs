//! [`FeatureSource`] implementations for `GeoJSON` files and sequences.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use geoingest_core_common::{FeatureSource, SourceFeature, SourceReadError, SourceResult};
use log::debug;

use crate::parser::{SequenceLines, parse_document};

enum Features {
    Collection(std::vec::IntoIter<SourceResult<SourceFeature>>),
    Sequence(SequenceLines<Box<dyn BufRead + Send>>),
}

/// Features read from a `GeoJSON` document or a newline-delimited sequence.
pub struct GeoJsonSource {
    crs: Option<String>,
    driver: &'static str,
    features: Features,
}

impl GeoJsonSource {
    /// Reads a `GeoJSON` document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a `GeoJSON` document.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SourceReadError::Io {
            source,
            context: Some(path.display().to_string()),
        })?;
        Self::from_bytes(&bytes, path.display().to_string())
    }

    /// Parses an in-memory `GeoJSON` document.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a `GeoJSON` document.
    pub fn from_bytes(bytes: &[u8], context: impl Into<String>) -> SourceResult<Self> {
        let document = parse_document(bytes, context)?;
        debug!(
            "Parsed GeoJSON document with {} feature(s), crs={:?}",
            document.features.len(),
            document.crs
        );
        Ok(Self {
            crs: document.crs,
            driver: "GeoJSON",
            features: Features::Collection(document.features.into_iter()),
        })
    }

    /// Streams a newline-delimited `GeoJSON` sequence from disk.
    ///
    /// Sequences carry no CRS member; RFC 8142 mandates WGS84 longitude/latitude.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open_sequence(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceReadError::Io {
            source,
            context: Some(path.display().to_string()),
        })?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }

    /// Streams a newline-delimited `GeoJSON` sequence from any buffered reader.
    pub fn from_reader(reader: impl BufRead + Send + 'static, context: impl Into<String>) -> Self {
        Self {
            crs: None,
            driver: "GeoJSONSeq",
            features: Features::Sequence(SequenceLines::new(Box::new(reader), context)),
        }
    }

    /// Overrides the CRS declared by the document.
    #[must_use]
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }
}

impl Iterator for GeoJsonSource {
    type Item = SourceResult<SourceFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.features {
            Features::Collection(features) => features.next(),
            Features::Sequence(lines) => lines.next(),
        }
    }
}

impl FeatureSource for GeoJsonSource {
    fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    fn driver_name(&self) -> &'static str {
        self.driver
    }
}
