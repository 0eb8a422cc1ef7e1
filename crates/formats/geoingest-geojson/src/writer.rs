//! Serialisation of the ingested `FeatureCollection`.

use std::io::Write;

use geojson::FeatureCollection;

/// Options for writing a `FeatureCollection`.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonWriterOptions {
    /// Indent the output for humans instead of writing it on one line.
    pub pretty: bool,
}

impl GeoJsonWriterOptions {
    /// Enable or disable pretty printing.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Write `collection` as `GeoJSON` to `writer`.
///
/// # Errors
///
/// Returns an error if serialisation or the underlying write fails.
pub fn write_feature_collection<W: Write>(
    writer: &mut W,
    collection: &FeatureCollection,
    options: &GeoJsonWriterOptions,
) -> std::io::Result<()> {
    if options.pretty {
        serde_json::to_writer_pretty(&mut *writer, collection)?;
    } else {
        serde_json::to_writer(&mut *writer, collection)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Render `collection` to a `String`.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn feature_collection_to_string(
    collection: &FeatureCollection,
    options: &GeoJsonWriterOptions,
) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    write_feature_collection(&mut buffer, collection, options)?;
    String::from_utf8(buffer).map_err(std::io::Error::other)
}
