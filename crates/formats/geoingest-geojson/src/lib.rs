//! `GeoJSON` support for `geoingest`: reading documents and newline-delimited
//! sequences as a [`FeatureSource`](geoingest_core_common::FeatureSource), and
//! writing the ingested `FeatureCollection`.

pub mod parser;
pub mod source;
pub mod writer;

pub use source::GeoJsonSource;
pub use writer::{GeoJsonWriterOptions, feature_collection_to_string, write_feature_collection};
