//! `geoingest-core` is the ingest engine of the `geoingest` project.
//!
//! It turns any [`FeatureSource`](geoingest_core_common::FeatureSource) into
//! a WGS84 `GeoJSON` `FeatureCollection` in a single pass:
//!
//! - **Filtering**: [`filter`] drops features before any work is done.
//! - **Geometry**: [`geometry`] forces 2D, repairs invalid polygons and
//!   orients rings counter-clockwise.
//! - **Reprojection**: [`reproject`] resolves CRS identifiers and moves
//!   coordinates to EPSG:4326, cutting at the antimeridian.
//! - **Properties**: [`properties`] maps source attributes to output ones.
//! - **Merging**: [`merge`] collapses features sharing a key property.
//! - **Measures**: [`measure`] computes acres and bounding boxes.
//!
//! [`operations::ingest`] ties these together.

pub mod error;
pub mod filter;
pub mod geometry;
pub mod measure;
pub mod merge;
pub mod operations;
pub mod properties;
pub mod reproject;
pub mod types;

pub use error::{GeoIngestError, Result};
pub use operations::{IngestOptions, IngestOutput, SourceOptions, dataset_info, ingest, open_source};
pub use properties::{PropertyMap, PropertyTransformer};
pub use reproject::Crs;
pub use types::{DatasetInfo, IngestStats, IngestedFeature};
