//! Common types and traits shared across `geoingest` crates.
//!
//! This crate provides the core abstractions that are shared between
//! `geoingest-core` and the format crates, preventing circular dependencies:
//! the raw [`SourceFeature`] model, the [`FeatureSource`] trait every format
//! implements, source read errors, and the static driver registry.

pub mod drivers;
pub mod error;
pub mod io;

// Re-export commonly used types
pub use drivers::{Driver, DriverCapabilities, SupportStatus};
pub use error::{SourcePosition, SourceReadError, SourceResult};
pub use io::{FeatureSource, SourceFeature, geometry_type_name};
