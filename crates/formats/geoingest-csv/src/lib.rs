//! CSV support for `geoingest`.
//!
//! Records become features whose geometry is read from a WKT column or a
//! longitude/latitude column pair; every other column becomes a string
//! property (empty cells are `null`).

pub mod geospatial;
pub mod source;

pub use source::{CsvSource, CsvSourceOptions, GeometryColumns};
