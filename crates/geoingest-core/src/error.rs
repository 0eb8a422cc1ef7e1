//! Custom error types for `geoingest` operations.
//!
//! Run-level failures (a driver that cannot read, an unreadable file, a bad
//! option) surface as [`GeoIngestError`] and abort the run. Failures of a
//! single feature surface as [`FeatureError`]; the ingest loop logs and
//! counts those and carries on with the next feature.

use std::path::PathBuf;

use geoingest_core_common::SourceReadError;
use thiserror::Error;

/// Main error type for `geoingest` operations.
#[derive(Debug, Error)]
pub enum GeoIngestError {
    /// Driver-related errors (not found, unsupported operations, etc.)
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// I/O errors (file read/write, path issues, permissions)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Format parsing errors that prevent a source from being opened
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Coordinate reference system errors
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Driver-related errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Driver was not found in the registry
    #[error("Driver '{name}' not found. Available drivers: {available}")]
    NotFound {
        /// The requested driver name
        name: String,
        /// Comma-separated list of available drivers
        available: String,
    },

    /// Driver does not support the requested operation
    #[error("Driver '{driver}' does not support {operation}")]
    OperationNotSupported {
        /// The driver name
        driver: String,
        /// The operation that's not supported (e.g., "reading", "writing")
        operation: String,
    },

    /// No driver was given and none could be guessed from the path
    #[error("Cannot determine driver for '{path}'")]
    Undetermined {
        /// The dataset path
        path: PathBuf,
    },
}

/// I/O related errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read from a file
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read (e.g., "CSV", "`GeoJSON`")
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write to a file
    #[error("Failed to write {format} file '{path}': {source}")]
    Write {
        /// The format being written
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File was not found
    #[error("File not found: '{path}'")]
    FileNotFound {
        /// The missing file path
        path: PathBuf,
    },
}

/// Errors that stop a source from being opened at all.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The source could not be parsed
    #[error("Failed to open {format} source: {source}")]
    Source {
        /// The format being read
        format: String,
        /// The underlying read error
        #[source]
        source: SourceReadError,
    },
}

/// Coordinate reference system errors.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The CRS text is not in a recognised form
    #[error("Unrecognised CRS '{crs}'")]
    UnknownCrs {
        /// The CRS text as given
        crs: String,
    },

    /// The EPSG code is not in the CRS database
    #[error("EPSG:{code} is not in the CRS database")]
    UnknownEpsgCode {
        /// The EPSG code
        code: u16,
    },

    /// The projection definition was rejected by the projection engine
    #[error("Invalid projection definition for '{crs}': {message}")]
    InvalidDefinition {
        /// The CRS label
        crs: String,
        /// Engine message
        message: String,
    },

    /// A coordinate could not be transformed
    #[error("Failed to transform coordinate ({x}, {y}): {message}")]
    Transform {
        /// Input x
        x: f64,
        /// Input y
        y: f64,
        /// Engine message
        message: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

/// Errors raised by a property transformer for a single feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyMappingError {
    /// A required output property had no source value
    #[error("Property mapping failed: required property '{target}' has no value")]
    MissingRequired {
        /// The output property name
        target: String,
    },

    /// A source value could not be converted
    #[error("Property mapping failed: cannot convert '{target}' value {value} to {conversion}")]
    Conversion {
        /// The output property name
        target: String,
        /// The offending value, rendered as JSON
        value: String,
        /// The conversion that failed
        conversion: String,
    },

    /// Free-form failure raised by a custom transformer
    #[error("Property mapping failed: {0}")]
    Custom(String),
}

/// Reasons a single feature is dropped from the output.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The source record could not be decoded
    #[error(transparent)]
    Source(#[from] SourceReadError),

    /// The feature has no geometry
    #[error("empty geometry")]
    EmptyGeometry,

    /// The geometry could not be converted for processing
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    /// Reprojection failed
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// The property transformer rejected the feature
    #[error(transparent)]
    PropertyMapping(#[from] PropertyMappingError),
}

/// Type alias for Results using `GeoIngestError`.
pub type Result<T> = std::result::Result<T, GeoIngestError>;

impl GeoIngestError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Driver(e) => e.user_message(),
            Self::Io(e) => e.user_message(),
            Self::Format(e) => e.to_string(),
            Self::Projection(e) => format!("Projection error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Driver(e) => e.recovery_suggestion(),
            Self::Io(IoError::FileNotFound { .. }) => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
            Self::Projection(
                ProjectionError::UnknownCrs { .. } | ProjectionError::UnknownEpsgCode { .. },
            ) => Some(
                "Pass the source CRS explicitly with --source-crs (e.g. EPSG:3857 or a +proj= string)."
                    .to_string(),
            ),
            Self::Format(_) => Some("Check the file format and ensure it's valid.".to_string()),
            _ => None,
        }
    }
}

impl DriverError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { name, available } => {
                format!(
                    "Driver '{name}' not found.\n\nAvailable drivers:\n{}",
                    available
                        .split(", ")
                        .map(|d| format!("  - {d}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
            Self::OperationNotSupported { driver, operation } => {
                format!("The '{driver}' driver does not support {operation}.")
            },
            Self::Undetermined { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => {
                Some("Run 'geoingest drivers' to see all available drivers.".to_string())
            },
            Self::OperationNotSupported { .. } => {
                Some("Try using a different driver that supports this operation.".to_string())
            },
            Self::Undetermined { .. } => {
                Some("Pass the driver explicitly with --input-driver.".to_string())
            },
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { format, path, .. } => {
                format!("Failed to read {} file: {}", format, path.display())
            },
            Self::Write { format, path, .. } => {
                format!("Failed to write {} file: {}", format, path.display())
            },
            Self::FileNotFound { path } => {
                format!("File not found: {}", path.display())
            },
        }
    }
}

/// Extension trait for adding I/O context to errors.
pub trait IoErrorExt<T> {
    /// Add read context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;

    /// Add write context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Write`] if the underlying operation fails.
    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> IoErrorExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            GeoIngestError::Io(IoError::Read {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }

    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            GeoIngestError::Io(IoError::Write {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }
}

/// Helper to create `DriverError::NotFound` with available drivers.
#[must_use]
pub fn driver_not_found(name: &str) -> DriverError {
    use geoingest_core_common::drivers::get_driver_names;

    let available = get_driver_names().join(", ");
    DriverError::NotFound {
        name: name.to_string(),
        available,
    }
}
