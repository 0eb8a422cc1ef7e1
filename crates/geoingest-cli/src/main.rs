//! Command-line interface for `geoingest`, a single-pass geospatial feature ingester.
//!
//! This binary provides a thin façade over the [`geoingest_core`] library:
//! it parses arguments with [`clap`], configures [`tracing`] based logging,
//! and delegates to command handlers.
//!
//! # Available Commands
//!
//! - `ingest` - Normalise, reproject, remap and measure features into `GeoJSON`
//! - `info` - Display dataset information and metadata
//! - `drivers` - List all available format drivers and their capabilities

mod display;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use geoingest_core::error::{ConfigError, GeoIngestError, IoErrorExt};
use geoingest_core::filter::{AllOf, FeatureFilter, PropertyFilter};
use geoingest_core::operations::{
    self, DEFAULT_PRECISION, IngestOptions, IngestOutput, SourceOptions,
};
use geoingest_core::properties::PropertyMap;
use geoingest_core::reproject::Crs;
use geoingest_core_common::drivers::get_available_drivers;
use geoingest_csv::CsvSourceOptions;
use geoingest_geojson::{GeoJsonWriterOptions, feature_collection_to_string};

#[derive(Parser)]
#[command(
    name = "geoingest",
    version,
    about = "Single-pass geospatial feature ingestion",
    long_about = "geoingest reads vector features, forces them to 2D, reprojects them to \
                  EPSG:4326, repairs and orients polygons, remaps their properties and \
                  writes a GeoJSON FeatureCollection with acreage and bounding boxes."
)]
/// Command-line arguments and options for the `geoingest` CLI.
///
/// This struct defines the top-level CLI interface, including global flags for
/// logging verbosity and the subcommand to execute.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `geoingest` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Ingests a dataset into a WGS84 `GeoJSON` FeatureCollection.
    Ingest(IngestArgs),

    /// Displays information about a vector geospatial dataset.
    Info {
        /// Path to the input geospatial dataset.
        #[arg(value_name = "DATASET")]
        input: PathBuf,

        /// The driver to use for reading the dataset; guessed from the extension if omitted.
        #[arg(long, value_name = "DRIVER")]
        input_driver: Option<String>,

        #[command(flatten)]
        csv: CsvArgs,
    },

    /// Lists all available geospatial drivers and their capabilities.
    Drivers,
}

/// Arguments of the `ingest` subcommand.
#[derive(Args)]
struct IngestArgs {
    /// Path to the input geospatial dataset.
    #[arg(short, long, value_name = "DATASET")]
    input: PathBuf,

    /// Path for the output `GeoJSON` file.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// The driver to use for reading the input; guessed from the extension if omitted.
    #[arg(long, value_name = "DRIVER")]
    input_driver: Option<String>,

    /// JSON property map; properties are copied unchanged if omitted.
    #[arg(long, value_name = "FILE")]
    property_map: Option<PathBuf>,

    /// Merge features that share this source property.
    #[arg(long, value_name = "PROPERTY")]
    merge_on: Option<String>,

    /// Keep only matching features (`key=v1,v2` or `key!=v1,v2`); repeatable.
    #[arg(long, value_name = "EXPR")]
    filter: Vec<String>,

    /// CRS of the input, overriding the one the dataset declares.
    #[arg(long, value_name = "CRS")]
    source_crs: Option<String>,

    /// Decimals kept in output coordinates.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PRECISION)]
    precision: u32,

    /// Do not split geometries crossing the antimeridian.
    #[arg(long)]
    no_antimeridian_cutting: bool,

    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    csv: CsvArgs,
}

/// CSV reading options shared by `ingest` and `info`.
#[derive(Args)]
struct CsvArgs {
    /// CSV column holding WKT geometries.
    #[arg(long, value_name = "COLUMN", conflicts_with_all = ["lon_column", "lat_column"])]
    wkt_column: Option<String>,

    /// CSV column holding longitudes.
    #[arg(long, value_name = "COLUMN", requires = "lat_column")]
    lon_column: Option<String>,

    /// CSV column holding latitudes.
    #[arg(long, value_name = "COLUMN", requires = "lon_column")]
    lat_column: Option<String>,

    /// CSV field delimiter.
    #[arg(long, value_name = "CHAR", default_value_t = ',')]
    delimiter: char,
}

impl CsvArgs {
    fn to_source_options(&self) -> Result<SourceOptions, GeoIngestError> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| ConfigError::InvalidOption {
                option: "delimiter".to_string(),
                message: format!("'{}' is not an ASCII character", self.delimiter),
            })?;

        let mut csv = CsvSourceOptions::default().with_delimiter(delimiter);
        if let Some(column) = &self.wkt_column {
            csv = csv.with_wkt_column(column);
        }
        if let (Some(lon), Some(lat)) = (&self.lon_column, &self.lat_column) {
            csv = csv.with_lonlat_columns(lon, lat);
        }
        Ok(SourceOptions::default().with_csv(csv))
    }
}

/// Entry point for the `geoingest` command-line interface.
///
/// # Errors
///
/// Returns an error if command execution fails or if the logging system cannot be initialized.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let result = match cli.command {
        Commands::Ingest(args) => handle_ingest(args).await,
        Commands::Info {
            input,
            input_driver,
            csv,
        } => handle_info(&input, input_driver.as_deref(), &csv).await,
        Commands::Drivers => {
            handle_drivers();
            Ok(())
        },
    };

    result.map_err(|err| {
        let mut message = err.user_message();
        if let Some(suggestion) = err.recovery_suggestion() {
            message = format!("{message}\n\n{suggestion}");
        }
        anyhow!(message)
    })
}

fn ingest_options(args: &IngestArgs) -> Result<IngestOptions, GeoIngestError> {
    let mut options = IngestOptions::default()
        .with_precision(Some(args.precision))
        .with_antimeridian_cutting(!args.no_antimeridian_cutting);
    if let Some(crs) = &args.source_crs {
        options = options.with_source_crs(Crs::parse(crs)?);
    }
    if let Some(key) = &args.merge_on {
        options = options.with_merge_on(key);
    }
    options.validate()?;
    Ok(options)
}

async fn run_ingest(args: &IngestArgs) -> Result<IngestOutput, GeoIngestError> {
    let options = ingest_options(args)?;
    let source_options = args.csv.to_source_options()?;
    let filters = AllOf(
        args.filter
            .iter()
            .map(|expr| PropertyFilter::parse(expr))
            .collect::<Result<Vec<_>, _>>()?,
    );
    let property_map = match &args.property_map {
        Some(path) => PropertyMap::from_path(path)?,
        None => PropertyMap::passthrough(),
    };

    let input = args.input.clone();
    let driver = args.input_driver.clone();
    tokio::task::spawn_blocking(move || {
        let source = operations::open_source(&input, driver.as_deref(), &source_options)?;
        let filter = (!filters.0.is_empty()).then_some(&filters as &dyn FeatureFilter);
        operations::ingest(source, &property_map, &options, filter)
    })
    .await
    .map_err(|err| GeoIngestError::Other(err.into()))?
}

async fn handle_ingest(args: IngestArgs) -> Result<(), GeoIngestError> {
    info!(
        "Ingesting {} into {}",
        args.input.display(),
        args.output.display()
    );

    let output = run_ingest(&args).await?;

    let writer_options = GeoJsonWriterOptions::default().with_pretty(args.pretty);
    let text = feature_collection_to_string(&output.collection, &writer_options)
        .with_write_context("GeoJSON", &args.output)?;
    tokio::fs::write(&args.output, text)
        .await
        .with_write_context("GeoJSON", &args.output)?;

    display::display_ingest_stats(&output.stats, &args.output);
    Ok(())
}

async fn handle_info(
    input: &Path,
    input_driver: Option<&str>,
    csv: &CsvArgs,
) -> Result<(), GeoIngestError> {
    info!("Displaying info for {}", input.display());
    let source_options = csv.to_source_options()?;
    let input = input.to_path_buf();
    let driver = input_driver.map(str::to_string);

    let dataset = tokio::task::spawn_blocking(move || {
        operations::dataset_info(&input, driver.as_deref(), &source_options)
    })
    .await
    .map_err(|err| GeoIngestError::Other(err.into()))??;

    display::display_dataset_info(&dataset);
    Ok(())
}

/// Handles the `drivers` subcommand by displaying a formatted table of available drivers.
fn handle_drivers() {
    let drivers = get_available_drivers();
    println!("\nAvailable Drivers ({} total):\n", drivers.len());
    println!("{}", display::drivers_table(&drivers));
}
