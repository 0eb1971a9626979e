//! Viamask: polygon annotations to binary masks.
//!
//! Viamask reads a VGG Image Annotator (VIA) JSON export and writes one
//! black-and-white PNG mask per annotated polygon, sized to match its source
//! image. The work happens in two stages:
//!
//! 1. [`normalize`] flattens the nested export into [`RegionRecord`]s, one
//!    per region, each tagged with a running index per `(filename, type)`.
//! 2. [`raster`] fills each record's polygon on a fresh canvas and writes it
//!    as `{filename}_{type}_{count}.png`.
//!
//! # Modules
//!
//! - [`via`]: VIA export document types and reader
//! - [`normalize`]: Region records and the flattening pass
//! - [`raster`]: Polygon fill, mask naming and the rasterizer
//! - [`pipeline`]: The two stages wired together
//! - [`error`]: Error types for viamask operations
//!
//! # Example
//!
//! ```
//! use viamask::normalize::normalize;
//! use viamask::raster::{output_name, MASK_EXTENSION};
//! use viamask::via::from_via_str;
//!
//! let document = from_via_str(r#"{
//!     "a1": {
//!         "filename": "cat.jpg",
//!         "regions": [{
//!             "shape_attributes": {"name": "polygon", "all_points_x": [0, 10, 10, 0], "all_points_y": [0, 0, 10, 10]},
//!             "region_attributes": {"Type": "head"}
//!         }]
//!     }
//! }"#).unwrap();
//!
//! let records = normalize(&document).unwrap();
//! assert_eq!(output_name(&records[0], MASK_EXTENSION), "cat_head_0.png");
//! ```

pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod raster;
pub mod via;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use error::ViamaskError;
pub use normalize::RegionRecord;

use normalize::export::{render_records, RecordsFormat};
use pipeline::{generate_masks, GenerateOptions};
use raster::{CanvasMode, FailurePolicy};

/// The viamask CLI application.
#[derive(Parser)]
#[command(name = "viamask")]
#[command(version, author, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log progress to stderr (repeat for more detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Write one mask image per annotated region.
    Generate(GenerateArgs),
    /// Print the normalized region table without writing masks.
    Inspect(InspectArgs),
}

/// Arguments for the generate subcommand.
#[derive(clap::Args)]
struct GenerateArgs {
    /// VIA JSON export to read.
    annotations: PathBuf,

    /// Directory containing the source images.
    #[arg(short, long, env = "VIAMASK_IMAGES")]
    images: PathBuf,

    /// Directory to write masks into.
    #[arg(short, long, env = "VIAMASK_OUTPUT")]
    output: PathBuf,

    /// Mask pixel values.
    #[arg(long, value_enum, default_value_t = ModeArg::Bilevel)]
    mode: ModeArg,

    /// Continue past regions that fail and report them at the end.
    #[arg(long)]
    keep_going: bool,

    /// Create the output directory if it does not exist.
    #[arg(long)]
    create_output: bool,

    /// Check sources and list mask names without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// VIA JSON export to read.
    annotations: PathBuf,

    /// Output format for the region table.
    #[arg(long, value_enum, default_value_t = TableFormat::Text)]
    format: TableFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ModeArg {
    /// 0 background, 255 foreground
    Bilevel,
    /// 0 background, 1 foreground
    Binary,
}

impl From<ModeArg> for CanvasMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Bilevel => CanvasMode::Bilevel,
            ModeArg::Binary => CanvasMode::Binary,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum TableFormat {
    Text,
    Csv,
    Json,
}

impl From<TableFormat> for RecordsFormat {
    fn from(format: TableFormat) -> Self {
        match format {
            TableFormat::Text => RecordsFormat::Text,
            TableFormat::Csv => RecordsFormat::Csv,
            TableFormat::Json => RecordsFormat::Json,
        }
    }
}

/// Run the viamask CLI with already-parsed arguments.
///
/// This is the main entry point for the CLI, called from `main.rs` after
/// logging is set up.
pub fn run(cli: Cli) -> Result<(), ViamaskError> {
    match cli.command {
        Some(Commands::Generate(args)) => run_generate(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        None => {
            println!("viamask {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Polygon annotations to binary masks.");
            println!();
            println!("Run 'viamask --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the generate subcommand.
fn run_generate(args: GenerateArgs) -> Result<(), ViamaskError> {
    let opts = GenerateOptions {
        mode: args.mode.into(),
        policy: if args.keep_going {
            FailurePolicy::KeepGoing
        } else {
            FailurePolicy::FailFast
        },
        create_output_dir: args.create_output,
        dry_run: args.dry_run,
        ..GenerateOptions::new(args.annotations, args.images, args.output)
    };

    let report = generate_masks(&opts)?;

    match args.report {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|source| ViamaskError::ReportWrite { source })?;
            println!("{}", json);
        }
        ReportFormat::Text => print!("{}", report),
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(ViamaskError::RenderFailed {
            failed: report.failure_count(),
            total: report.total(),
        })
    }
}

/// Execute the inspect subcommand.
fn run_inspect(args: InspectArgs) -> Result<(), ViamaskError> {
    let document = via::read_via_json(&args.annotations)?;
    let records = normalize::normalize(&document)?;

    let table = render_records(&records, args.format.into())?;
    print!("{}", table);
    if !table.ends_with('\n') {
        println!();
    }
    Ok(())
}
