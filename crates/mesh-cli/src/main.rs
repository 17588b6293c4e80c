//! mesh-cli: Command-line interface for 3D-print checks.
//!
//! This tool runs the mesh-printcheck analyses on OBJ files from the command
//! line, suitable for scripting and CI/CD pipelines. Faces are read as
//! polygons, so quads and n-gons keep their identity in the findings.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=mesh_printcheck=info` - Basic operation logging
//! - `RUST_LOG=mesh_printcheck=debug` - Detailed progress logging
//! - `RUST_LOG=mesh_printcheck::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Run every check with info logging
//! RUST_LOG=mesh_printcheck=info mesh check part.obj
//!
//! # Only thickness and overhang, as JSON
//! mesh --format json check part.obj --only thickness,overhang
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use mesh_printcheck::{CheckError, CheckKind, LengthUnit, UnitSystem};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod load;
mod output;

use commands::{check, fit, info, orient};

/// mesh - A command-line tool for 3D-print checks.
///
/// Find the problems that make a print fail and the orientation that needs
/// the least support.
#[derive(Parser)]
#[command(name = "mesh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run print checks and report flagged elements
    Check {
        /// Input OBJ file
        input: PathBuf,

        /// Only run these checks (comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<CheckKind>,

        /// Load thresholds from a TOML file
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// List the flagged element indices
        #[arg(long)]
        list: bool,
    },

    /// Display volume, area and size
    Info {
        /// Input OBJ file
        input: PathBuf,

        /// Unit system used for display
        #[arg(long, default_value = "metric")]
        units: UnitSystem,

        /// Display unit for lengths
        #[arg(long, default_value = "mm")]
        length_unit: LengthUnit,

        /// Meters per scene unit
        #[arg(long, default_value = "0.001")]
        scale_length: f64,
    },

    /// Search for the orientation with the least overhang
    Orient {
        /// Input OBJ file
        input: PathBuf,

        /// Overhang limit in degrees from vertical
        #[arg(long, default_value = "45")]
        angle: f64,

        /// Number of candidate rotations
        #[arg(long, default_value = "48")]
        iterations: usize,
    },

    /// Check that the mesh fits the printer's build volume
    Fit {
        /// Input OBJ file
        input: PathBuf,

        /// Build volume size along X, Y and Z
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], required = true)]
        bed: Vec<f64>,

        /// Scale uniformly to fill the tightest axis
        #[arg(long)]
        auto_scale: bool,
    },
}

/// Threshold overrides for `mesh check`.
#[derive(Args, Clone, Default)]
pub struct ThresholdArgs {
    /// Area and length at or below which faces and edges are degenerate
    #[arg(long)]
    pub threshold_zero: Option<f64>,

    /// Largest corner deviation of a flat face, in degrees
    #[arg(long)]
    pub angle_nonplanar: Option<f64>,

    /// Minimum wall thickness
    #[arg(long)]
    pub thickness_min: Option<f64>,

    /// Dihedral angle above which an edge is sharp, in degrees
    #[arg(long)]
    pub angle_sharp: Option<f64>,

    /// Overhang limit from vertical, in degrees
    #[arg(long)]
    pub angle_overhang: Option<f64>,

    /// Split n-gons into triangles before analysis
    #[arg(long)]
    pub triangulate: bool,
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over the -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "mesh_printcheck=info",
            2 => "mesh_printcheck=debug",
            _ => "mesh_printcheck=trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Check {
            input,
            only,
            config,
            thresholds,
            list,
        } => check::run(input, only, config.as_deref(), thresholds, *list, &cli),
        Commands::Info {
            input,
            units,
            length_unit,
            scale_length,
        } => info::run(input, *units, *length_unit, *scale_length, &cli),
        Commands::Orient {
            input,
            angle,
            iterations,
        } => orient::run(input, *angle, *iterations, &cli),
        Commands::Fit {
            input,
            bed,
            auto_scale,
        } => fit::run(input, bed, *auto_scale, &cli),
    };

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            if !cli.quiet {
                if let Some(check_err) = e.downcast_ref::<CheckError>() {
                    eprintln!("{}: {}", "Error".red().bold(), e);
                    eprintln!("  {}: {}", "Code".cyan(), check_err.code());
                    eprintln!(
                        "  {}: {}",
                        "Suggestion".green(),
                        check_err.recovery_suggestion()
                    );
                    if let Some(location) = check_err.location() {
                        eprintln!("  {}: {}", "Location".yellow(), location);
                    }
                } else {
                    eprintln!("{}: {}", "Error".red().bold(), e);
                    for cause in e.chain().skip(1) {
                        eprintln!("  {}: {}", "Caused by".yellow(), cause);
                    }
                }
            }
            std::process::exit(1);
        }
    }
}
