//! print3d: command-line front end for the 3D print toolbox.
//!
//! Runs the printability checks, the repair and transform operators, the
//! vacuum-forming base generator and the exporter on mesh files.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=print3d_toolbox=info` - Basic operation logging
//! - `RUST_LOG=print3d_base=debug` - Base generation stages
//! - `RUST_LOG=print3d_toolbox::timing=debug` - Performance timing
//!
//! # Example
//!
//! ```bash
//! print3d check part.stl --only solid,overhang --report part.json
//! print3d select part.stl --report part.json --entry 0
//! print3d clean part.stl -o part_clean.stl
//! print3d base part_clean.stl -o bases/ --bottom-thickness 1.4
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{align, base, check, clean, export, info, place, project, scale, select, thin};

/// print3d - check, repair and prepare meshes for 3D printing.
#[derive(Parser)]
#[command(name = "print3d")]
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

    /// Toolbox settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Target size for `scale`; exactly one must be given.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ScaleTarget {
    /// Scale so the combined volume equals this value
    #[arg(long)]
    pub volume: Option<f64>,

    /// Scale so the largest bounding-box side equals this value
    #[arg(long)]
    pub bounds: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show counts, bounds, volume and surface area
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Run the printability checks
    Check {
        /// Input mesh file
        input: PathBuf,

        /// Checks to run (solid, intersect, degenerate, distorted, thick, sharp, overhang)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Save the report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Resolve a saved report entry against a mesh
    Select {
        /// Input mesh file
        input: PathBuf,

        /// Report written by `check --report`
        #[arg(long)]
        report: PathBuf,

        /// Entry index in the report
        #[arg(long)]
        entry: usize,
    },

    /// Clean non-manifold geometry, or triangulate distorted faces
    Clean {
        /// Input mesh file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Triangulate distorted faces instead
        #[arg(long)]
        distorted: bool,

        /// Merge distance for doubles and degenerate geometry
        #[arg(long)]
        threshold: Option<f64>,

        /// Largest hole to fill, in edges (0 fills all)
        #[arg(long)]
        sides: Option<usize>,
    },

    /// Scale objects to a volume or to a bounding size
    Scale {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        target: ScaleTarget,
    },

    /// Rotate an object so the selected faces point down
    Align {
        /// Input mesh file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Face indices to align
        #[arg(long, value_delimiter = ',', required = true)]
        faces: Vec<usize>,

        /// Weight face normals by area
        #[arg(long)]
        face_area: bool,
    },

    /// Move objects onto the build plate at the origin
    Place {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Move each origin to its bounding-box center first
        #[arg(long)]
        reset_origin: bool,
    },

    /// Shrink (positive) or fatten (negative) along vertex normals
    Thin {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Offset distance; defaults to the configured thinning amount
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<f64>,
    },

    /// Flatten objects onto the XY plane
    Project {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate vacuum-forming bases
    Base {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Base wall thickness; half of it is applied when above 0.05
        #[arg(long)]
        bottom_thickness: Option<f64>,

        /// Voxel size of the base grid
        #[arg(long)]
        voxel_size: Option<f64>,
    },

    /// Export objects with the configured format and options
    Export {
        /// Input mesh files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory that `//` export paths are relative to
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "print3d_toolbox=info,print3d_base=info",
            2 => "print3d_toolbox=debug,print3d_base=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn report_error(e: &anyhow::Error) {
    if let Some(err) = e.downcast_ref::<print3d_toolbox::PrintError>() {
        eprintln!("{}: {}", "Error".red().bold(), err);
        eprintln!("  {}: {}", "Code".cyan(), err.code());
        eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
        if let Some(location) = err.location() {
            eprintln!("  {}: {}", "Location".yellow(), location);
        }
    } else if let Some(err) = e.downcast_ref::<print3d_base::BaseError>() {
        eprintln!("{}: {}", "Error".red().bold(), err);
        eprintln!("  {}: {}", "Code".cyan(), err.code());
        eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
    } else {
        eprintln!("{}: {}", "Error".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {}: {}", "Caused by".yellow(), cause);
        }
    }
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Info { input } => info::run(input, &cli),
        Commands::Check {
            input,
            only,
            report,
        } => check::run(input, only, report.as_deref(), &cli),
        Commands::Select {
            input,
            report,
            entry,
        } => select::run(input, report, *entry, &cli),
        Commands::Clean {
            input,
            output,
            distorted,
            threshold,
            sides,
        } => clean::run(input, output, *distorted, *threshold, *sides, &cli),
        Commands::Scale {
            inputs,
            output,
            target,
        } => scale::run(inputs, output, target, &cli),
        Commands::Align {
            input,
            output,
            faces,
            face_area,
        } => align::run(input, output, faces, *face_area, &cli),
        Commands::Place {
            inputs,
            output,
            reset_origin,
        } => place::run(inputs, output, *reset_origin, &cli),
        Commands::Thin {
            inputs,
            output,
            amount,
        } => thin::run(inputs, output, *amount, &cli),
        Commands::Project { inputs, output } => project::run(inputs, output, &cli),
        Commands::Base {
            inputs,
            output,
            bottom_thickness,
            voxel_size,
        } => base::run(inputs, output, *bottom_thickness, *voxel_size, &cli),
        Commands::Export { inputs, base_dir } => export::run(inputs, base_dir.as_deref(), &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            report_error(e);
        }
        std::process::exit(1);
    }

    Ok(())
}
