//! codec-rd CLI - rate-distortion curves for encoder benchmarks

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Build and compare rate-distortion curves from encode results.
#[derive(Parser)]
#[command(name = "codec-rd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true, env = "CODEC_RD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Sources and results tables.
#[derive(Args)]
pub struct DataArgs {
    /// Sources CSV (basename, resolution_index, width, height)
    #[arg(long)]
    sources: PathBuf,

    /// Results CSV (label, source, resolution_index, quality, size, runtime, ssimu2, fullres_ssimu2)
    #[arg(long)]
    results: PathBuf,
}

/// Overrides for the configured quality grid.
#[derive(Args, Default)]
pub struct GridArgs {
    /// Lowest score on the curve grid
    #[arg(long)]
    score_lo: Option<f64>,

    /// Highest score on the curve grid
    #[arg(long)]
    score_hi: Option<f64>,

    /// Number of grid points
    #[arg(long)]
    steps: Option<usize>,

    /// Delta integration rule (trapezoid, mean)
    #[arg(long)]
    integration: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build aggregated curves for each label
    Curves {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        grid: GridArgs,

        /// Labels to build (default: all)
        #[arg(short, long)]
        label: Vec<String>,

        /// Output report (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare labels with size and runtime deltas
    Compare {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        grid: GridArgs,

        /// Labels to compare (at least two)
        #[arg(short, long, required = true, num_args = 1..)]
        label: Vec<String>,

        /// Lower bound of the comparison interval
        #[arg(long, default_value = "50")]
        lo: f64,

        /// Upper bound of the comparison interval
        #[arg(long, default_value = "80")]
        hi: f64,

        /// Curve to compare (multires, res0, res1, ...)
        #[arg(long, default_value = "multires")]
        slot: String,

        /// Output report (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the resolution ladder for a source size
    Ladder {
        /// Full-resolution width
        width: u32,

        /// Full-resolution height
        height: u32,
    },

    /// List encodes still missing for a label
    Plan {
        #[command(flatten)]
        data: DataArgs,

        /// Label to plan for
        #[arg(short, long)]
        label: String,

        /// Encoder preset providing the sweep qualities
        #[arg(short, long)]
        encoder: String,

        /// Restrict to one source
        #[arg(long)]
        source: Option<String>,
    },

    /// Find quality settings that hit target scores
    Search {
        /// CSV of measured settings (quality, size, runtime, score)
        #[arg(short, long)]
        input: PathBuf,

        /// Encoder preset
        #[arg(short, long)]
        encoder: String,

        /// Target scores
        #[arg(short, long, required = true, num_args = 1..)]
        target: Vec<f64>,

        /// Source name for the session
        #[arg(long, default_value = "source")]
        source: String,

        /// Output table (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "codec_rd=debug,codec_rd_cli=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Curves { data, grid, label, output } => {
            commands::curves::run(&data, &grid, config, label, output)
        }
        Commands::Compare { data, grid, label, lo, hi, slot, output } => {
            commands::compare::run(&data, &grid, config, &label, lo, hi, &slot, output)
        }
        Commands::Ladder { width, height } => commands::ladder::run(width, height, config),
        Commands::Plan { data, label, encoder, source } => {
            commands::plan::run(&data, &label, &encoder, source.as_deref())
        }
        Commands::Search { input, encoder, target, source, output } => {
            commands::search::run(input, &encoder, &target, &source, output)
        }
    }
}
