//! nct-graph - Command-line interface for NCT correlation graphs
//!
//! Builds the feature correlation graph (`graph.json`) consumed by the
//! augmentation and attack stages of the robustness pipeline.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{build, inspect};
use config::NctConfig;
use output::{OutputConfig, OutputFormat};

/// Build feature correlation graphs from NCT meta descriptions.
#[derive(Parser)]
#[command(name = "nct-graph")]
#[command(author, version)]
#[command(about = "Build feature correlation graphs from NCT meta descriptions")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  nct-graph build                                   Build NCT 0 with default paths
  nct-graph build --meta-path m.json --nct-index 2  Build one entry
  nct-graph build --all                             Build every entry in parallel
  nct-graph inspect 17 --top 10                     Show statistics of feature 17")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Compact output (minified JSON, borderless tables)
    #[arg(long, global = true)]
    compact: bool,

    /// Fail on .nctrc.toml errors instead of silently using defaults
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the correlation graph and write it as JSON
    #[command(visible_alias = "b")]
    Build {
        /// Path to meta.json [default: ../model/meta.json]
        #[arg(long)]
        meta_path: Option<PathBuf>,

        /// Path to write graph.json [default: ../model/graph.json]
        #[arg(long)]
        output_path: Option<PathBuf>,

        /// Index of the NCT entry in the meta file [default: 0]
        #[arg(long)]
        nct_index: Option<usize>,

        /// Build every NCT entry, writing <stem>_<index>.<ext> next to the output path
        #[arg(long, conflicts_with = "nct_index")]
        all: bool,
    },

    /// Show degree, importance and partners of one feature
    #[command(visible_alias = "i")]
    Inspect {
        /// Feature id
        #[arg(allow_negative_numbers = true)]
        feature: i64,

        /// Path to meta.json [default: ../model/meta.json]
        #[arg(long)]
        meta_path: Option<PathBuf>,

        /// Index of the NCT entry in the meta file [default: 0]
        #[arg(long)]
        nct_index: Option<usize>,

        /// Number of partners to list, by importance
        #[arg(short = 'n', long, default_value = "5")]
        top: usize,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let root = Path::new(".");
    let config = if cli.strict {
        NctConfig::load_strict(root)?
    } else {
        NctConfig::load(root)
    };

    // CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let mut output = OutputConfig::auto_detect(format, config.use_color());
    if cli.compact {
        output = output.compact();
    }

    match cli.command {
        Commands::Build {
            meta_path,
            output_path,
            nct_index,
            all,
        } => build::run(
            build::BuildArgs {
                meta_path: config.meta_path(meta_path),
                output_path: config.output_path(output_path),
                nct_index: config.nct_index(nct_index),
                all,
            },
            output,
        ),
        Commands::Inspect {
            feature,
            meta_path,
            nct_index,
            top,
        } => inspect::run(
            inspect::InspectArgs {
                feature,
                meta_path: config.meta_path(meta_path),
                nct_index: config.nct_index(nct_index),
                top,
            },
            output,
        ),
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
