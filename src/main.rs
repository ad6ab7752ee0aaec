use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ticketlens::commands;

#[derive(Parser)]
#[command(name = "ticketlens")]
#[command(about = "Service-level metrics and summary charts for ticket exports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Path to the issues table
    #[arg(long, default_value = "data/issues.csv")]
    issues: PathBuf,

    /// Path to the resolution lookup table
    #[arg(long, default_value = "data/resolutions.csv")]
    resolutions: PathBuf,

    /// Field delimiter used by both tables
    #[arg(long, default_value_t = ';')]
    delimiter: char,
}

#[derive(Subcommand)]
enum Commands {
    /// Full report: metrics, category breakdown, charts
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// Directory for chart images
        #[arg(long, default_value = "outputs/visualizations")]
        out_dir: PathBuf,

        /// Skip chart rendering
        #[arg(long)]
        no_charts: bool,
    },

    /// Metrics report for a single category
    Category {
        /// Category name as it appears in the issues table
        name: String,

        #[command(flatten)]
        input: InputArgs,

        /// Directory for chart images
        #[arg(long, default_value = "outputs/visualizations")]
        out_dir: PathBuf,

        /// Skip chart rendering
        #[arg(long)]
        no_charts: bool,
    },

    /// Export computed metrics as JSON
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        bail!("Delimiter must be a single ASCII character, got '{delimiter}'");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            input,
            out_dir,
            no_charts,
        } => {
            let delimiter = delimiter_byte(input.delimiter)?;
            commands::report::run(
                &input.issues,
                &input.resolutions,
                delimiter,
                &out_dir,
                no_charts,
            )
        }

        Commands::Category {
            name,
            input,
            out_dir,
            no_charts,
        } => {
            let delimiter = delimiter_byte(input.delimiter)?;
            commands::category::run(
                &name,
                &input.issues,
                &input.resolutions,
                delimiter,
                &out_dir,
                no_charts,
            )
        }

        Commands::Export { input, output } => {
            let delimiter = delimiter_byte(input.delimiter)?;
            commands::export::run(
                &input.issues,
                &input.resolutions,
                delimiter,
                output.as_deref(),
            )
        }
    }
}
