//! CIMPL CLI
//!
//! Command-line interface for the CIMPL model expansion engine

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cimpl")]
#[command(about = "CIMPL: expand element hierarchies and consolidate constraints")]
#[command(version = cimpl_core::VERSION)]
#[command(
    long_about = "Expands an unexpanded CIMPL/SHR model into its fully merged form.\n\
Every element receives the structure of its bases, consolidated constraints and provenance.\n\
\n\
Examples:\n  \
cimpl expand model.json                  # Print the expanded model\n  \
cimpl expand model.json -o expanded.json # Write it to a file\n  \
cimpl expand model.json --strict         # Fail when errors are reported"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a model document
    Expand {
        /// Unexpanded model document (JSON)
        #[arg(help = "Path to the unexpanded model document")]
        model: PathBuf,

        /// Output file for the expanded model
        #[arg(short, long, help = "Output file (default: stdout)")]
        output: Option<PathBuf>,

        /// Configuration file path
        #[arg(
            short,
            long,
            help = "Path to configuration file (cimpl.toml/cimpl.yaml/cimpl.json)"
        )]
        config: Option<PathBuf>,

        /// Diagnostics output format
        #[arg(
            short,
            long,
            default_value = "human",
            help = "Output format for diagnostics"
        )]
        format: OutputFormat,

        /// Exit with non-zero code when errors were reported
        #[arg(long, help = "Exit with non-zero code when any error is reported")]
        strict: bool,
    },

    /// Show version information
    #[command(alias = "ver")]
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON array of diagnostics
    Json,
}

fn tracing_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "off",
        1 => "cimpl_core=info,cimpl=info",
        2 => "cimpl_core=debug,cimpl=debug",
        _ => "cimpl_core=trace,cimpl=trace",
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    cimpl_core::init_tracing_with_filter(tracing_filter(cli.verbose));

    match cli.command {
        Commands::Expand {
            model,
            output,
            config,
            format,
            strict,
        } => {
            let summary = commands::expand_command(&model, output.as_deref(), config.as_deref(), format)?;
            if strict && summary.errors > 0 {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("{} {}", cimpl_core::NAME, cimpl_core::VERSION);
            Ok(ExitCode::SUCCESS)
        }
    }
}
