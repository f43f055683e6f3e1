//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::activity::parse_assignment;
use crate::presets::Preset;

/// Parse `--set key=value`.
fn parse_set(raw: &str) -> Result<(String, f64), String> {
    parse_assignment(raw).map_err(|e| e.to_string())
}

/// Inputs shared by commands that compute a day.
#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// Start from a canned scenario
    #[arg(short, long, value_enum)]
    pub preset: Option<Preset>,

    /// Set an activity quantity, e.g. --set bus_km=12 (repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_set)]
    pub values: Vec<(String, f64)>,
}

/// Log command arguments.
#[derive(Debug, Args)]
pub struct LogCommand {
    /// Day to log (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Activity inputs
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Compute and print without saving
    #[arg(long)]
    pub dry_run: bool,

    /// Also print an eco tip
    #[arg(short, long)]
    pub tip: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Show only the most recent N records
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Trend command arguments.
#[derive(Debug, Args)]
pub struct TrendCommand {
    /// Reference date (defaults to today)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Tip command arguments.
#[derive(Debug, Args)]
pub struct TipCommand {
    /// Day the tip is for (defaults to today)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Activity inputs; without any, the saved record for the date is used
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Where to write the PDF
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Day to report (defaults to the latest saved record)
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Override the configured title
    #[arg(long)]
    pub title: Option<String>,

    /// Leave the tip out
    #[arg(long)]
    pub no_tip: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Factors command arguments.
#[derive(Debug, Args)]
pub struct FactorsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
