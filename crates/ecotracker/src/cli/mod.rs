//! Command-line interface for ecotracker.
//!
//! This module provides the CLI structure and command handlers for the
//! `ecotrack` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ExportCommand, FactorsCommand, HistoryCommand, InputArgs, LogCommand,
    OutputFormat, ReportCommand, TipCommand, TrendCommand,
};

/// ecotrack - Track your daily carbon footprint
///
/// Log energy, transport and meal activities, see CO₂e estimates and
/// trends, get eco tips, and export PDF summaries.
#[derive(Debug, Parser)]
#[command(name = "ecotrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute a day's emissions and save it
    Log(LogCommand),

    /// List saved days
    History(HistoryCommand),

    /// Show day-over-day and weekly trends
    Trend(TrendCommand),

    /// Get an eco tip
    Tip(TipCommand),

    /// Write a PDF summary
    Report(ReportCommand),

    /// Export history as CSV
    Export(ExportCommand),

    /// Show emission factors
    Factors(FactorsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
