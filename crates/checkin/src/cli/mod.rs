//! Command-line interface for checkin.
//!
//! This module provides the CLI structure for the `checkin` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AdmitCommand, ClearCommand, ConfigCommand, EventCommand, ExportCommand, ListCommand,
    OutputFormat, ScanCommand, StatsCommand,
};

/// checkin - QR code check-in desk for events
///
/// Scan guest QR codes, record party sizes and gifts, and generate QR
/// codes for a guest list.
#[derive(Debug, Parser)]
#[command(name = "checkin")]
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
    /// Run the interactive check-in desk
    Scan(ScanCommand),

    /// Check in one guest without prompting
    Admit(AdmitCommand),

    /// List checked-in guests
    List(ListCommand),

    /// Show check-in totals
    Stats(StatsCommand),

    /// Show or change the event name
    #[command(subcommand)]
    Event(EventCommand),

    /// Remove every checked-in guest
    Clear(ClearCommand),

    /// Generate QR codes for a guest list as a ZIP of PNG images
    Export(ExportCommand),

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
