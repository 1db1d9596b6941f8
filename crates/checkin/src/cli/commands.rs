//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// File or FIFO of decoded payloads, one per line (e.g. `zbarcam --raw` output)
    #[arg(short, long, value_name = "PATH")]
    pub feed: Option<PathBuf>,
}

/// Admit command arguments.
#[derive(Debug, Args)]
pub struct AdmitCommand {
    /// Decoded QR payload, `name,phone`
    pub payload: String,

    /// Number of people in the party
    #[arg(short, long)]
    pub party_size: Option<u32>,

    /// Number of gifts brought
    #[arg(short, long, default_value = "0")]
    pub gifts: u32,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Maximum number of guests to show (newest first)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Event name commands.
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Show the event name
    Show,

    /// Rename the event
    Rename {
        /// The new event name
        name: String,
    },
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Confirm removal of every checked-in guest
    #[arg(short, long)]
    pub yes: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Guest list (`name,phone` per line); `-` or omitted reads stdin
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output archive path (defaults to the configured archive name)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// List the archive entries without rendering anything
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportCommand {
    /// The input file, or `None` for stdin.
    #[must_use]
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|p| p.as_os_str() != "-")
    }
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
