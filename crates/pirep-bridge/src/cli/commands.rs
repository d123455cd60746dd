//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Override the configured telemetry port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Don't read commands from stdin; run until Ctrl-C
    #[arg(long)]
    pub headless: bool,
}

/// Arguments shared by the catalog listings.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show entries containing this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Report listing arguments.
#[derive(Debug, Args)]
pub struct PirepsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Flight plan fetch arguments.
#[derive(Debug, Args)]
pub struct OfpCommand {
    /// SimBrief pilot ID (defaults to the configured one)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Preference commands.
#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    /// Show saved selections
    Show,

    /// Select the airline for new reports
    SetAirline {
        /// Airline ID
        id: u32,
    },

    /// Select the aircraft for new reports
    SetAircraft {
        /// Aircraft ID
        id: u32,
    },

    /// Forget saved selections
    Clear,
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

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
