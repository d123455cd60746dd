//! Command-line interface for pirep-bridge.
//!
//! This module provides the CLI structure for the `pxp` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ListCommand, OfpCommand, PirepsCommand, PrefsCommand, RunCommand,
};

use crate::logging::Verbosity;

/// pxp - X-Plane to phpVMS ACARS bridge
///
/// Receives telemetry from the X-Plane plugin over UDP and reports the
/// flight to a phpVMS virtual airline.
#[derive(Debug, Parser)]
#[command(name = "pxp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the preferences file
    #[arg(long, global = true, value_name = "FILE")]
    pub prefs: Option<PathBuf>,

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
    /// Listen for telemetry and run the flight console
    Run(RunCommand),

    /// List airlines on the site
    Airlines(ListCommand),

    /// List aircraft available to the pilot
    Fleet(ListCommand),

    /// List the pilot's reports
    Pireps(PirepsCommand),

    /// Fetch the latest SimBrief flight plan
    Ofp(OfpCommand),

    /// View or change saved selections
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Verbosity chosen by flags, or `None` to use the configured level.
    #[must_use]
    pub fn verbosity(&self) -> Option<Verbosity> {
        if self.quiet {
            Some(Verbosity::Quiet)
        } else {
            match self.verbose {
                0 => None,
                1 => Some(Verbosity::Verbose),
                _ => Some(Verbosity::Trace),
            }
        }
    }
}
