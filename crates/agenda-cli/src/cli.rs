//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::import::ImportArgs;
use crate::commands::schedule::ScheduleArgs;
use crate::commands::show::ShowArgs;

/// Personal conference agenda.
///
/// Merges the sessions you picked with the official program, flags clashes,
/// and shows how many open sessions fit in each stretch of free time.
#[derive(Debug, Parser)]
#[command(name = "agenda", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the resolved agenda for one day.
    Show(ShowArgs),

    /// Import conference blocks and sessions from JSON.
    Import(ImportArgs),

    /// Add a session to your schedule.
    Add(ScheduleArgs),

    /// Remove a session from your schedule.
    Remove(ScheduleArgs),

    /// Show what the local store contains.
    Status,
}
