//! CLI subcommand implementations.

pub mod import;
pub mod schedule;
pub mod show;
pub mod status;
mod util;
