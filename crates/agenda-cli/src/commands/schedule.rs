//! Add and remove commands for managing the personal schedule.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Args;

use agenda_db::Database;

use crate::Config;

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Session ID as listed in the imported program.
    pub session_id: String,
}

pub fn add<W: Write>(writer: &mut W, args: &ScheduleArgs, config: &Config) -> Result<()> {
    set(config, &args.session_id, true)?;
    writeln!(writer, "Added {} to your schedule", args.session_id)?;
    Ok(())
}

pub fn remove<W: Write>(writer: &mut W, args: &ScheduleArgs, config: &Config) -> Result<()> {
    set(config, &args.session_id, false)?;
    writeln!(writer, "Removed {} from your schedule", args.session_id)?;
    Ok(())
}

fn set(config: &Config, session_id: &str, in_schedule: bool) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    if !db.set_in_schedule(session_id, in_schedule)? {
        bail!("session not found: {session_id}");
    }
    tracing::debug!(session_id, in_schedule, "updated schedule");
    Ok(())
}
