//! Status command for showing what the local store holds.

use std::io::Write;

use anyhow::{Context, Result};

use agenda_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let summary = db.summary()?;

    writeln!(writer, "Agenda status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    if summary.blocks == 0 && summary.sessions == 0 {
        writeln!(writer, "No conference data imported.")?;
        return Ok(());
    }

    writeln!(writer, "Blocks: {}", summary.blocks)?;
    writeln!(
        writer,
        "Sessions: {} ({} in your schedule)",
        summary.sessions, summary.scheduled_sessions
    )?;
    if let (Some(first), Some(last)) = (&summary.first_start, &summary.last_end) {
        writeln!(writer, "Program: {first} .. {last}")?;
    }

    Ok(())
}
