//! Show command for rendering the resolved agenda of one day.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use agenda_core::{AgendaItem, ItemFlags, build_agenda};
use agenda_db::Database;

use crate::Config;

use super::util::{day_bounds, parse_datetime, parse_day};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Day to show (YYYY-MM-DD, UTC).
    #[arg(long)]
    pub day: String,

    /// Treat this instant as the current time (RFC 3339 or relative, e.g. "2 hours ago").
    #[arg(long)]
    pub now: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ShowArgs, config: &Config) -> Result<()> {
    let day = parse_day(&args.day)?;
    let (day_start, day_end) = day_bounds(day)?;
    let now = match &args.now {
        Some(now) => parse_datetime(now, Utc::now())?,
        None => Utc::now(),
    };

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let agenda = build_agenda(&db, day_start, day_end, now, &config.agenda_config())
        .with_context(|| format!("failed to build agenda for {day}"))?;
    tracing::debug!(%day, items = agenda.len(), "built agenda");

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &agenda)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "Agenda for {day}")?;
    if agenda.is_empty() {
        writeln!(writer, "No items.")?;
        return Ok(());
    }
    for item in &agenda {
        writeln!(writer, "{}", format_line(item))?;
    }
    Ok(())
}

fn format_line(item: &AgendaItem) -> String {
    let mut line = format!(
        "{}-{}  {:<7}  {}",
        item.start_time.format("%H:%M"),
        item.end_time.format("%H:%M"),
        item.kind.as_str(),
        item.title
    );
    if let Some(subtitle) = &item.subtitle {
        line.push_str(&format!(" ({subtitle})"));
    }
    if item.has_flag(ItemFlags::HAS_LIVESTREAM) {
        line.push_str(" [live]");
    }
    if item.conflicts_with_previous() {
        line.push_str(" [conflict]");
    }
    line
}
