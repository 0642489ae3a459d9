//! Import command for loading the conference program into the local `SQLite` store.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Deserialize;

use agenda_core::ItemKind;
use agenda_db::{BlockRecord, Database, SessionRecord};

use crate::Config;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON file with `blocks` and `sessions`. Reads stdin when omitted.
    pub file: Option<PathBuf>,
}

pub fn run<W: Write>(writer: &mut W, args: &ImportArgs, config: &Config) -> Result<()> {
    let data = match &args.file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            parse_conference(BufReader::new(file))
                .with_context(|| format!("failed to import {}", path.display()))?
        }
        None => parse_conference(io::stdin().lock()).context("failed to import stdin")?,
    };

    let mut db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let blocks = db.upsert_blocks(&data.blocks)?;
    let sessions = db.upsert_sessions(&data.sessions)?;
    tracing::debug!(blocks, sessions, "imported conference data");

    writeln!(writer, "Imported {blocks} blocks and {sessions} sessions")?;
    Ok(())
}

/// Validated conference program.
#[derive(Debug)]
struct Conference {
    blocks: Vec<BlockRecord>,
    sessions: Vec<SessionRecord>,
}

fn parse_conference<R: Read>(reader: R) -> Result<Conference> {
    let parsed: ImportConference = serde_json::from_reader(reader).context("invalid JSON")?;

    let blocks = parsed
        .blocks
        .into_iter()
        .enumerate()
        .map(|(idx, block)| {
            block
                .into_record()
                .with_context(|| format!("invalid block at index {idx}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let sessions = parsed
        .sessions
        .into_iter()
        .enumerate()
        .map(|(idx, session)| {
            session
                .into_record()
                .with_context(|| format!("invalid session at index {idx}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Conference { blocks, sessions })
}

#[derive(Debug, Deserialize)]
struct ImportConference {
    #[serde(default)]
    blocks: Vec<ImportBlock>,
    #[serde(default)]
    sessions: Vec<ImportSession>,
}

#[derive(Debug, Deserialize)]
struct ImportBlock {
    id: String,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(rename = "type")]
    block_type: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ImportSession {
    id: String,
    title: String,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    speakers: Vec<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    livestream_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    main_tag: Option<String>,
    #[serde(default)]
    in_my_schedule: bool,
}

impl ImportBlock {
    fn into_record(self) -> Result<BlockRecord> {
        require_id(&self.id)?;
        ItemKind::from_block_type(&self.block_type)?;
        require_order(self.start, self.end)?;
        Ok(BlockRecord {
            id: self.id,
            title: self.title,
            subtitle: non_empty(self.subtitle),
            block_type: self.block_type,
            start_time: self.start,
            end_time: self.end,
        })
    }
}

impl ImportSession {
    fn into_record(self) -> Result<SessionRecord> {
        require_id(&self.id)?;
        require_order(self.start, self.end)?;
        let speakers = (!self.speakers.is_empty()).then(|| self.speakers.join(", "));
        let tags = (!self.tags.is_empty()).then(|| self.tags.join(","));
        Ok(SessionRecord {
            id: self.id,
            title: self.title,
            room: non_empty(self.room),
            speakers,
            start_time: self.start,
            end_time: self.end,
            livestream_url: non_empty(self.livestream_url),
            tags,
            main_tag: non_empty(self.main_tag),
            in_my_schedule: self.in_my_schedule,
        })
    }
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("missing id");
    }
    Ok(())
}

fn require_order(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        bail!("end {end} is not after start {start}");
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|val| !val.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    const PROGRAM: &str = r#"{
        "blocks": [
            {"id": "free-am", "title": "Free time", "type": "free",
             "start": "2025-05-20T09:00:00Z", "end": "2025-05-20T12:00:00Z"},
            {"id": "lunch", "title": "Lunch", "subtitle": "Cafeteria", "type": "break",
             "start": "2025-05-20T12:00:00Z", "end": "2025-05-20T13:00:00Z"}
        ],
        "sessions": [
            {"id": "intro", "title": "Intro to Rust", "room": "Room 1",
             "speakers": ["Ferris", "Corro"], "tags": ["type_codelabs", "topic_rust"],
             "start": "2025-05-20T10:00:00+02:00", "end": "2025-05-20T10:40:00+02:00",
             "livestream_url": "", "in_my_schedule": true}
        ]
    }"#;

    #[test]
    fn parses_blocks_and_sessions() {
        let data = parse_conference(PROGRAM.as_bytes()).unwrap();

        assert_eq!(data.blocks.len(), 2);
        assert_eq!(data.blocks[1].subtitle.as_deref(), Some("Cafeteria"));
        assert_eq!(data.blocks[0].block_type, "free");

        let session = &data.sessions[0];
        assert_eq!(session.speakers.as_deref(), Some("Ferris, Corro"));
        assert_eq!(session.tags.as_deref(), Some("type_codelabs,topic_rust"));
        assert_eq!(session.livestream_url, None);
        assert!(session.in_my_schedule);
        assert_eq!(
            session.start_time,
            Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).single().unwrap()
        );
    }

    #[test]
    fn rejects_unknown_block_type() {
        let input = r#"{"blocks": [{"id": "x", "title": "Party", "type": "party",
            "start": "2025-05-20T18:00:00Z", "end": "2025-05-20T20:00:00Z"}]}"#;
        let err = parse_conference(input.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "invalid block at index 0");
    }

    #[test]
    fn rejects_inverted_and_anonymous_sessions() {
        let inverted = r#"{"sessions": [{"id": "s1", "title": "Backwards",
            "start": "2025-05-20T11:00:00Z", "end": "2025-05-20T10:00:00Z"}]}"#;
        let err = parse_conference(inverted.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "invalid session at index 0");

        let anonymous = r#"{"sessions": [{"id": " ", "title": "Nobody",
            "start": "2025-05-20T10:00:00Z", "end": "2025-05-20T11:00:00Z"}]}"#;
        let err = parse_conference(anonymous.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("missing id"));
    }

    #[test]
    fn import_command_writes_to_store() {
        let temp = tempfile::tempdir().unwrap();
        let input = temp.path().join("program.json");
        std::fs::write(&input, PROGRAM).unwrap();
        let config = Config {
            database_path: temp.path().join("agenda.db"),
            ..Config::default()
        };

        let mut output = Vec::new();
        run(&mut output, &ImportArgs { file: Some(input) }, &config).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Imported 2 blocks and 1 sessions\n"
        );

        let summary = Database::open(&config.database_path)
            .unwrap()
            .summary()
            .unwrap();
        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.scheduled_sessions, 1);
    }
}
