//! Storage layer for the conference agenda.
//!
//! Provides persistence for program blocks and sessions using `rusqlite`, and
//! serves them to the agenda pipeline through [`ItemSource`].
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved to a worker thread to build an agenda
//! there, but it cannot be shared across threads without external
//! synchronization. Use separate `Database` instances per thread when building
//! several days concurrently.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2025-05-20T09:30:00.000Z`). Every write goes through the same
//! formatter, so lexicographic ordering matches chronological ordering and the
//! day window can be applied in SQL.
//!
//! ## Day Windows
//!
//! Items belong to a day when their start lies in `[day_start, day_end]`,
//! inclusive on both ends.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use thiserror::Error;

use agenda_core::{
    AgendaItem, IntervalCount, ItemFlags, ItemKind, ItemSource, SessionFormat, SessionId,
    ValidationError, format_session_subtitle,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {row_id}: {timestamp}")]
    TimestampParse {
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row does not form a valid agenda item.
    #[error("invalid row {row_id}: {source}")]
    InvalidRow {
        row_id: String,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A program block (free time, break, keynote) ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub block_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A conference session ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    pub room: Option<String>,
    pub speakers: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub livestream_url: Option<String>,
    pub tags: Option<String>,
    pub main_tag: Option<String>,
    pub in_my_schedule: bool,
}

/// Row counts for the status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub blocks: i64,
    pub sessions: i64,
    pub scheduled_sessions: i64,
    pub first_start: Option<String>,
    pub last_end: Option<String>,
}

const BLOCK_COLUMNS: &str = "id, title, subtitle, block_type, start_time, end_time";
const SESSION_COLUMNS: &str = "id, title, room, speakers, start_time, end_time, livestream_url, tags, main_tag, in_my_schedule";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Program blocks: free time placeholders, breaks, keynotes
            -- block_type: 'free', 'break' or 'keynote'
            CREATE TABLE IF NOT EXISTS blocks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                subtitle TEXT,
                block_type TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_blocks_start ON blocks(start_time);

            -- Sessions: in_my_schedule is owned by the user, never by imports
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                room TEXT,
                speakers TEXT,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                livestream_url TEXT,
                tags TEXT,
                main_tag TEXT,
                in_my_schedule INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);
            CREATE INDEX IF NOT EXISTS idx_sessions_in_schedule ON sessions(in_my_schedule);
            ",
        )?;
        Ok(())
    }

    /// Inserts or updates a batch of blocks by ID.
    pub fn upsert_blocks(&mut self, blocks: &[BlockRecord]) -> Result<usize, DbError> {
        if blocks.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR REPLACE INTO blocks
                (id, title, subtitle, block_type, start_time, end_time)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            for block in blocks {
                written += stmt.execute(params![
                    block.id,
                    block.title,
                    block.subtitle,
                    block.block_type,
                    format_timestamp(block.start_time),
                    format_timestamp(block.end_time),
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Inserts or updates a batch of sessions by ID.
    ///
    /// Re-importing a session keeps its `in_my_schedule` state; the record's
    /// own value only applies to sessions seen for the first time.
    pub fn upsert_sessions(&mut self, sessions: &[SessionRecord]) -> Result<usize, DbError> {
        if sessions.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO sessions
                (id, title, room, speakers, start_time, end_time, livestream_url, tags, main_tag, in_my_schedule)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    room = excluded.room,
                    speakers = excluded.speakers,
                    start_time = excluded.start_time,
                    end_time = excluded.end_time,
                    livestream_url = excluded.livestream_url,
                    tags = excluded.tags,
                    main_tag = excluded.main_tag
                ",
            )?;
            for session in sessions {
                written += stmt.execute(params![
                    session.id,
                    session.title,
                    session.room,
                    session.speakers,
                    format_timestamp(session.start_time),
                    format_timestamp(session.end_time),
                    session.livestream_url,
                    session.tags,
                    session.main_tag,
                    session.in_my_schedule,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Adds or removes a session from the personal schedule.
    ///
    /// Returns false if no session has the given ID.
    pub fn set_in_schedule(&self, session_id: &str, in_schedule: bool) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE sessions SET in_my_schedule = ? WHERE id = ?",
            params![in_schedule, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Lists blocks starting within the day window, ordered by start then ID.
    pub fn list_blocks_in_day(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<BlockRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {BLOCK_COLUMNS}
            FROM blocks
            WHERE start_time >= ? AND start_time <= ?
            ORDER BY start_time ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map(
            [format_timestamp(day_start), format_timestamp(day_end)],
            raw_block,
        )?;
        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(row?.into_record()?);
        }
        Ok(blocks)
    }

    /// Lists sessions starting within the day window, ordered by start then ID.
    pub fn list_sessions_in_day(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        scheduled_only: bool,
    ) -> Result<Vec<SessionRecord>, DbError> {
        let filter = if scheduled_only {
            "AND in_my_schedule = 1"
        } else {
            ""
        };
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE start_time >= ? AND start_time <= ? {filter}
            ORDER BY start_time ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map(
            [format_timestamp(day_start), format_timestamp(day_end)],
            raw_session,
        )?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_record()?);
        }
        Ok(sessions)
    }

    /// Returns row counts and the overall time span of the program.
    pub fn summary(&self) -> Result<StoreSummary, DbError> {
        let blocks = self
            .conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
        let (sessions, scheduled_sessions) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(in_my_schedule), 0) FROM sessions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (first_start, last_end) = self.conn.query_row(
            "
            SELECT MIN(start_time), MAX(end_time) FROM (
                SELECT start_time, end_time FROM blocks
                UNION ALL
                SELECT start_time, end_time FROM sessions
            )
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreSummary {
            blocks,
            sessions,
            scheduled_sessions,
            first_start,
            last_end,
        })
    }
}

impl ItemSource for Database {
    type Error = DbError;

    fn fetch_fixed_items(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<AgendaItem>, Self::Error> {
        let mut items: Vec<AgendaItem> = self
            .list_blocks_in_day(day_start, day_end)?
            .iter()
            .filter_map(block_to_item)
            .filter(|item| item.kind != ItemKind::Free)
            .collect();
        for session in self.list_sessions_in_day(day_start, day_end, true)? {
            items.push(session_to_item(&session)?);
        }
        items.sort_by_key(|item| item.start_time);
        Ok(items)
    }

    fn fetch_free_placeholders(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<AgendaItem>, Self::Error> {
        Ok(self
            .list_blocks_in_day(day_start, day_end)?
            .iter()
            .filter_map(block_to_item)
            .filter(|item| item.kind == ItemKind::Free)
            .collect())
    }

    fn fetch_unscheduled_session_counts(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        live_streamed_only: bool,
    ) -> Result<Vec<IntervalCount>, Self::Error> {
        let filter = if live_streamed_only {
            "AND IFNULL(livestream_url, '') != ''"
        } else {
            ""
        };
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT start_time, COUNT(*)
            FROM sessions
            WHERE start_time >= ? AND start_time <= ? AND in_my_schedule = 0 {filter}
            GROUP BY start_time
            ORDER BY start_time ASC
            "
        ))?;
        let rows = stmt.query_map(
            [format_timestamp(day_start), format_timestamp(day_end)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;
        let mut counts = Vec::new();
        for row in rows {
            let (start, count) = row?;
            counts.push(IntervalCount {
                interval_start: parse_timestamp(&start, "session interval")?,
                count: u32::try_from(count).unwrap_or(u32::MAX),
            });
        }
        Ok(counts)
    }
}

/// Block row as stored, before timestamp parsing.
struct RawBlock {
    id: String,
    title: String,
    subtitle: Option<String>,
    block_type: String,
    start_time: String,
    end_time: String,
}

impl RawBlock {
    fn into_record(self) -> Result<BlockRecord, DbError> {
        Ok(BlockRecord {
            start_time: parse_timestamp(&self.start_time, &self.id)?,
            end_time: parse_timestamp(&self.end_time, &self.id)?,
            id: self.id,
            title: self.title,
            subtitle: self.subtitle,
            block_type: self.block_type,
        })
    }
}

fn raw_block(row: &Row<'_>) -> rusqlite::Result<RawBlock> {
    Ok(RawBlock {
        id: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        block_type: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
    })
}

/// Session row as stored, before timestamp parsing.
struct RawSession {
    id: String,
    title: String,
    room: Option<String>,
    speakers: Option<String>,
    start_time: String,
    end_time: String,
    livestream_url: Option<String>,
    tags: Option<String>,
    main_tag: Option<String>,
    in_my_schedule: bool,
}

impl RawSession {
    fn into_record(self) -> Result<SessionRecord, DbError> {
        Ok(SessionRecord {
            start_time: parse_timestamp(&self.start_time, &self.id)?,
            end_time: parse_timestamp(&self.end_time, &self.id)?,
            id: self.id,
            title: self.title,
            room: self.room,
            speakers: self.speakers,
            livestream_url: self.livestream_url,
            tags: self.tags,
            main_tag: self.main_tag,
            in_my_schedule: self.in_my_schedule,
        })
    }
}

fn raw_session(row: &Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        id: row.get(0)?,
        title: row.get(1)?,
        room: row.get(2)?,
        speakers: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        livestream_url: row.get(6)?,
        tags: row.get(7)?,
        main_tag: row.get(8)?,
        in_my_schedule: row.get(9)?,
    })
}

/// Converts a block into an agenda item, skipping unknown block types.
fn block_to_item(block: &BlockRecord) -> Option<AgendaItem> {
    match AgendaItem::fixed_block(&block.block_type, &block.title, block.start_time, block.end_time)
    {
        Ok(mut item) => {
            item.subtitle.clone_from(&block.subtitle);
            if item.kind != ItemKind::Free {
                item.room.clone_from(&block.subtitle);
            }
            Some(item)
        }
        Err(e) => {
            tracing::warn!(block_id = %block.id, error = %e, "skipping block");
            None
        }
    }
}

fn session_to_item(session: &SessionRecord) -> Result<AgendaItem, DbError> {
    let session_id = SessionId::new(session.id.as_str()).map_err(|source| DbError::InvalidRow {
        row_id: session.id.clone(),
        source,
    })?;
    let mut item = AgendaItem::session(
        session_id,
        &session.title,
        session.start_time,
        session.end_time,
    );
    item.subtitle = format_session_subtitle(session.room.as_deref(), session.speakers.as_deref());
    item.room.clone_from(&session.room);
    item.format = Some(SessionFormat::from_tags(session.tags.as_deref()));
    item.main_tag.clone_from(&session.main_tag);
    if session
        .livestream_url
        .as_deref()
        .is_some_and(|url| !url.trim().is_empty())
    {
        item.flags.insert(ItemFlags::HAS_LIVESTREAM);
    }
    Ok(item)
}

fn parse_timestamp(timestamp: &str, row_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row_id: row_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
