//! Agenda item model with validation.

use std::fmt;

use bitflags::bitflags;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for model types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Block type that does not map to an agenda item.
    #[error("unknown block type: {value}")]
    UnknownBlockType { value: String },
}

/// A validated session identifier.
///
/// Session IDs must be non-empty strings. They come from the conference
/// data feed and are stable across imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty {
                field: "session ID",
            });
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What an agenda row represents.
///
/// Only [`ItemKind::Free`] items are mutable: the resolver may trim, split, or
/// delete them. Sessions and breaks keep their time bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Free time placeholder covering a gap in the official program.
    Free,
    /// A conference session on the personal schedule.
    Session,
    /// A scheduled break (lunch, after hours).
    Break,
}

impl ItemKind {
    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Session => "session",
            Self::Break => "break",
        }
    }

    /// Maps a program block type to the kind of row it produces.
    ///
    /// Keynote blocks are fixed program slots and show up as sessions.
    pub fn from_block_type(block_type: &str) -> Result<Self, ValidationError> {
        match block_type.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "break" => Ok(Self::Break),
            "keynote" => Ok(Self::Session),
            _ => Err(ValidationError::UnknownBlockType {
                value: block_type.to_string(),
            }),
        }
    }

    /// Returns true if the resolver may reshape items of this kind.
    #[must_use]
    pub const fn is_mutable(self) -> bool {
        matches!(self, Self::Free)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Session format, detected from the session's tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFormat {
    Session,
    Codelab,
    SandboxTalk,
    Misc,
}

impl SessionFormat {
    /// Detects the format from comma-separated tag text.
    ///
    /// Missing or unrecognized tags fall back to [`SessionFormat::Misc`].
    pub fn from_tags(tags: Option<&str>) -> Self {
        let Some(tags) = tags.filter(|t| !t.trim().is_empty()) else {
            return Self::Misc;
        };
        let tags = tags.to_ascii_uppercase();
        if tags.contains("TYPE_SESSIONS") || tags.contains("KEYNOTE") {
            Self::Session
        } else if tags.contains("TYPE_CODELAB") {
            Self::Codelab
        } else if tags.contains("TYPE_SANDBOXTALKS") {
            Self::SandboxTalk
        } else {
            Self::Misc
        }
    }
}

bitflags! {
    /// Independent boolean facets of an agenda item.
    ///
    /// Serializes as the set flag names joined with `|`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ItemFlags: u8 {
        /// The session is streamed live.
        const HAS_LIVESTREAM = 0b0000_0001;
        /// Fixed program item the resolver never reshapes.
        const NOT_REMOVABLE = 0b0000_0010;
        /// Overlaps an earlier session on the agenda.
        const CONFLICTS_WITH_PREVIOUS = 0b0000_0100;
        /// Overlaps a later session on the agenda.
        const CONFLICTS_WITH_NEXT = 0b0000_1000;
    }
}

impl Default for ItemFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// One row of a personal agenda.
///
/// Intervals are half-open: `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub kind: ItemKind,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Present only for [`ItemKind::Session`] rows that map to a real session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Number of bookable sessions inside a free block.
    #[serde(default)]
    pub session_count: u32,
    #[serde(default)]
    pub flags: ItemFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SessionFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_tag: Option<String>,
}

impl AgendaItem {
    fn new(
        kind: ItemKind,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            start_time,
            end_time,
            title: title.into(),
            subtitle: None,
            session_id: None,
            session_count: 0,
            flags: ItemFlags::empty(),
            room: None,
            format: None,
            main_tag: None,
        }
    }

    /// A free time placeholder.
    pub fn free(title: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self::new(ItemKind::Free, title, start_time, end_time)
    }

    /// A session on the personal schedule. Fixed items are never removable.
    pub fn session(
        session_id: SessionId,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let mut item = Self::new(ItemKind::Session, title, start_time, end_time);
        item.session_id = Some(session_id);
        item.flags = ItemFlags::NOT_REMOVABLE;
        item
    }

    /// A scheduled break.
    pub fn scheduled_break(
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let mut item = Self::new(ItemKind::Break, title, start_time, end_time);
        item.flags = ItemFlags::NOT_REMOVABLE;
        item
    }

    /// A fixed program block (break or keynote) built from its block type.
    pub fn fixed_block(
        block_type: &str,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let kind = ItemKind::from_block_type(block_type)?;
        let mut item = Self::new(kind, title, start_time, end_time);
        if !kind.is_mutable() {
            item.flags = ItemFlags::NOT_REMOVABLE;
        }
        Ok(item)
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Length of the interval. Negative for malformed items.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Returns true if the interval is empty or inverted.
    pub fn is_degenerate(&self) -> bool {
        self.end_time <= self.start_time
    }

    pub const fn has_flag(&self, flag: ItemFlags) -> bool {
        self.flags.contains(flag)
    }

    pub const fn conflicts_with_previous(&self) -> bool {
        self.has_flag(ItemFlags::CONFLICTS_WITH_PREVIOUS)
    }

    pub const fn conflicts_with_next(&self) -> bool {
        self.has_flag(ItemFlags::CONFLICTS_WITH_NEXT)
    }
}

impl fmt::Display for AgendaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} - {}) {}",
            self.kind,
            self.start_time.format("%Y-%m-%dT%H:%M"),
            self.end_time.format("%H:%M"),
            self.title
        )
    }
}

/// Formats the subtitle shown under a session row.
///
/// Joins the room and speaker names, skipping whichever is missing.
pub fn format_session_subtitle(room: Option<&str>, speakers: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [room, speakers]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" / "))
    }
}
