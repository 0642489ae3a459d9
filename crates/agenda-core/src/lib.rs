//! Core domain logic for the conference agenda.
//!
//! This crate contains the fundamental types and logic for:
//! - Resolution: merging fixed program items with free time placeholders
//! - Occupancy: counting bookable sessions inside free blocks
//! - Assembly: running both passes over a day fetched from an [`ItemSource`]

mod agenda;
pub mod interval;
mod item;
mod occupancy;
mod resolve;

pub use agenda::{AgendaConfig, ItemSource, build_agenda};
pub use item::{
    AgendaItem, ItemFlags, ItemKind, SessionFormat, SessionId, ValidationError,
    format_session_subtitle,
};
pub use occupancy::{IntervalCount, PluralTemplates, SubtitleFormatter, count_sessions};
pub use resolve::{
    ALLOWED_OVERLAP_MS, FREE_BLOCK_MINIMUM_MS, ResolverConfig, resolve, sort_agenda,
};
