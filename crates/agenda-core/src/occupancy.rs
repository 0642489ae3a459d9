//! Occupancy counting for free blocks.
//!
//! Annotates each free block with the number of bookable sessions that start
//! inside it, then prunes blocks that offer nothing or are already over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AgendaItem, ItemKind};

/// Number of not-yet-scheduled sessions starting at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalCount {
    pub interval_start: DateTime<Utc>,
    pub count: u32,
}

/// Renders the subtitle of a free block from its session count.
///
/// Implementations own pluralization and locale.
pub trait SubtitleFormatter {
    fn free_block_subtitle(&self, session_count: u32) -> String;
}

/// Plural templates with a `{count}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluralTemplates {
    /// Used when the count is exactly one.
    pub one: String,
    /// Used for every other count.
    pub other: String,
}

impl Default for PluralTemplates {
    fn default() -> Self {
        Self {
            one: "{count} session available".to_string(),
            other: "{count} sessions available".to_string(),
        }
    }
}

impl SubtitleFormatter for PluralTemplates {
    fn free_block_subtitle(&self, session_count: u32) -> String {
        let template = if session_count == 1 {
            &self.one
        } else {
            &self.other
        };
        template.replace("{count}", &session_count.to_string())
    }
}

/// Fills session counts for free blocks and prunes the ones not worth showing.
///
/// Counts already on free blocks are discarded. A count applies to every free
/// block with `start <= interval_start < end`; totals saturate at `u32::MAX`.
/// Free blocks that ended before `now` or contain no sessions are removed;
/// other items keep their relative order. Survivors get a subtitle from
/// `subtitles`.
pub fn count_sessions<F: SubtitleFormatter + ?Sized>(
    items: &mut Vec<AgendaItem>,
    counts: &[IntervalCount],
    now: DateTime<Utc>,
    subtitles: &F,
) {
    if !items.iter().any(|item| item.kind == ItemKind::Free) {
        return;
    }

    for item in items.iter_mut().filter(|item| item.kind == ItemKind::Free) {
        item.session_count = 0;
    }

    for interval in counts {
        for item in items.iter_mut().filter(|item| item.kind == ItemKind::Free) {
            if item.start_time <= interval.interval_start && interval.interval_start < item.end_time
            {
                item.session_count = item.session_count.saturating_add(interval.count);
            }
        }
    }

    items.retain(|item| {
        if item.kind != ItemKind::Free {
            return true;
        }
        if item.end_time < now {
            debug!(item = %item, "removing free block in the past");
            false
        } else if item.session_count == 0 {
            debug!(item = %item, "removing free block with zero sessions");
            false
        } else {
            true
        }
    });

    for item in items.iter_mut().filter(|item| item.kind == ItemKind::Free) {
        item.subtitle = Some(subtitles.free_block_subtitle(item.session_count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::SessionId;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    fn count(hour: u32, minute: u32, count: u32) -> IntervalCount {
        IntervalCount {
            interval_start: at(hour, minute),
            count,
        }
    }

    fn early_morning() -> DateTime<Utc> {
        at(6, 0)
    }

    #[test]
    fn test_counts_sessions_starting_inside_block() {
        let mut items = vec![
            AgendaItem::free("Free", at(9, 0), at(10, 0)),
            AgendaItem::free("Free", at(11, 0), at(12, 0)),
        ];
        let counts = [count(9, 0, 2), count(9, 30, 3), count(10, 0, 7), count(11, 30, 1)];

        count_sessions(&mut items, &counts, early_morning(), &PluralTemplates::default());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].session_count, 5);
        assert_eq!(items[0].subtitle.as_deref(), Some("5 sessions available"));
        assert_eq!(items[1].session_count, 1);
        assert_eq!(items[1].subtitle.as_deref(), Some("1 session available"));
    }

    #[test]
    fn test_count_applies_to_every_matching_block() {
        let mut items = vec![
            AgendaItem::free("Free", at(9, 0), at(10, 0)),
            AgendaItem::free("Overlapping free", at(9, 15), at(10, 30)),
        ];
        count_sessions(
            &mut items,
            &[count(9, 20, 4)],
            early_morning(),
            &PluralTemplates::default(),
        );
        assert_eq!(items[0].session_count, 4);
        assert_eq!(items[1].session_count, 4);
    }

    #[test]
    fn test_empty_and_past_blocks_are_removed() {
        let session = AgendaItem::session(
            SessionId::new("s1").unwrap(),
            "Talk",
            at(10, 0),
            at(11, 0),
        );
        let mut items = vec![
            AgendaItem::free("Past", at(7, 0), at(8, 0)),
            AgendaItem::free("Empty", at(9, 0), at(10, 0)),
            session.clone(),
            AgendaItem::free("Open", at(11, 0), at(12, 0)),
        ];
        let counts = [count(7, 0, 3), count(11, 0, 2)];

        count_sessions(&mut items, &counts, at(8, 30), &PluralTemplates::default());

        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Talk", "Open"]);
        assert_eq!(items[0], session);
    }

    #[test]
    fn test_block_ending_exactly_now_is_kept() {
        let mut items = vec![AgendaItem::free("Free", at(9, 0), at(10, 0))];
        count_sessions(
            &mut items,
            &[count(9, 0, 1)],
            at(10, 0),
            &PluralTemplates::default(),
        );
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_no_free_blocks_is_noop() {
        let session = AgendaItem::session(
            SessionId::new("s1").unwrap(),
            "Talk",
            at(10, 0),
            at(11, 0),
        );
        let mut items = vec![session.clone()];
        count_sessions(&mut items, &[count(10, 0, 5)], at(23, 0), &PluralTemplates::default());
        assert_eq!(items, vec![session]);
    }

    #[test]
    fn test_counts_saturate_instead_of_overflowing() {
        let mut items = vec![AgendaItem::free("Free", at(9, 0), at(10, 0))];
        count_sessions(
            &mut items,
            &[count(9, 0, u32::MAX), count(9, 30, 1)],
            early_morning(),
            &PluralTemplates::default(),
        );
        assert_eq!(items[0].session_count, u32::MAX);
    }

    #[test]
    fn test_stale_counts_are_discarded() {
        let mut stale = AgendaItem::free("Stale", at(9, 0), at(10, 0));
        stale.session_count = 3;
        let mut recounted = AgendaItem::free("Recounted", at(11, 0), at(12, 0));
        recounted.session_count = 5;
        let mut items = vec![stale, recounted];

        count_sessions(
            &mut items,
            &[count(11, 0, 2)],
            early_morning(),
            &PluralTemplates::default(),
        );

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Recounted");
        assert_eq!(items[0].session_count, 2);
        assert_eq!(items[0].subtitle.as_deref(), Some("2 sessions available"));
    }

    #[test]
    fn test_custom_templates() {
        let templates = PluralTemplates {
            one: "una sesión".to_string(),
            other: "{count} sesiones".to_string(),
        };
        assert_eq!(templates.free_block_subtitle(1), "una sesión");
        assert_eq!(templates.free_block_subtitle(0), "0 sesiones");
        assert_eq!(templates.free_block_subtitle(12), "12 sesiones");
    }
}
