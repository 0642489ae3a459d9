//! Agenda assembly pipeline.
//!
//! Fetches one day from an [`ItemSource`], resolves conflicts, counts free
//! block occupancy, and returns rows ready for display.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::interval::starts_together;
use crate::occupancy::{IntervalCount, PluralTemplates, count_sessions};
use crate::resolve::{ResolverConfig, resolve};
use crate::{AgendaItem, ItemKind};

/// Provider of the raw rows for a day.
///
/// This trait lets the pipeline run against different stores (e.g., the
/// `SQLite` database in agenda-db, or test fixtures). Windows are inclusive of
/// both `day_start` and `day_end` and select items by start time.
pub trait ItemSource {
    type Error;

    /// Sessions on the personal schedule plus fixed program blocks.
    fn fetch_fixed_items(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<AgendaItem>, Self::Error>;

    /// Free time placeholders covering gaps in the program.
    fn fetch_free_placeholders(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<AgendaItem>, Self::Error>;

    /// Sessions not on the personal schedule, grouped by start time.
    fn fetch_unscheduled_session_counts(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        live_streamed_only: bool,
    ) -> Result<Vec<IntervalCount>, Self::Error>;
}

/// Configuration for building an agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaConfig {
    pub resolver: ResolverConfig,

    /// Breaks only apply to attendees at the venue. Remote attendees never
    /// see them.
    pub attendee_at_venue: bool,

    /// Count only live streamed sessions when filling free blocks.
    pub live_streamed_only: bool,

    pub subtitles: PluralTemplates,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            attendee_at_venue: true,
            live_streamed_only: false,
            subtitles: PluralTemplates::default(),
        }
    }
}

/// Builds the personal agenda for `[day_start, day_end]`.
///
/// `now` decides which free blocks are already in the past.
pub fn build_agenda<S: ItemSource + ?Sized>(
    source: &S,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &AgendaConfig,
) -> Result<Vec<AgendaItem>, S::Error> {
    let mut fixed = source.fetch_fixed_items(day_start, day_end)?;
    let free = source.fetch_free_placeholders(day_start, day_end)?;

    if !config.attendee_at_venue {
        fixed.retain(|item| item.kind != ItemKind::Break);
    }
    debug!(
        fixed = fixed.len(),
        free = free.len(),
        "loaded items for agenda"
    );

    let mut items = resolve(free, fixed, &config.resolver);
    log_conflicts(&items, config.resolver.allowed_overlap_ms);

    if items.iter().any(|item| item.kind == ItemKind::Free) {
        let counts =
            source.fetch_unscheduled_session_counts(day_start, day_end, config.live_streamed_only)?;
        count_sessions(&mut items, &counts, now, &config.subtitles);
    }

    debug!(items = items.len(), "agenda built");
    Ok(items)
}

fn log_conflicts(items: &[AgendaItem], tolerance_ms: i64) {
    let mut previous: Option<&AgendaItem> = None;
    for item in items {
        if item.conflicts_with_previous() {
            match previous {
                Some(previous) if starts_together(item, previous, tolerance_ms) => {
                    debug!(item = %item, previous = %previous, "item starts together with previous");
                }
                Some(previous) => {
                    debug!(item = %item, previous = %previous, "item conflicts with previous");
                }
                None => debug!(item = %item, "item conflicts with previous"),
            }
        }
        previous = Some(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    use chrono::TimeZone;

    use crate::SessionId;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    /// In-memory source with call tracking.
    #[derive(Default)]
    struct TestSource {
        fixed: Vec<AgendaItem>,
        free: Vec<AgendaItem>,
        counts: Vec<IntervalCount>,
        live_counts: Vec<IntervalCount>,
        count_calls: Cell<usize>,
    }

    impl ItemSource for TestSource {
        type Error = Infallible;

        fn fetch_fixed_items(
            &self,
            _day_start: DateTime<Utc>,
            _day_end: DateTime<Utc>,
        ) -> Result<Vec<AgendaItem>, Self::Error> {
            Ok(self.fixed.clone())
        }

        fn fetch_free_placeholders(
            &self,
            _day_start: DateTime<Utc>,
            _day_end: DateTime<Utc>,
        ) -> Result<Vec<AgendaItem>, Self::Error> {
            Ok(self.free.clone())
        }

        fn fetch_unscheduled_session_counts(
            &self,
            _day_start: DateTime<Utc>,
            _day_end: DateTime<Utc>,
            live_streamed_only: bool,
        ) -> Result<Vec<IntervalCount>, Self::Error> {
            self.count_calls.set(self.count_calls.get() + 1);
            if live_streamed_only {
                Ok(self.live_counts.clone())
            } else {
                Ok(self.counts.clone())
            }
        }
    }

    fn session(id: &str, start: (u32, u32), end: (u32, u32)) -> AgendaItem {
        AgendaItem::session(
            SessionId::new(id).unwrap(),
            format!("Session {id}"),
            at(start.0, start.1),
            at(end.0, end.1),
        )
    }

    fn conference_day() -> TestSource {
        TestSource {
            fixed: vec![
                session("a", (9, 30), (9, 50)),
                AgendaItem::scheduled_break("Lunch", at(12, 0), at(13, 0)),
                session("b", (13, 0), (14, 0)),
                session("c", (13, 30), (14, 30)),
            ],
            free: vec![
                AgendaItem::free("Free time", at(9, 0), at(11, 0)),
                AgendaItem::free("Free time", at(15, 0), at(16, 0)),
            ],
            counts: vec![
                IntervalCount {
                    interval_start: at(10, 0),
                    count: 4,
                },
                IntervalCount {
                    interval_start: at(15, 0),
                    count: 2,
                },
            ],
            live_counts: vec![IntervalCount {
                interval_start: at(10, 0),
                count: 1,
            }],
            ..TestSource::default()
        }
    }

    fn summary(items: &[AgendaItem]) -> Vec<(ItemKind, DateTime<Utc>, u32)> {
        items
            .iter()
            .map(|i| (i.kind, i.start_time, i.session_count))
            .collect()
    }

    #[test]
    fn test_full_pipeline() {
        let source = conference_day();
        let items = build_agenda(
            &source,
            at(0, 0),
            at(23, 59),
            at(8, 0),
            &AgendaConfig::default(),
        )
        .unwrap();

        // The head of the split block has no sessions and is pruned.
        assert_eq!(
            summary(&items),
            vec![
                (ItemKind::Session, at(9, 30), 0),
                (ItemKind::Free, at(9, 50), 4),
                (ItemKind::Break, at(12, 0), 0),
                (ItemKind::Session, at(13, 0), 0),
                (ItemKind::Session, at(13, 30), 0),
                (ItemKind::Free, at(15, 0), 2),
            ]
        );
        assert!(items[4].conflicts_with_previous());
        assert!(items[3].conflicts_with_next());
        assert_eq!(items[1].subtitle.as_deref(), Some("4 sessions available"));
        assert_eq!(source.count_calls.get(), 1);
    }

    #[test]
    fn test_remote_attendee_does_not_see_breaks() {
        let source = conference_day();
        let config = AgendaConfig {
            attendee_at_venue: false,
            ..AgendaConfig::default()
        };
        let items = build_agenda(&source, at(0, 0), at(23, 59), at(8, 0), &config).unwrap();
        assert!(items.iter().all(|i| i.kind != ItemKind::Break));
    }

    #[test]
    fn test_live_streamed_only_counts() {
        let source = conference_day();
        let config = AgendaConfig {
            live_streamed_only: true,
            ..AgendaConfig::default()
        };
        let items = build_agenda(&source, at(0, 0), at(23, 59), at(8, 0), &config).unwrap();
        let free: Vec<u32> = items
            .iter()
            .filter(|i| i.kind == ItemKind::Free)
            .map(|i| i.session_count)
            .collect();
        assert_eq!(free, vec![1]);
    }

    #[test]
    fn test_past_free_blocks_are_pruned() {
        let source = conference_day();
        let items = build_agenda(
            &source,
            at(0, 0),
            at(23, 59),
            at(12, 0),
            &AgendaConfig::default(),
        )
        .unwrap();
        let free_starts: Vec<DateTime<Utc>> = items
            .iter()
            .filter(|i| i.kind == ItemKind::Free)
            .map(|i| i.start_time)
            .collect();
        assert_eq!(free_starts, vec![at(15, 0)]);
    }

    #[test]
    fn test_counts_skipped_without_free_blocks() {
        let source = TestSource {
            fixed: vec![session("a", (9, 0), (10, 0))],
            ..TestSource::default()
        };
        let items = build_agenda(
            &source,
            at(0, 0),
            at(23, 59),
            at(8, 0),
            &AgendaConfig::default(),
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(source.count_calls.get(), 0);
    }

    #[test]
    fn test_sessions_starting_together_are_both_kept() {
        let source = TestSource {
            fixed: vec![
                session("a", (9, 0), (10, 0)),
                session("b", (9, 3), (9, 45)),
            ],
            ..TestSource::default()
        };
        let items = build_agenda(
            &source,
            at(0, 0),
            at(23, 59),
            at(8, 0),
            &AgendaConfig::default(),
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].conflicts_with_next());
        assert!(items[1].conflicts_with_previous());
        assert!(starts_together(
            &items[0],
            &items[1],
            AgendaConfig::default().resolver.allowed_overlap_ms
        ));
    }
}
