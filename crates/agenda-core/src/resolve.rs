//! Conflict resolution between the fixed program and free time placeholders.
//!
//! # Algorithm Summary
//!
//! 1. Trim, split, or delete free placeholders that overlap fixed items
//! 2. Flag sessions that overlap an earlier session
//! 3. Merge both lists and stable-sort by start time
//!
//! Fixed items (sessions, breaks) never change their time bounds. Breaks do not
//! reshape free blocks; whether a break applies to the attendee is decided
//! before resolution.

use tracing::{debug, warn};

use crate::interval::{intersects, is_contained_in, is_long_enough};
use crate::{AgendaItem, ItemFlags, ItemKind};

/// Overlap tolerated between two items before they count as intersecting.
pub const ALLOWED_OVERLAP_MS: i64 = 5 * 60 * 1000; // 5 minutes

/// Free blocks shorter than this after trimming are discarded.
pub const FREE_BLOCK_MINIMUM_MS: i64 = 10 * 60 * 1000; // 10 minutes

/// Configuration for conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Overlap absorbed by the tolerant intersection test.
    /// Default: 300000 (5 minutes).
    pub allowed_overlap_ms: i64,

    /// Shortest free block worth keeping.
    /// Default: 600000 (10 minutes).
    pub free_block_minimum_ms: i64,

    /// Whether overlapping sessions get conflict flags.
    pub check_conflicts: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allowed_overlap_ms: ALLOWED_OVERLAP_MS,
            free_block_minimum_ms: FREE_BLOCK_MINIMUM_MS,
            check_conflicts: true,
        }
    }
}

/// Resolves one day's worth of items into a single ordered agenda.
///
/// `mutable` holds free placeholders, `immutable` holds sessions and breaks.
/// Both are expected sorted by start time; they are re-sorted (stably) on
/// entry so that an unsorted caller still gets consistent conflict flags.
/// Items whose end does not follow their start are dropped.
///
/// # Returns
///
/// Free blocks and fixed items merged and sorted ascending by start time.
pub fn resolve(
    mutable: Vec<AgendaItem>,
    immutable: Vec<AgendaItem>,
    config: &ResolverConfig,
) -> Vec<AgendaItem> {
    let mut mutable = normalize(mutable);
    let mut immutable = normalize(immutable);

    mutable.retain(|item| {
        let keep = is_long_enough(item.start_time, item.end_time, config.free_block_minimum_ms);
        if !keep {
            debug!(item = %item, "dropping free block below minimum length");
        }
        keep
    });

    let mutable = move_mutables(mutable, &immutable, config);
    if config.check_conflicts {
        mark_conflicting(&mut immutable, config.allowed_overlap_ms);
    }

    let mut result = mutable;
    result.extend(immutable);
    sort_agenda(&mut result);
    result
}

/// Stable-sorts items ascending by start time.
///
/// Items with equal start times keep their relative order.
pub fn sort_agenda(items: &mut [AgendaItem]) {
    items.sort_by_key(|item| item.start_time);
}

/// Drops degenerate items and sorts the rest by start time.
fn normalize(items: Vec<AgendaItem>) -> Vec<AgendaItem> {
    let mut items: Vec<AgendaItem> = items
        .into_iter()
        .filter(|item| {
            if item.is_degenerate() {
                warn!(item = %item, "dropping item that ends before it starts");
                false
            } else {
                true
            }
        })
        .collect();
    sort_agenda(&mut items);
    items
}

/// Reshapes free blocks so they no longer overlap fixed items.
///
/// Each fixed item drains the current free list through a work queue. An item
/// popped from the queue is kept as is, trimmed, split into a head and a tail,
/// or deleted. Whatever survives (tails included) becomes the queue for the
/// next fixed item, so a later session can still cut a tail created earlier.
fn move_mutables(
    mutable: Vec<AgendaItem>,
    immutable: &[AgendaItem],
    config: &ResolverConfig,
) -> Vec<AgendaItem> {
    let tolerance = config.allowed_overlap_ms;
    let minimum = config.free_block_minimum_ms;
    let mut queue = mutable;

    for fixed in immutable {
        // Breaks (lunch, after hours) never move free blocks.
        if fixed.kind == ItemKind::Break {
            continue;
        }

        let mut kept = Vec::with_capacity(queue.len() + 1);
        for mut free in queue {
            if !intersects(fixed, &free, tolerance) {
                kept.push(free);
                continue;
            }

            if is_contained_in(&free, fixed) {
                debug!(free = %free, fixed = %fixed, "free block covered by fixed item");
                continue;
            }

            let mut split = None;
            if is_contained_in(fixed, &free) {
                if is_long_enough(fixed.end_time, free.end_time, minimum) {
                    let mut tail = free.clone();
                    tail.start_time = fixed.end_time;
                    split = Some(tail);
                }
                free.end_time = fixed.start_time;
            } else if free.start_time >= fixed.start_time {
                // Only the start falls inside the fixed item.
                free.start_time = fixed.end_time;
            } else {
                // Only the end falls inside the fixed item.
                free.end_time = fixed.start_time;
            }

            if is_long_enough(free.start_time, free.end_time, minimum) {
                kept.push(free);
            } else {
                debug!(free = %free, "dropping free block trimmed below minimum length");
            }
            if let Some(tail) = split {
                kept.push(tail);
            }
        }
        queue = kept;
    }

    queue
}

/// Flags sessions that overlap an earlier session.
///
/// Items must be sorted by start time. For each session, later sessions are
/// scanned until the first one that does not overlap it; other kinds are
/// skipped and never flagged.
fn mark_conflicting(items: &mut [AgendaItem], tolerance_ms: i64) {
    for i in 0..items.len() {
        let (head, tail) = items.split_at_mut(i + 1);
        let current = &mut head[i];
        if current.kind != ItemKind::Session {
            continue;
        }
        for other in tail.iter_mut() {
            if other.kind != ItemKind::Session {
                continue;
            }
            if intersects(other, current, tolerance_ms) {
                other.flags.insert(ItemFlags::CONFLICTS_WITH_PREVIOUS);
                current.flags.insert(ItemFlags::CONFLICTS_WITH_NEXT);
            } else {
                // Sorted by start, so nothing further can overlap.
                break;
            }
        }
    }
}
