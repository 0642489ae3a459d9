//! Interval comparisons shared by the resolver and the occupancy counter.
//!
//! All intervals are half-open. The tolerant variants shrink each side of the
//! overlap by `tolerance_ms`, so back-to-back sessions that run a few minutes
//! long are not reported as overlapping.

use chrono::{DateTime, Duration, Utc};

use crate::AgendaItem;

/// Returns true if `a` and `b` overlap by more than `tolerance_ms`.
///
/// The relation is symmetric. Use a tolerance of zero for strict overlap.
pub fn intersects(a: &AgendaItem, b: &AgendaItem, tolerance_ms: i64) -> bool {
    let tolerance = Duration::milliseconds(tolerance_ms);
    b.end_time > a.start_time + tolerance && b.start_time + tolerance < a.end_time
}

/// Returns true if `inner` lies entirely within `outer`.
pub fn is_contained_in(inner: &AgendaItem, outer: &AgendaItem) -> bool {
    inner.start_time >= outer.start_time && inner.end_time <= outer.end_time
}

/// Returns true if `[start, end)` lasts at least `minimum_ms`.
pub fn is_long_enough(start: DateTime<Utc>, end: DateTime<Utc>, minimum_ms: i64) -> bool {
    end - start >= Duration::milliseconds(minimum_ms)
}

/// Returns true if the two items start within `tolerance_ms` of each other.
pub fn starts_together(a: &AgendaItem, b: &AgendaItem, tolerance_ms: i64) -> bool {
    (a.start_time - b.start_time).num_milliseconds().abs() <= tolerance_ms
}
