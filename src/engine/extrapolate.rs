//! Nearest-preceding-sample extrapolation.
//!
//! Each poll's status is assumed to hold from its instant until the next
//! poll (exclusive); the last poll's status holds to `now`. This forward
//! rule — rather than, say, splitting the gap at its midpoint — is the
//! contract the whole report is built on, so it is pinned down here and in
//! the tests.

use chrono::{DateTime, Utc};

use crate::engine::timeline::StoreTimeline;
use crate::model::{PollStatus, StatusInterval};

/// Status assumed when no poll gives any signal: an unobserved store is
/// counted as down.
pub const NO_SIGNAL_STATUS: PollStatus = PollStatus::Inactive;

/// Expand a store's timeline into a gap-free partition of
/// `[horizon_start, now)`.
///
/// The stretch before the first in-horizon sample takes the seed poll's
/// status when the timeline carries one, and [`NO_SIGNAL_STATUS`]
/// otherwise. Adjacent intervals with equal status are merged and empty
/// intervals dropped, so the result is canonical: non-empty, ordered,
/// non-overlapping, alternating in status, tiling the horizon exactly.
pub fn extrapolate(
    timeline: &StoreTimeline,
    horizon_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<StatusInterval> {
    if horizon_start >= now {
        return Vec::new();
    }

    let leading_status = timeline.seed.unwrap_or(NO_SIGNAL_STATUS);

    let mut intervals = Vec::with_capacity(timeline.samples.len() + 1);
    let mut cursor = horizon_start;
    let mut status = leading_status;

    for &(instant, sample_status) in &timeline.samples {
        push_merged(
            &mut intervals,
            StatusInterval {
                start: cursor,
                end: instant,
                status,
            },
        );
        cursor = instant;
        status = sample_status;
    }

    push_merged(
        &mut intervals,
        StatusInterval {
            start: cursor,
            end: now,
            status,
        },
    );

    intervals
}

/// Append an interval, merging into the previous one when the status
/// matches and dropping it when empty.
fn push_merged(intervals: &mut Vec<StatusInterval>, interval: StatusInterval) {
    if interval.start >= interval.end {
        return;
    }
    match intervals.last_mut() {
        Some(last) if last.status == interval.status && last.end == interval.start => {
            last.end = interval.end;
        }
        _ => intervals.push(interval),
    }
}
