//! Business-hours clipping.
//!
//! Local open/close windows only become absolute instants here, and the
//! conversion looks up the store timezone's rules for each specific local
//! date. A window on a DST transition day therefore covers its real
//! duration (an hour shorter or longer in UTC than on a plain day) instead
//! of drifting by a cached offset.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::engine::hours::{BusinessWindowIndex, SECONDS_PER_DAY};
use crate::model::StatusInterval;

/// Absolute business-open intervals for a store over `[range_start,
/// range_end)`, sorted and non-overlapping.
///
/// Every local calendar day touched by the range contributes its weekday's
/// merged windows, converted per-date to UTC and trimmed to the range.
pub fn business_open_intervals(
    index: &BusinessWindowIndex,
    store_id: &str,
    tz: Tz,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    if range_start >= range_end {
        return Vec::new();
    }

    let first_day = range_start.with_timezone(&tz).date_naive();
    let last_day = range_end.with_timezone(&tz).date_naive();

    let mut open = Vec::new();
    let mut day = first_day;
    loop {
        for window in index.windows_for(store_id, day.weekday()) {
            let start = resolve_local(tz, local_instant(day, window.start_secs));
            let end = resolve_local(tz, local_instant(day, window.end_secs));
            let start = start.max(range_start);
            let end = end.min(range_end);
            if start < end {
                open.push((start, end));
            }
        }
        if day >= last_day {
            break;
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }

    // Windows from consecutive days can touch (a 24/7 synthetic window
    // always does); coalesce so consumers see disjoint intervals.
    open.sort_by_key(|(start, _)| *start);
    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(open.len());
    for (start, end) in open {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Intersect an extrapolated partition with sorted business-open intervals,
/// keeping the up/down labels.
pub fn clip_to_open_intervals(
    partition: &[StatusInterval],
    open: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<StatusInterval> {
    let mut clipped = Vec::new();
    let mut next_open = 0;

    for segment in partition {
        while next_open < open.len() && open[next_open].1 <= segment.start {
            next_open += 1;
        }
        let mut i = next_open;
        while i < open.len() && open[i].0 < segment.end {
            let start = segment.start.max(open[i].0);
            let end = segment.end.min(open[i].1);
            if start < end {
                clipped.push(StatusInterval {
                    start,
                    end,
                    status: segment.status,
                });
            }
            if open[i].1 >= segment.end {
                break;
            }
            i += 1;
        }
    }

    clipped
}

/// Local naive instant for an offset within a civil day; `86_400` means
/// midnight of the following day.
fn local_instant(day: NaiveDate, secs: u32) -> NaiveDateTime {
    if secs >= SECONDS_PER_DAY {
        day.succ_opt().unwrap_or(day).and_time(NaiveTime::MIN)
    } else {
        let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN);
        day.and_time(time)
    }
}

/// Map a local wall time to UTC under the zone's rules for that date.
///
/// Ambiguous times (fall-back) take the earlier instant. Nonexistent times
/// (spring-forward gap) probe forward in 30-minute steps to the first wall
/// time that exists again.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            let mut probe = naive;
            loop {
                probe += Duration::minutes(30);
                match tz.from_local_datetime(&probe) {
                    LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                        return dt.with_timezone(&Utc);
                    }
                    LocalResult::None => {}
                }
            }
        }
    }
}
