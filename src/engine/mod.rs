//! Uptime/downtime estimation engine.
//!
//! The engine is a pure function of the three ingested record sets and an
//! explicit reference instant `now` (the max observed poll timestamp, so a
//! fixed input snapshot always reproduces the same report). Per store it:
//!
//! 1. resolves the timezone ([`timezone`]),
//! 2. orders and deduplicates the store's polls ([`timeline`]),
//! 3. extrapolates them into a gap-free up/down partition of the one-week
//!    analysis horizon ([`extrapolate`]),
//! 4. clips that partition to the store's business-open time, DST-correct
//!    ([`clip`] over [`hours`]),
//! 5. sums the clipped durations inside the trailing hour/day/week windows
//!    ([`window`]).
//!
//! Stores are fully independent; rows are emitted in store-id order. The
//! engine performs no I/O and touches no clocks.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use thiserror::Error;

use crate::model::{BusinessWindow, ReportRow, StatusPoll, StoreTimezone};

pub mod clip;
pub mod extrapolate;
pub mod hours;
pub mod timeline;
pub mod timezone;
pub mod window;

pub use hours::BusinessWindowIndex;
pub use timeline::ObservationTimeline;
pub use timezone::{DEFAULT_TIMEZONE, TimeZoneResolver};

/// Data errors surfaced by the engine.
///
/// Any of these aborts the whole report: the orchestrator records a single
/// terminal `Failed` state and no partial rows. A dataset with zero stores
/// is not an error; it produces an empty report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A store's configured timezone string is not a known IANA zone.
    /// Absence of a mapping is not an error (the default zone applies).
    #[error("store {store_id}: unrecognized timezone {value:?}")]
    MalformedTimezone { store_id: String, value: String },

    /// A business-hour window with `open > close`. Overnight (wraparound)
    /// windows are not supported; rejecting them is deliberate rather than
    /// guessing which side of midnight was meant.
    #[error(
        "store {store_id}: invalid business window {open}..{close} on weekday {day_of_week}"
    )]
    InvalidBusinessWindow {
        store_id: String,
        day_of_week: u8,
        open: NaiveTime,
        close: NaiveTime,
    },

    /// Unexpected internal fault during the pure computation.
    #[error("store {store_id}: {message}")]
    ComputationFailure { store_id: String, message: String },
}

/// Length of the analysis horizon (the widest trailing window).
pub fn analysis_horizon() -> Duration {
    Duration::weeks(1)
}

/// Run the full report: one row per store in the union of the three input
/// tables, store ids ascending.
///
/// `now` is the analysis anchor; all three trailing windows end at it and
/// the horizon is `[now - 1 week, now)`.
pub fn run_report(
    now: DateTime<Utc>,
    polls: &[StatusPoll],
    windows: &[BusinessWindow],
    timezones: &[StoreTimezone],
) -> Result<Vec<ReportRow>, EngineError> {
    let resolver = TimeZoneResolver::new(timezones);
    let index = BusinessWindowIndex::new(windows)?;
    let timeline = ObservationTimeline::new(polls);

    let mut store_ids: BTreeSet<&str> = BTreeSet::new();
    store_ids.extend(polls.iter().map(|p| p.store_id.as_str()));
    store_ids.extend(windows.iter().map(|w| w.store_id.as_str()));
    store_ids.extend(timezones.iter().map(|t| t.store_id.as_str()));

    let horizon_start = now - analysis_horizon();

    let mut rows = Vec::with_capacity(store_ids.len());
    for store_id in store_ids {
        rows.push(report_store(
            store_id,
            horizon_start,
            now,
            &resolver,
            &index,
            &timeline,
        )?);
    }
    Ok(rows)
}

/// Run the §2 pipeline for a single store.
fn report_store(
    store_id: &str,
    horizon_start: DateTime<Utc>,
    now: DateTime<Utc>,
    resolver: &TimeZoneResolver,
    index: &BusinessWindowIndex,
    timeline: &ObservationTimeline,
) -> Result<ReportRow, EngineError> {
    let tz = resolver.resolve(store_id)?;

    let store_timeline = timeline.polls_for(store_id, horizon_start, now);
    let partition = extrapolate::extrapolate(&store_timeline, horizon_start, now);

    // A store with no configured hours is open 24/7; clipping would be an
    // identity there, so pass the partition through unchanged.
    let clipped = if index.is_always_open(store_id) {
        partition
    } else {
        let open = clip::business_open_intervals(index, store_id, tz, horizon_start, now);
        clip::clip_to_open_intervals(&partition, &open)
    };

    Ok(window::aggregate(store_id, &clipped, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PollStatus;
    use chrono::{NaiveTime, TimeZone};

    fn poll(store_id: &str, ts: DateTime<Utc>, status: PollStatus) -> StatusPoll {
        StatusPoll {
            store_id: store_id.to_string(),
            timestamp_utc: ts,
            status,
        }
    }

    fn hhmm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_empty_dataset_yields_empty_report() {
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 12, 0, 0).unwrap();
        let rows = run_report(now, &[], &[], &[]).unwrap();
        assert!(rows.is_empty());
    }

    /// The worked example: polls up/down/up at 09/10/11 UTC, a 09:00-12:00
    /// window in a zero-offset zone, now = 12:00. Day window sees 2h up and
    /// 1h down.
    #[test]
    fn test_worked_example_day_window() {
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 12, 0, 0).unwrap();
        let polls = vec![
            poll("s1", Utc.with_ymd_and_hms(2023, 1, 25, 9, 0, 0).unwrap(), PollStatus::Active),
            poll("s1", Utc.with_ymd_and_hms(2023, 1, 25, 10, 0, 0).unwrap(), PollStatus::Inactive),
            poll("s1", Utc.with_ymd_and_hms(2023, 1, 25, 11, 0, 0).unwrap(), PollStatus::Active),
        ];
        // Same 09:00-12:00 window every day of the week, in UTC.
        let windows: Vec<BusinessWindow> = (0..7)
            .map(|dow| BusinessWindow {
                store_id: "s1".to_string(),
                day_of_week: dow,
                open: hhmm(9, 0),
                close: hhmm(12, 0),
            })
            .collect();
        let timezones = vec![StoreTimezone {
            store_id: "s1".to_string(),
            timezone: "UTC".to_string(),
        }];

        let rows = run_report(now, &polls, &windows, &timezones).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.store_id, "s1");
        assert_eq!(row.uptime_last_day, 2.0);
        assert_eq!(row.downtime_last_day, 1.0);
        // The last hour is the 11:00-12:00 up stretch.
        assert_eq!(row.uptime_last_hour, 60.0);
        assert_eq!(row.downtime_last_hour, 0.0);
    }

    /// A store with zero configured windows must behave exactly as one with
    /// an explicit 00:00-24:00 window on every day: clipping against the
    /// synthetic full-day coverage returns the partition unchanged, so the
    /// pass-through in `report_store` is equivalent, not a shortcut with
    /// different semantics.
    #[test]
    fn test_always_open_clipping_is_identity() {
        let now = Utc.with_ymd_and_hms(2023, 6, 14, 18, 0, 0).unwrap();
        let horizon_start = now - analysis_horizon();
        let polls = vec![
            poll("s1", Utc.with_ymd_and_hms(2023, 6, 10, 3, 30, 0).unwrap(), PollStatus::Active),
            poll("s1", Utc.with_ymd_and_hms(2023, 6, 12, 9, 15, 0).unwrap(), PollStatus::Inactive),
            poll("s1", Utc.with_ymd_and_hms(2023, 6, 14, 1, 0, 0).unwrap(), PollStatus::Active),
        ];

        let timeline = ObservationTimeline::new(&polls);
        let store_timeline = timeline.polls_for("s1", horizon_start, now);
        let partition = extrapolate::extrapolate(&store_timeline, horizon_start, now);

        let index = BusinessWindowIndex::new(&[]).unwrap();
        let open = clip::business_open_intervals(
            &index,
            "s1",
            chrono_tz::America::Chicago,
            horizon_start,
            now,
        );
        let clipped = clip::clip_to_open_intervals(&partition, &open);

        assert_eq!(clipped, partition);
    }

    #[test]
    fn test_zero_poll_store_reports_all_down() {
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 12, 0, 0).unwrap();
        // Store known only through the timezone table.
        let timezones = vec![StoreTimezone {
            store_id: "silent".to_string(),
            timezone: "UTC".to_string(),
        }];

        let rows = run_report(now, &[], &[], &timezones).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.uptime_last_hour, 0.0);
        assert_eq!(row.uptime_last_week, 0.0);
        assert_eq!(row.downtime_last_hour, 60.0);
        assert_eq!(row.downtime_last_day, 24.0);
        assert_eq!(row.downtime_last_week, 168.0);
    }

    #[test]
    fn test_malformed_timezone_aborts_report() {
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 12, 0, 0).unwrap();
        let timezones = vec![StoreTimezone {
            store_id: "s1".to_string(),
            timezone: "Not/AZone".to_string(),
        }];

        let err = run_report(now, &[], &[], &timezones).unwrap_err();
        assert_eq!(
            err,
            EngineError::MalformedTimezone {
                store_id: "s1".to_string(),
                value: "Not/AZone".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_window_aborts_report() {
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 12, 0, 0).unwrap();
        let windows = vec![BusinessWindow {
            store_id: "s1".to_string(),
            day_of_week: 2,
            open: hhmm(22, 0),
            close: hhmm(6, 0),
        }];

        let err = run_report(now, &[], &windows, &[]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidBusinessWindow { .. }));
    }

    #[test]
    fn test_rows_sorted_by_store_id() {
        let now = Utc.with_ymd_and_hms(2023, 1, 25, 12, 0, 0).unwrap();
        let polls = vec![
            poll("zeta", Utc.with_ymd_and_hms(2023, 1, 25, 11, 0, 0).unwrap(), PollStatus::Active),
            poll("alpha", Utc.with_ymd_and_hms(2023, 1, 25, 11, 0, 0).unwrap(), PollStatus::Active),
            poll("mid", Utc.with_ymd_and_hms(2023, 1, 25, 11, 0, 0).unwrap(), PollStatus::Inactive),
        ];

        let rows = run_report(now, &polls, &[], &[]).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.store_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    /// Business-open duration is monotone across the hour/day/week windows
    /// for a fixed `now`.
    #[test]
    fn test_open_duration_monotone_across_windows() {
        let now = Utc.with_ymd_and_hms(2023, 3, 8, 17, 0, 0).unwrap();
        let windows: Vec<BusinessWindow> = (0..7)
            .map(|dow| BusinessWindow {
                store_id: "s1".to_string(),
                day_of_week: dow,
                open: hhmm(9, 0),
                close: hhmm(17, 0),
            })
            .collect();
        let polls = vec![poll(
            "s1",
            Utc.with_ymd_and_hms(2023, 3, 2, 9, 0, 0).unwrap(),
            PollStatus::Active,
        )];
        let timezones = vec![StoreTimezone {
            store_id: "s1".to_string(),
            timezone: "UTC".to_string(),
        }];

        let rows = run_report(now, &polls, &windows, &timezones).unwrap();
        let row = &rows[0];
        let open_hour = row.uptime_last_hour + row.downtime_last_hour; // minutes
        let open_day = row.uptime_last_day + row.downtime_last_day; // hours
        let open_week = row.uptime_last_week + row.downtime_last_week; // hours
        assert!(open_hour / 60.0 <= open_day);
        assert!(open_day <= open_week);
    }
}
