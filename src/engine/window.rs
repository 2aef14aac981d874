//! Trailing-window aggregation and report-row formatting.

use chrono::{DateTime, Duration, Utc};

use crate::model::{ReportRow, StatusInterval};

/// Sum clipped up/down durations inside the three trailing windows ending
/// at `now` and format the row.
///
/// Hour-window metrics are minutes, day- and week-window metrics hours,
/// each rounded to two decimal places. Intervals straddling a window
/// boundary contribute only their overlapping part.
pub fn aggregate(store_id: &str, clipped: &[StatusInterval], now: DateTime<Utc>) -> ReportRow {
    let (up_hour, down_hour) = overlap_totals(clipped, now - Duration::hours(1), now);
    let (up_day, down_day) = overlap_totals(clipped, now - Duration::days(1), now);
    let (up_week, down_week) = overlap_totals(clipped, now - Duration::weeks(1), now);

    ReportRow {
        store_id: store_id.to_string(),
        uptime_last_hour: round2(minutes(up_hour)),
        uptime_last_day: round2(hours(up_day)),
        uptime_last_week: round2(hours(up_week)),
        downtime_last_hour: round2(minutes(down_hour)),
        downtime_last_day: round2(hours(down_day)),
        downtime_last_week: round2(hours(down_week)),
    }
}

/// Up/down durations of `clipped` overlapping `[window_start, window_end)`.
fn overlap_totals(
    clipped: &[StatusInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> (Duration, Duration) {
    let mut up = Duration::zero();
    let mut down = Duration::zero();

    for interval in clipped {
        let start = interval.start.max(window_start);
        let end = interval.end.min(window_end);
        if start >= end {
            continue;
        }
        if interval.status.is_up() {
            up = up + (end - start);
        } else {
            down = down + (end - start);
        }
    }

    (up, down)
}

fn minutes(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 60_000.0
}

fn hours(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 3_600_000.0
}

/// Uniform rounding rule for all six report metrics.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PollStatus;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 25, h, m, 0).unwrap()
    }

    fn interval(start: DateTime<Utc>, end: DateTime<Utc>, status: PollStatus) -> StatusInterval {
        StatusInterval { start, end, status }
    }

    #[test]
    fn test_empty_partition_is_all_zero() {
        let row = aggregate("s1", &[], ts(12, 0));
        assert_eq!(row.uptime_last_hour, 0.0);
        assert_eq!(row.downtime_last_week, 0.0);
    }

    #[test]
    fn test_units_per_window() {
        // 90 minutes up immediately before now.
        let clipped = vec![interval(ts(10, 30), ts(12, 0), PollStatus::Active)];
        let row = aggregate("s1", &clipped, ts(12, 0));

        // Hour window sees its last 60 minutes, in minutes.
        assert_eq!(row.uptime_last_hour, 60.0);
        // Day and week windows see all of it, in hours.
        assert_eq!(row.uptime_last_day, 1.5);
        assert_eq!(row.uptime_last_week, 1.5);
        assert_eq!(row.downtime_last_day, 0.0);
    }

    #[test]
    fn test_boundary_straddling_interval_contributes_fraction() {
        // 30 minutes down of which only 15 fall inside the hour window.
        let clipped = vec![interval(ts(10, 45), ts(11, 15), PollStatus::Inactive)];
        let row = aggregate("s1", &clipped, ts(12, 0));
        assert_eq!(row.downtime_last_hour, 15.0);
        assert_eq!(row.downtime_last_day, 0.5);
    }

    #[test]
    fn test_rounding_is_two_decimal_places() {
        // 100 seconds = 1.666... minutes -> 1.67; in hours 0.02777 -> 0.03.
        let clipped = vec![interval(
            ts(11, 58),
            ts(11, 58) + Duration::seconds(100),
            PollStatus::Active,
        )];
        let row = aggregate("s1", &clipped, ts(12, 0));
        assert_eq!(row.uptime_last_hour, 1.67);
        assert_eq!(row.uptime_last_day, 0.03);
    }

    #[test]
    fn test_up_and_down_accumulate_independently() {
        let clipped = vec![
            interval(ts(9, 0), ts(10, 0), PollStatus::Active),
            interval(ts(10, 0), ts(11, 0), PollStatus::Inactive),
            interval(ts(11, 0), ts(12, 0), PollStatus::Active),
        ];
        let row = aggregate("s1", &clipped, ts(12, 0));
        assert_eq!(row.uptime_last_day, 2.0);
        assert_eq!(row.downtime_last_day, 1.0);
        assert_eq!(row.uptime_last_hour, 60.0);
        assert_eq!(row.downtime_last_hour, 0.0);
    }
}
