//! Business-hour window index.
//!
//! Windows are kept as seconds-from-local-midnight so a full day can be
//! expressed as `[0, 86400)`, which `NaiveTime` cannot. The index validates,
//! sorts and merges the configured windows once, so every consumer sees a
//! sorted, non-overlapping sequence per weekday.

use std::collections::HashMap;

use chrono::{Timelike, Weekday};

use crate::engine::EngineError;
use crate::model::BusinessWindow;

/// Seconds in a civil day (local clock, ignoring DST; the clipper applies
/// the real per-date offsets).
pub const SECONDS_PER_DAY: u32 = 86_400;

/// One open interval within a local day, `[start_secs, end_secs)` from
/// local midnight. `end_secs` may be `86_400` (end of day).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalWindow {
    pub start_secs: u32,
    pub end_secs: u32,
}

/// Synthetic window for stores with no configured hours anywhere: always open.
const FULL_DAY: &[LocalWindow] = &[LocalWindow {
    start_secs: 0,
    end_secs: SECONDS_PER_DAY,
}];

/// Per-store, per-weekday open windows.
///
/// A store with no records at all is treated as open 24/7. A store with
/// records on some weekdays only is closed on the others — the synthetic
/// full-day window applies at the store level, never per day.
#[derive(Debug)]
pub struct BusinessWindowIndex {
    by_store: HashMap<String, [Vec<LocalWindow>; 7]>,
}

impl BusinessWindowIndex {
    /// Build and validate the index.
    ///
    /// A window with `open == close` is empty and contributes nothing (but
    /// still marks the store as configured). `open > close` is rejected:
    /// overnight windows are not supported and are not guessed at.
    pub fn new(records: &[BusinessWindow]) -> Result<Self, EngineError> {
        let mut by_store: HashMap<String, [Vec<LocalWindow>; 7]> = HashMap::new();

        for record in records {
            if record.day_of_week > 6 || record.open > record.close {
                return Err(EngineError::InvalidBusinessWindow {
                    store_id: record.store_id.clone(),
                    day_of_week: record.day_of_week,
                    open: record.open,
                    close: record.close,
                });
            }

            let days = by_store.entry(record.store_id.clone()).or_default();
            if record.open == record.close {
                continue;
            }
            days[record.day_of_week as usize].push(LocalWindow {
                start_secs: record.open.num_seconds_from_midnight(),
                end_secs: record.close.num_seconds_from_midnight(),
            });
        }

        for days in by_store.values_mut() {
            for windows in days.iter_mut() {
                merge_windows(windows);
            }
        }

        Ok(Self { by_store })
    }

    /// True when the store has no configured windows on any weekday.
    pub fn is_always_open(&self, store_id: &str) -> bool {
        !self.by_store.contains_key(store_id)
    }

    /// Sorted, non-overlapping open windows for the store on the given
    /// weekday. Full-day for unconfigured stores, possibly empty for a
    /// configured store's day off.
    pub fn windows_for(&self, store_id: &str, weekday: Weekday) -> &[LocalWindow] {
        match self.by_store.get(store_id) {
            None => FULL_DAY,
            Some(days) => &days[weekday.num_days_from_monday() as usize],
        }
    }
}

/// Sort windows and coalesce overlapping or adjacent ones in place.
fn merge_windows(windows: &mut Vec<LocalWindow>) {
    windows.sort_by_key(|w| (w.start_secs, w.end_secs));
    let mut merged: Vec<LocalWindow> = Vec::with_capacity(windows.len());
    for window in windows.drain(..) {
        match merged.last_mut() {
            Some(last) if window.start_secs <= last.end_secs => {
                last.end_secs = last.end_secs.max(window.end_secs);
            }
            _ => merged.push(window),
        }
    }
    *windows = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn window(store_id: &str, dow: u8, open: (u32, u32), close: (u32, u32)) -> BusinessWindow {
        BusinessWindow {
            store_id: store_id.to_string(),
            day_of_week: dow,
            open: NaiveTime::from_hms_opt(open.0, open.1, 0).unwrap(),
            close: NaiveTime::from_hms_opt(close.0, close.1, 0).unwrap(),
        }
    }

    #[test]
    fn test_unconfigured_store_is_always_open() {
        let index = BusinessWindowIndex::new(&[]).unwrap();
        assert!(index.is_always_open("s1"));
        assert_eq!(index.windows_for("s1", Weekday::Tue), FULL_DAY);
    }

    #[test]
    fn test_configured_store_closed_on_other_days() {
        let index = BusinessWindowIndex::new(&[window("s1", 0, (9, 0), (17, 0))]).unwrap();
        assert!(!index.is_always_open("s1"));
        assert_eq!(index.windows_for("s1", Weekday::Mon).len(), 1);
        assert!(index.windows_for("s1", Weekday::Tue).is_empty());
    }

    #[test]
    fn test_unsorted_overlapping_windows_are_merged() {
        // Split shift entered out of order with an overlap: 12:00-15:00
        // then 09:00-13:00 should merge into 09:00-15:00.
        let index = BusinessWindowIndex::new(&[
            window("s1", 3, (12, 0), (15, 0)),
            window("s1", 3, (9, 0), (13, 0)),
            window("s1", 3, (18, 0), (22, 0)),
        ])
        .unwrap();

        let windows = index.windows_for("s1", Weekday::Thu);
        assert_eq!(
            windows,
            &[
                LocalWindow { start_secs: 9 * 3600, end_secs: 15 * 3600 },
                LocalWindow { start_secs: 18 * 3600, end_secs: 22 * 3600 },
            ]
        );
    }

    #[test]
    fn test_adjacent_windows_are_coalesced() {
        let index = BusinessWindowIndex::new(&[
            window("s1", 1, (9, 0), (12, 0)),
            window("s1", 1, (12, 0), (17, 0)),
        ])
        .unwrap();

        let windows = index.windows_for("s1", Weekday::Tue);
        assert_eq!(
            windows,
            &[LocalWindow { start_secs: 9 * 3600, end_secs: 17 * 3600 }]
        );
    }

    #[test]
    fn test_empty_window_contributes_nothing_but_marks_configured() {
        let index = BusinessWindowIndex::new(&[window("s1", 2, (10, 0), (10, 0))]).unwrap();
        assert!(!index.is_always_open("s1"));
        assert!(index.windows_for("s1", Weekday::Wed).is_empty());
    }

    #[test]
    fn test_overnight_window_is_rejected() {
        let err = BusinessWindowIndex::new(&[window("s1", 5, (22, 0), (6, 0))]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidBusinessWindow { .. }));
    }

    #[test]
    fn test_out_of_range_weekday_is_rejected() {
        let err = BusinessWindowIndex::new(&[window("s1", 7, (9, 0), (17, 0))]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidBusinessWindow { .. }));
    }
}
