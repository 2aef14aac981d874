//! CSV ingestion.
//!
//! Loads the three source files into storage as one snapshot:
//!
//! - `store_status.csv`: `store_id,status,timestamp_utc`
//! - `menu_hours.csv`: `store_id,dayOfWeek,start_time_local,end_time_local`
//! - `timezones.csv`: `store_id,timezone_str`
//!
//! Columns are matched by header name, so column order is free. Poll
//! timestamps come in a few shapes in the wild (`2023-01-25
//! 18:13:22.47922 UTC`, the same without the suffix, RFC 3339); all are
//! accepted. A row that does not parse rejects the whole import with the
//! file and row in the error, rather than loading a partial snapshot.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::info;

use crate::model::{BusinessWindow, PollStatus, StatusPoll, StoreTimezone};
use crate::storage::Storage;

/// File names expected inside the data directory.
pub const STATUS_FILE: &str = "store_status.csv";
pub const HOURS_FILE: &str = "menu_hours.csv";
pub const TIMEZONES_FILE: &str = "timezones.csv";

/// What an import loaded, for startup logging and sanity checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub polls: usize,
    pub windows: usize,
    pub timezones: usize,
    /// Max observed poll instant; the analysis anchor for reports over
    /// this snapshot. `None` when the status file had no rows.
    pub max_poll_instant: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct StatusRecord {
    store_id: String,
    status: String,
    timestamp_utc: String,
}

#[derive(Debug, Deserialize)]
struct HoursRecord {
    store_id: String,
    #[serde(rename = "dayOfWeek")]
    day_of_week: u8,
    start_time_local: String,
    end_time_local: String,
}

#[derive(Debug, Deserialize)]
struct TimezoneRecord {
    store_id: String,
    timezone_str: String,
}

/// Read the three CSVs from `dir` and replace the stored snapshot.
pub async fn import_data_dir(storage: &Storage, dir: &Path) -> anyhow::Result<IngestSummary> {
    let polls = read_csv(&dir.join(STATUS_FILE), parse_status_csv)?;
    let windows = read_csv(&dir.join(HOURS_FILE), parse_hours_csv)?;
    let timezones = read_csv(&dir.join(TIMEZONES_FILE), parse_timezones_csv)?;

    let max_poll_instant = polls.iter().map(|p| p.timestamp_utc).max();

    storage.replace_dataset(&polls, &windows, &timezones).await?;

    let summary = IngestSummary {
        polls: polls.len(),
        windows: windows.len(),
        timezones: timezones.len(),
        max_poll_instant,
    };
    info!(
        polls = summary.polls,
        windows = summary.windows,
        timezones = summary.timezones,
        max_poll_instant = ?summary.max_poll_instant,
        "CSV snapshot imported"
    );
    Ok(summary)
}

fn read_csv<T>(
    path: &Path,
    parse: impl Fn(&mut dyn Read) -> anyhow::Result<Vec<T>>,
) -> anyhow::Result<Vec<T>> {
    let mut file =
        File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse(&mut file).with_context(|| format!("reading {}", path.display()))
}

fn parse_status_csv(input: &mut dyn Read) -> anyhow::Result<Vec<StatusPoll>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut polls = Vec::new();
    for (index, result) in reader.deserialize::<StatusRecord>().enumerate() {
        let row = index + 2; // 1-based, after the header
        let record = result.with_context(|| format!("row {row}"))?;
        let Some(status) = PollStatus::parse(record.status.trim()) else {
            bail!("row {row}: unknown status {:?}", record.status);
        };
        let timestamp_utc = parse_timestamp(&record.timestamp_utc)
            .with_context(|| format!("row {row}"))?;
        polls.push(StatusPoll {
            store_id: record.store_id,
            timestamp_utc,
            status,
        });
    }
    Ok(polls)
}

fn parse_hours_csv(input: &mut dyn Read) -> anyhow::Result<Vec<BusinessWindow>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut windows = Vec::new();
    for (index, result) in reader.deserialize::<HoursRecord>().enumerate() {
        let row = index + 2;
        let record = result.with_context(|| format!("row {row}"))?;
        if record.day_of_week > 6 {
            bail!("row {row}: dayOfWeek {} out of range", record.day_of_week);
        }
        windows.push(BusinessWindow {
            store_id: record.store_id,
            day_of_week: record.day_of_week,
            open: parse_local_time(&record.start_time_local)
                .with_context(|| format!("row {row}"))?,
            close: parse_local_time(&record.end_time_local)
                .with_context(|| format!("row {row}"))?,
        });
    }
    Ok(windows)
}

fn parse_timezones_csv(input: &mut dyn Read) -> anyhow::Result<Vec<StoreTimezone>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut timezones = Vec::new();
    for (index, result) in reader.deserialize::<TimezoneRecord>().enumerate() {
        let record = result.with_context(|| format!("row {}", index + 2))?;
        timezones.push(StoreTimezone {
            store_id: record.store_id,
            timezone: record.timezone_str.trim().to_string(),
        });
    }
    Ok(timezones)
}

/// Parse a poll timestamp. All accepted forms are UTC instants.
fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(" UTC").unwrap_or(trimmed);

    // %.f also matches an absent fractional part.
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    bail!("unrecognized timestamp {raw:?}")
}

/// Parse a local time of day, `HH:MM` or `HH:MM:SS`.
fn parse_local_time(raw: &str) -> anyhow::Result<NaiveTime> {
    let trimmed = raw.trim();
    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, format) {
            return Ok(time);
        }
    }
    bail!("unrecognized time of day {raw:?}")
}
