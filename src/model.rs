//! Data models for Storewatch.
//!
//! Three ingested record kinds (status polls, business-hour windows, store
//! timezones), the derived interval/report types produced by the estimation
//! engine, and the request/response bodies of the HTTP API.
//!
//! All instants are UTC. Business-hour windows are local times of day and
//! only become absolute instants inside the engine, where the store's
//! timezone rules for the specific calendar date are applied.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Observed reachability of a store at a poll instant.
///
/// The ingestion CSV uses `active`/`inactive`; the engine treats these as
/// up/down respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// Store responded to the poll.
    Active,
    /// Store did not respond to the poll.
    Inactive,
}

impl PollStatus {
    /// True when this status counts toward uptime.
    pub fn is_up(self) -> bool {
        matches!(self, PollStatus::Active)
    }

    /// Parse the wire form used by the status CSV and the database.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PollStatus::Active),
            "inactive" => Some(PollStatus::Inactive),
            _ => None,
        }
    }

    /// Wire form stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            PollStatus::Active => "active",
            PollStatus::Inactive => "inactive",
        }
    }
}

/// A single reachability observation for a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPoll {
    /// Store identifier (opaque string, as ingested).
    pub store_id: String,

    /// Absolute instant of the poll.
    pub timestamp_utc: DateTime<Utc>,

    /// Observed status at that instant.
    pub status: PollStatus,
}

/// One configured business-hour window for a store on one weekday.
///
/// `day_of_week` follows the ingestion convention: 0 = Monday .. 6 = Sunday
/// (matching `chrono::Weekday::num_days_from_monday`). `open`/`close` are
/// local times of day in the store's timezone; windows never wrap past
/// midnight (`open > close` is rejected as malformed, see the engine's
/// error taxonomy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessWindow {
    pub store_id: String,
    pub day_of_week: u8,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// Store-to-IANA-timezone mapping.
///
/// At most one per store. Stores absent from this table default to
/// `America/Chicago`; a present but unparseable zone name is a data error,
/// never a silent default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTimezone {
    pub store_id: String,
    pub timezone: String,
}

/// A maximal run of constant status, half-open `[start, end)`.
///
/// Derived by the engine, never persisted. Before business-hour clipping a
/// store's intervals tile the analysis horizon exactly; after clipping they
/// cover only the business-open portions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: PollStatus,
}

impl StatusInterval {
    /// Length of the interval. Zero for degenerate (empty) intervals.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// One output record of a generated report.
///
/// Field order matches the report CSV header. Hour-window metrics are in
/// minutes, day- and week-window metrics in hours, all rounded to two
/// decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub store_id: String,
    pub uptime_last_hour: f64,
    pub uptime_last_day: f64,
    pub uptime_last_week: f64,
    pub downtime_last_hour: f64,
    pub downtime_last_day: f64,
    pub downtime_last_week: f64,
}

/// Lifecycle state of a triggered report.
///
/// `Complete` and `Failed` are terminal; a report id reaches at most one of
/// them, enforced by the storage layer's guarded update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportState {
    Pending,
    Running,
    Complete,
    Failed,
}

impl ReportState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportState::Complete | ReportState::Failed)
    }

    /// Form stored in the `reports` table.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportState::Pending => "pending",
            ReportState::Running => "running",
            ReportState::Complete => "complete",
            ReportState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportState::Pending),
            "running" => Some(ReportState::Running),
            "complete" => Some(ReportState::Complete),
            "failed" => Some(ReportState::Failed),
            _ => None,
        }
    }
}

/// Response for POST /trigger_report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerReportResponse {
    /// Identifier to poll via GET /get_report/{id}.
    pub report_id: String,
}

/// JSON response for GET /get_report/{id} while the report is not complete.
///
/// A completed report is served as the CSV artifact instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStatusResponse {
    /// "Running" until a terminal state, then "Failed" (complete reports
    /// short-circuit to the CSV body).
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_poll_status_wire_roundtrip() {
        for status in [PollStatus::Active, PollStatus::Inactive] {
            assert_eq!(PollStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PollStatus::parse("ACTIVE"), None);
        assert_eq!(PollStatus::parse(""), None);
    }

    #[test]
    fn test_poll_status_is_up() {
        assert!(PollStatus::Active.is_up());
        assert!(!PollStatus::Inactive.is_up());
    }

    #[test]
    fn test_interval_duration() {
        let start = Utc.with_ymd_and_hms(2023, 1, 25, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 1, 25, 10, 30, 0).unwrap();
        let interval = StatusInterval {
            start,
            end,
            status: PollStatus::Active,
        };
        assert_eq!(interval.duration(), Duration::minutes(90));
    }

    #[test]
    fn test_report_state_terminality() {
        assert!(!ReportState::Pending.is_terminal());
        assert!(!ReportState::Running.is_terminal());
        assert!(ReportState::Complete.is_terminal());
        assert!(ReportState::Failed.is_terminal());
    }

    #[test]
    fn test_report_state_roundtrip() {
        for state in [
            ReportState::Pending,
            ReportState::Running,
            ReportState::Complete,
            ReportState::Failed,
        ] {
            assert_eq!(ReportState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ReportState::parse("Complete"), None);
    }
}
