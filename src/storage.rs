//! SQLite storage layer for Storewatch.
//!
//! Holds the three ingested tables (`store_status`, `store_hours`,
//! `store_timezone`) and the `reports` table that tracks triggered reports
//! through `pending -> running -> complete | failed`. The estimation engine
//! never touches this module; the orchestrator materializes the full
//! dataset up front and hands the engine plain slices.

use anyhow::{Context, bail};
use chrono::{DateTime, NaiveTime, TimeZone, Timelike, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::model::{
    BusinessWindow, PollStatus, ReportState, StatusPoll, StoreTimezone,
};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:storewatch.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    ///
    /// Poll timestamps are unix milliseconds (the source data carries
    /// fractional seconds); window open/close are seconds from local
    /// midnight.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS store_status (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                store_id TEXT NOT NULL,
                timestamp_utc INTEGER NOT NULL,
                status TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Index for per-store time-ordered loads
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_store_status_store_ts
            ON store_status(store_id, timestamp_utc)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS store_hours (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                store_id TEXT NOT NULL,
                day_of_week INTEGER NOT NULL,
                open_secs INTEGER NOT NULL,
                close_secs INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS store_timezone (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                store_id TEXT NOT NULL,
                timezone TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                csv_data TEXT,
                error TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically replace the three ingested tables with a fresh snapshot.
    pub async fn replace_dataset(
        &self,
        polls: &[StatusPoll],
        windows: &[BusinessWindow],
        timezones: &[StoreTimezone],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM store_status").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM store_hours").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM store_timezone").execute(&mut *tx).await?;

        for poll in polls {
            sqlx::query(
                r#"
                INSERT INTO store_status (store_id, timestamp_utc, status)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&poll.store_id)
            .bind(poll.timestamp_utc.timestamp_millis())
            .bind(poll.status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        for window in windows {
            sqlx::query(
                r#"
                INSERT INTO store_hours (store_id, day_of_week, open_secs, close_secs)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&window.store_id)
            .bind(i64::from(window.day_of_week))
            .bind(i64::from(window.open.num_seconds_from_midnight()))
            .bind(i64::from(window.close.num_seconds_from_midnight()))
            .execute(&mut *tx)
            .await?;
        }

        for timezone in timezones {
            sqlx::query(
                r#"
                INSERT INTO store_timezone (store_id, timezone)
                VALUES (?, ?)
                "#,
            )
            .bind(&timezone.store_id)
            .bind(&timezone.timezone)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Load all status polls, time-ordered.
    pub async fn load_polls(&self) -> anyhow::Result<Vec<StatusPoll>> {
        let rows = sqlx::query(
            r#"
            SELECT store_id, timestamp_utc, status
            FROM store_status
            ORDER BY store_id, timestamp_utc
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut polls = Vec::with_capacity(rows.len());
        for row in &rows {
            let store_id: String = row.get("store_id");
            let millis: i64 = row.get("timestamp_utc");
            let status_str: String = row.get("status");

            let Some(timestamp_utc) = Utc.timestamp_millis_opt(millis).single() else {
                bail!("store {store_id}: poll timestamp {millis} out of range");
            };
            let Some(status) = PollStatus::parse(&status_str) else {
                bail!("store {store_id}: unknown poll status {status_str:?}");
            };

            polls.push(StatusPoll {
                store_id,
                timestamp_utc,
                status,
            });
        }
        Ok(polls)
    }

    /// Load all business-hour windows.
    pub async fn load_windows(&self) -> anyhow::Result<Vec<BusinessWindow>> {
        let rows = sqlx::query(
            r#"
            SELECT store_id, day_of_week, open_secs, close_secs
            FROM store_hours
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut windows = Vec::with_capacity(rows.len());
        for row in &rows {
            let store_id: String = row.get("store_id");
            let day_of_week: i64 = row.get("day_of_week");
            let open_secs: i64 = row.get("open_secs");
            let close_secs: i64 = row.get("close_secs");

            windows.push(BusinessWindow {
                store_id: store_id.clone(),
                day_of_week: u8::try_from(day_of_week)
                    .with_context(|| format!("store {store_id}: weekday {day_of_week}"))?,
                open: secs_to_time(open_secs)
                    .with_context(|| format!("store {store_id}: open offset {open_secs}"))?,
                close: secs_to_time(close_secs)
                    .with_context(|| format!("store {store_id}: close offset {close_secs}"))?,
            });
        }
        Ok(windows)
    }

    /// Load all store-timezone mappings.
    pub async fn load_timezones(&self) -> anyhow::Result<Vec<StoreTimezone>> {
        let rows = sqlx::query(
            r#"
            SELECT store_id, timezone FROM store_timezone
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoreTimezone {
                store_id: row.get("store_id"),
                timezone: row.get("timezone"),
            })
            .collect())
    }

    /// The max observed poll instant across the whole dataset, used as the
    /// analysis anchor so a fixed snapshot reproduces the same report.
    pub async fn max_poll_instant(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            r#"
            SELECT MAX(timestamp_utc) as max_ts FROM store_status
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let max_ts: Option<i64> = row.get("max_ts");
        Ok(max_ts.and_then(|millis| Utc.timestamp_millis_opt(millis).single()))
    }

    /// Record a newly triggered report in the pending state.
    pub async fn create_report(&self, report_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, status, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(report_id)
        .bind(ReportState::Pending.as_str())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Move a pending report to running.
    pub async fn mark_report_running(&self, report_id: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reports SET status = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(ReportState::Running.as_str())
        .bind(report_id)
        .bind(ReportState::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the finished CSV artifact. The guard on the current status
    /// makes terminal states sticky: a report that already completed or
    /// failed is never rewritten.
    pub async fn complete_report(&self, report_id: &str, csv_data: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reports SET status = ?, csv_data = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(ReportState::Complete.as_str())
        .bind(csv_data)
        .bind(report_id)
        .bind(ReportState::Pending.as_str())
        .bind(ReportState::Running.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a terminal failure with its message. Same stickiness guard as
    /// [`Storage::complete_report`].
    pub async fn fail_report(&self, report_id: &str, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reports SET status = ?, error = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(ReportState::Failed.as_str())
        .bind(error)
        .bind(report_id)
        .bind(ReportState::Pending.as_str())
        .bind(ReportState::Running.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a report's state and, when complete, its CSV artifact.
    pub async fn get_report(
        &self,
        report_id: &str,
    ) -> anyhow::Result<Option<(ReportState, Option<String>)>> {
        let row = sqlx::query(
            r#"
            SELECT status, csv_data FROM reports WHERE id = ?
            "#,
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status_str: String = row.get("status");
        let Some(state) = ReportState::parse(&status_str) else {
            bail!("report {report_id}: unknown state {status_str:?}");
        };
        let csv_data: Option<String> = row.get("csv_data");
        Ok(Some((state, csv_data)))
    }
}

fn secs_to_time(secs: i64) -> anyhow::Result<NaiveTime> {
    let secs = u32::try_from(secs)?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
        .context("seconds offset past end of day")
}
