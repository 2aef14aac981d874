//! Report orchestration.
//!
//! A triggered report runs as one background unit: load the stored
//! snapshot, anchor `now` at the max observed poll instant, run the pure
//! engine, and record the CSV artifact. The report record reaches exactly
//! one terminal state; any error along the way lands it in `failed` with
//! no partial rows.

use anyhow::Context;
use tracing::{error, info};
use uuid::Uuid;

use crate::engine;
use crate::model::ReportRow;
use crate::storage::Storage;

/// Create a pending report and spawn its generation task. Returns the
/// report id immediately.
pub async fn trigger_report(storage: &Storage) -> anyhow::Result<String> {
    let report_id = Uuid::new_v4().to_string();
    storage.create_report(&report_id).await?;

    let task_storage = storage.clone();
    let task_id = report_id.clone();
    tokio::spawn(async move {
        if let Err(e) = generate_report(&task_storage, &task_id).await {
            error!(report_id = %task_id, error = %e, "Report generation failed");
            if let Err(e) = task_storage.fail_report(&task_id, &format!("{e:#}")).await {
                error!(report_id = %task_id, error = %e, "Failed to record report failure");
            }
        }
    });

    Ok(report_id)
}

/// Run one report to completion. Public so callers that want the outcome
/// inline (tests, batch tooling) can skip the spawned task.
pub async fn generate_report(storage: &Storage, report_id: &str) -> anyhow::Result<()> {
    storage.mark_report_running(report_id).await?;

    let polls = storage.load_polls().await?;
    let windows = storage.load_windows().await?;
    let timezones = storage.load_timezones().await?;

    let Some(now) = storage.max_poll_instant().await? else {
        // No polls anywhere: a legitimately empty report, not a failure.
        let artifact = rows_to_csv(&[])?;
        storage.complete_report(report_id, &artifact).await?;
        info!(report_id = %report_id, rows = 0, "Report completed on empty dataset");
        return Ok(());
    };

    // The engine is pure CPU work over the materialized snapshot.
    let rows = tokio::task::spawn_blocking(move || {
        engine::run_report(now, &polls, &windows, &timezones)
    })
    .await
    .context("report task aborted")??;

    let artifact = rows_to_csv(&rows)?;
    storage.complete_report(report_id, &artifact).await?;
    info!(report_id = %report_id, rows = rows.len(), "Report completed");
    Ok(())
}

/// Serialize report rows as the CSV artifact. The header is always
/// present, even for an empty report.
pub fn rows_to_csv(rows: &[ReportRow]) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record([
        "store_id",
        "uptime_last_hour",
        "uptime_last_day",
        "uptime_last_week",
        "downtime_last_hour",
        "downtime_last_day",
        "downtime_last_week",
    ])?;
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing report artifact: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}
