//! HTTP API handlers for Storewatch.
//!
//! - **POST /trigger_report**: create a report and start generating it in
//!   the background; responds immediately with the report id.
//! - **GET /get_report/{id}**: poll a report — a JSON status while it is
//!   pending or running, the CSV artifact once complete, a failure body
//!   after a terminal error.
//! - **GET /health**, **GET /**: liveness and service banner.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, instrument, warn};

use crate::model::{ReportState, ReportStatusResponse, TriggerReportResponse};
use crate::report;
use crate::storage::Storage;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
}

/// POST /trigger_report - Start generating a report.
///
/// # Response
///
/// ```json
/// { "report_id": "550e8400-e29b-41d4-a716-446655440000" }
/// ```
///
/// Generation happens in a background task; poll GET /get_report/{id}
/// for the outcome.
#[instrument(skip(state))]
pub async fn trigger_report(
    State(state): State<AppState>,
) -> Result<Json<TriggerReportResponse>, StatusCode> {
    match report::trigger_report(&state.storage).await {
        Ok(report_id) => {
            info!(report_id = %report_id, "Report triggered");
            Ok(Json(TriggerReportResponse { report_id }))
        }
        Err(e) => {
            warn!(error = %e, "Failed to trigger report");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /get_report/{id} - Poll a report's status or download it.
///
/// # Responses
///
/// - `404` for an unknown report id
/// - `{"status": "Running"}` while the report is pending or running
/// - the CSV artifact (`text/csv`, attachment) once complete
/// - `{"status": "Failed"}` after a terminal failure
#[instrument(skip(state))]
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Response {
    match state.storage.get_report(&report_id).await {
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Ok(Some((ReportState::Pending | ReportState::Running, _))) => {
            Json(ReportStatusResponse {
                status: "Running".to_string(),
            })
            .into_response()
        }
        Ok(Some((ReportState::Complete, Some(artifact)))) => {
            info!(report_id = %report_id, bytes = artifact.len(), "Report downloaded");
            (
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"report_{report_id}.csv\""),
                    ),
                ],
                artifact,
            )
                .into_response()
        }
        Ok(Some((ReportState::Complete, None))) => {
            warn!(report_id = %report_id, "Completed report has no artifact");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Ok(Some((ReportState::Failed, _))) => Json(ReportStatusResponse {
            status: "Failed".to_string(),
        })
        .into_response(),
        Err(e) => {
            warn!(report_id = %report_id, error = %e, "Failed to fetch report");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET / - Service banner.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Storewatch API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
