//! Storewatch - store uptime/downtime reporting from sparse status polls.
//!
//! # Overview
//!
//! Storewatch ingests three CSVs (status polls, business hours, store
//! timezones) into SQLite at startup and serves reports estimating each
//! store's uptime and downtime within business hours over the trailing
//! hour, day and week.
//!
//! # API Endpoints
//!
//! - `POST /trigger_report` - Start generating a report
//! - `GET /get_report/{id}` - Poll a report or download its CSV
//! - `GET /health` - Health check
//! - `GET /` - Service banner

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use storewatch::api::{AppState, get_report, health_check, root, trigger_report};
use storewatch::ingest;
use storewatch::storage::Storage;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:storewatch.db?mode=rwc";

/// Default directory holding the three source CSVs.
const DEFAULT_DATA_DIR: &str = ".";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("storewatch=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("STOREWATCH_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_url =
        env::var("STOREWATCH_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    let data_dir: PathBuf = env::var("STOREWATCH_DATA_DIR")
        .unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string())
        .into();

    info!(port, db_url = %db_url, data_dir = %data_dir.display(), "Starting Storewatch server");

    // Initialize storage and load the CSV snapshot
    let storage = Storage::new(&db_url).await?;
    let summary = ingest::import_data_dir(&storage, &data_dir).await?;
    info!(
        polls = summary.polls,
        windows = summary.windows,
        timezones = summary.timezones,
        "Database initialized"
    );

    // Create application state
    let state = AppState { storage };

    // Build router
    let app = Router::new()
        .route("/", get(root))
        .route("/trigger_report", post(trigger_report))
        .route("/get_report/:report_id", get(get_report))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Storewatch is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
