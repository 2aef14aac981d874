//! Storewatch - store uptime/downtime reporting from sparse status polls.
//!
//! # Overview
//!
//! Restaurants are polled roughly hourly and the polls land in a CSV,
//! alongside per-store business hours and timezones. Storewatch estimates,
//! per store, how much business-open time was spent reachable ("up") versus
//! unreachable ("down") over the trailing hour, day and week, extrapolating
//! between the sparse polls, and serves the result as a CSV report behind a
//! trigger/poll HTTP API.
//!
//! The estimation itself is pure: [`engine::run_report`] is a deterministic
//! function of the ingested record sets and an explicit reference instant
//! (the max observed poll timestamp), so a fixed snapshot always reproduces
//! the same report.
//!
//! # Modules
//!
//! - [`model`]: Data types for polls, business hours, intervals and reports
//! - [`ingest`]: CSV loading and validation
//! - [`storage`]: SQLite storage layer
//! - [`engine`]: The uptime/downtime estimation pipeline
//! - [`report`]: Background report generation and the CSV artifact
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod engine;
pub mod ingest;
pub mod model;
pub mod report;
pub mod storage;
