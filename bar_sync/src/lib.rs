//! Incremental bar and tick synchronization from a market data terminal into
//! local Parquet series, with per-instrument progress kept in SQLite.

#![deny(missing_docs)]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod registry;
pub mod report;
/// Diesel table definitions.
#[allow(missing_docs)]
pub mod schema;
pub mod series;
pub mod tz;
