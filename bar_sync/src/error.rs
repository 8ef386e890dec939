//! Error taxonomy for the sync engine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use market_data_ingestor::{io::sink::SinkError, providers::ProviderError};
use thiserror::Error;

/// Persistence failures: the progress database or a series file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A diesel query failed.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// A stored timestamp could not be parsed.
    #[error("bad stored timestamp: {0}")]
    Timestamp(String),

    /// A stored row could not be decoded (unknown category, bad detail JSON).
    #[error("bad stored row for {id}: {message}")]
    Decode {
        /// Primary key of the offending row.
        id: String,
        /// What was wrong with it.
        message: String,
    },

    /// A watermark with `begin > end` was rejected.
    #[error("inverted watermark: begin {begin} is after end {end}")]
    InvertedWindow {
        /// Rejected begin.
        begin: DateTime<Utc>,
        /// Rejected end.
        end: DateTime<Utc>,
    },

    /// Reading or writing a series file failed.
    #[error("series file error: {0}")]
    Series(#[from] SinkError),
}

/// Everything that can go wrong during a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The terminal is unreachable; fatal before any item is processed.
    #[error("terminal connection unavailable: {0}")]
    Connection(String),

    /// The terminal rejected or failed a request; the item is skipped.
    #[error("upstream error: {0}")]
    Upstream(#[from] ProviderError),

    /// Persistence failed; the item is skipped.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A merge would have shrunk a series; the write was aborted and the
    /// file left as it was.
    #[error(
        "refusing to shrink {} from {existing} to {merged} rows",
        path.display()
    )]
    CorruptionGuard {
        /// Series file that was left untouched.
        path: PathBuf,
        /// Rows in the persisted series.
        existing: usize,
        /// Rows the merge produced.
        merged: usize,
    },
}

impl From<SinkError> for SyncError {
    fn from(e: SinkError) -> Self {
        SyncError::Storage(StorageError::Series(e))
    }
}
