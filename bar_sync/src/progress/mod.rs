//! Per-instrument sync progress.
//!
//! Every registered instrument has one progress record holding two
//! independent watermark pairs, one per [`SyncPhase`]. A missing record and a
//! record with both pairs unset mean the same thing: never synchronized.

use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use market_data_ingestor::models::instrument::{Instrument, InstrumentCategory};

use crate::{error::StorageError, models::ExchangeRow};

pub mod repo;

pub use repo::SqliteProgressStore;

/// Result alias for progress store operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// Which half of a sync a watermark tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    /// Terminal pulled history into its local cache.
    Download,
    /// Cached history merged into the local series files.
    Save,
}

impl SyncPhase {
    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SyncPhase::Download => "download",
            SyncPhase::Save => "save",
        }
    }
}

/// Inclusive synchronized range, `begin <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    /// First instant covered.
    pub begin: DateTime<Utc>,
    /// Last instant covered.
    pub end: DateTime<Utc>,
}

/// Stored progress of one instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncProgress {
    /// Download phase watermark; `None` when never downloaded.
    pub download: Option<Watermark>,
    /// Save phase watermark; `None` when never saved.
    pub save: Option<Watermark>,
}

impl SyncProgress {
    /// The never-synchronized sentinel.
    pub const NEVER: SyncProgress = SyncProgress {
        download: None,
        save: None,
    };

    /// Watermark of one phase.
    pub fn phase(&self, phase: SyncPhase) -> Option<Watermark> {
        match phase {
            SyncPhase::Download => self.download,
            SyncPhase::Save => self.save,
        }
    }

    /// True when neither phase ever completed.
    pub fn is_never_synced(&self) -> bool {
        self.download.is_none() && self.save.is_none()
    }
}

/// Counts reported by [`ProgressStore::register`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterCounts {
    /// Instruments seen for the first time (progress row created).
    pub inserted: usize,
    /// Instruments that already existed; metadata refreshed, progress kept.
    pub refreshed: usize,
}

/// Persistence surface used by the orchestrator and registry.
///
/// The SQLite implementation lives in [`repo`].
pub trait ProgressStore {
    /// Stored progress, or [`SyncProgress::NEVER`] when absent.
    fn get(&self, conn: &mut SqliteConnection, instrument_id: &str) -> StoreResult<SyncProgress>;

    /// Overwrite one phase's watermark in a single upsert. Rejects
    /// `begin > end` with [`StorageError::InvertedWindow`].
    fn advance(
        &self,
        conn: &mut SqliteConnection,
        instrument_id: &str,
        phase: SyncPhase,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// All progress rows in instrument id order, optionally for one category.
    fn list(
        &self,
        conn: &mut SqliteConnection,
        category: Option<InstrumentCategory>,
    ) -> StoreResult<Vec<(String, SyncProgress)>>;

    /// Registered instruments in id order, optionally for one category.
    fn instruments(
        &self,
        conn: &mut SqliteConnection,
        category: Option<InstrumentCategory>,
    ) -> StoreResult<Vec<Instrument>>;

    /// Upsert instrument metadata and create progress rows only where absent.
    fn register(
        &self,
        conn: &mut SqliteConnection,
        instruments: &[Instrument],
    ) -> StoreResult<RegisterCounts>;

    /// Upsert exchange rows; returns how many were written.
    fn upsert_exchanges(
        &self,
        conn: &mut SqliteConnection,
        exchanges: &[ExchangeRow],
    ) -> StoreResult<usize>;

    /// Exchanges of one category ordered by terminal market code.
    fn exchanges(
        &self,
        conn: &mut SqliteConnection,
        category: InstrumentCategory,
    ) -> StoreResult<Vec<ExchangeRow>>;
}
