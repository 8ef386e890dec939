//! On-disk series files, one Parquet file per (instrument, period, adjustment).
//!
//! Layout: `{root}/{CATEGORY}/{exchange}-{adjustment}-{name}-{long_id}-{period}.parquet`

use std::path::{Path, PathBuf};

use market_data_ingestor::{
    io::parquet::{read_bars, write_bars_atomic},
    models::{adjustment::Adjustment, bar::Bar, instrument::Instrument, period::Period},
};
use tracing::{debug, error};

use crate::{
    error::SyncError,
    series::{MergeError, merge_append},
};

/// Identifies one series file.
#[derive(Debug, Clone, Copy)]
pub struct SeriesKey<'a> {
    /// Owning instrument.
    pub instrument: &'a Instrument,
    /// Bar period.
    pub period: Period,
    /// Adjustment variant.
    pub adjustment: Adjustment,
}

/// What [`SeriesStore::append`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Nothing incoming; the file was not touched.
    NoData,
    /// First write of this series.
    Created {
        /// Rows written.
        rows: usize,
    },
    /// Existing series grown or updated in place.
    Merged {
        /// Rows before the merge.
        before: usize,
        /// Rows after the merge.
        after: usize,
    },
}

impl AppendOutcome {
    /// Rows in the file after the call, if it was written.
    pub fn rows(&self) -> Option<usize> {
        match *self {
            AppendOutcome::NoData => None,
            AppendOutcome::Created { rows } => Some(rows),
            AppendOutcome::Merged { after, .. } => Some(after),
        }
    }
}

/// Characters that cannot appear in a file name component on common filesystems.
fn sanitize(component: &str) -> String {
    component
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Root directory of all series files.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    root: PathBuf,
}

impl SeriesStore {
    /// Store rooted at `root` (created lazily on first write).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one series file.
    pub fn path_for(&self, key: &SeriesKey<'_>) -> PathBuf {
        let ins = key.instrument;
        let file = format!(
            "{}-{}-{}-{}-{}.parquet",
            sanitize(&ins.exchange_name),
            key.adjustment.as_str(),
            sanitize(&ins.display_name),
            sanitize(&ins.long_id),
            key.period,
        );
        self.root.join(ins.category.as_str()).join(file)
    }

    /// Load a series; `None` when it was never written.
    pub fn load(&self, key: &SeriesKey<'_>) -> Result<Option<Vec<Bar>>, SyncError> {
        Ok(read_bars(&self.path_for(key))?)
    }

    /// Merge `incoming` into the stored series and atomically replace the file.
    ///
    /// Empty input is a no-op. If the merge would shrink the stored series
    /// the file is left untouched and [`SyncError::CorruptionGuard`] is
    /// returned.
    pub fn append(
        &self,
        key: &SeriesKey<'_>,
        incoming: Vec<Bar>,
    ) -> Result<AppendOutcome, SyncError> {
        if incoming.is_empty() {
            return Ok(AppendOutcome::NoData);
        }
        let path = self.path_for(key);
        let existing = read_bars(&path)?;
        let before = existing.as_ref().map(Vec::len);

        let merged = merge_append(existing, incoming).map_err(|MergeError { existing, merged }| {
            error!(path = %path.display(), existing, merged, "merge would shrink series, file left untouched");
            SyncError::CorruptionGuard {
                path: path.clone(),
                existing,
                merged,
            }
        })?;

        write_bars_atomic(&path, merged.bars())?;
        debug!(path = %path.display(), before, after = merged.len(), "series appended");

        Ok(match before {
            None => AppendOutcome::Created { rows: merged.len() },
            Some(before) => AppendOutcome::Merged {
                before,
                after: merged.len(),
            },
        })
    }
}
