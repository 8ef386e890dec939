//! Next fetch window per instrument and phase.
//!
//! Never-synchronized instruments get the whole configured range. Otherwise
//! the window restarts at the stored end, so the boundary bar is fetched a
//! second time and absorbed by the merge's dedup.

use chrono::{DateTime, Utc};

use crate::progress::{SyncPhase, SyncProgress, Watermark};

/// Inclusive time range to request from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    /// First instant requested.
    pub begin: DateTime<Utc>,
    /// Last instant requested.
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// `begin > end`. Still fetched; an empty answer is a no-op.
    pub fn is_inverted(&self) -> bool {
        self.begin > self.end
    }

    /// Watermark to store once this window was fully synchronized:
    /// the earlier begin is kept, the end moves to the window end.
    pub fn advanced_watermark(&self, previous: Option<Watermark>) -> Watermark {
        let begin = previous.map_or(self.begin, |w| w.begin.min(self.begin));
        Watermark {
            begin: begin.min(self.end),
            end: self.end,
        }
    }
}

/// Download-phase window.
pub fn plan(
    progress: &SyncProgress,
    init_begin: DateTime<Utc>,
    init_end: DateTime<Utc>,
) -> FetchWindow {
    plan_phase(progress, SyncPhase::Download, init_begin, init_end)
}

/// Window for any phase, using that phase's own watermark.
pub fn plan_phase(
    progress: &SyncProgress,
    phase: SyncPhase,
    init_begin: DateTime<Utc>,
    init_end: DateTime<Utc>,
) -> FetchWindow {
    match progress.phase(phase) {
        None => FetchWindow {
            begin: init_begin,
            end: init_end,
        },
        Some(w) => FetchWindow {
            begin: w.end,
            end: init_end,
        },
    }
}
