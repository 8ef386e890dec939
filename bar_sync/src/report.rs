//! Per-run bookkeeping: what each item did and how long it took.

use std::time::Duration;

use market_data_ingestor::models::{adjustment::Adjustment, period::Period};

use crate::progress::SyncPhase;

/// Lifecycle of one (instrument, phase, period, adjustment) item.
///
/// `Planned -> Fetching -> Merging -> Completed -> Advanced`, or `Failed`
/// from any step. Download items skip `Merging`. `Completed` items stay
/// there when a sibling failure kept the phase watermark from moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Window computed, nothing requested yet.
    Planned,
    /// Request sent to the terminal.
    Fetching,
    /// Bars received, series file being merged.
    Merging,
    /// Item succeeded; watermark not moved.
    Completed,
    /// Item succeeded and the phase watermark moved past it.
    Advanced,
    /// Item failed; its phase watermark was left alone.
    Failed,
}

/// Record of one processed item.
#[derive(Debug, Clone)]
pub struct ItemReport {
    /// Instrument long id.
    pub instrument_id: String,
    /// Phase the item belongs to.
    pub phase: SyncPhase,
    /// Requested period.
    pub period: Period,
    /// Adjustment variant, save items only.
    pub adjustment: Option<Adjustment>,
    /// Final state.
    pub state: ItemState,
    /// Rows in the series file after the merge; `None` when nothing was written.
    pub rows: Option<usize>,
    /// Failure reason.
    pub error: Option<String>,
    /// Wall time spent on the item.
    pub elapsed: Duration,
}

impl ItemReport {
    pub(crate) fn planned(
        instrument_id: &str,
        phase: SyncPhase,
        period: Period,
        adjustment: Option<Adjustment>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            phase,
            period,
            adjustment,
            state: ItemState::Planned,
            rows: None,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// True when the item did not fail.
    pub fn succeeded(&self) -> bool {
        !matches!(self.state, ItemState::Failed | ItemState::Planned)
    }
}

/// Totals of one orchestrator run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Instruments visited.
    pub instruments: usize,
    /// Phase watermarks moved forward.
    pub advanced: usize,
    /// Failed items plus per-instrument store failures.
    pub errors: usize,
    /// Save items that returned no bars.
    pub empty: usize,
    /// Rows across all series files written this run.
    pub total_rows: usize,
    /// Every item in processing order.
    pub items: Vec<ItemReport>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl SyncReport {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished item and update the totals.
    pub fn record(&mut self, item: ItemReport) {
        if item.state == ItemState::Failed {
            self.errors += 1;
        }
        if item.phase == SyncPhase::Save && item.succeeded() && item.rows.is_none() {
            self.empty += 1;
        }
        self.total_rows += item.rows.unwrap_or(0);
        self.items.push(item);
    }

    /// Mark every successful item of one instrument phase as advanced.
    pub(crate) fn mark_advanced(&mut self, instrument_id: &str, phase: SyncPhase) {
        self.advanced += 1;
        for item in self
            .items
            .iter_mut()
            .filter(|i| i.instrument_id == instrument_id && i.phase == phase)
        {
            if item.state == ItemState::Completed {
                item.state = ItemState::Advanced;
            }
        }
    }

    /// Items that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|i| i.state == ItemState::Failed)
    }

    /// Share of items that did not fail, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.items.is_empty() {
            0.0
        } else {
            let ok = self.items.len().saturating_sub(self.failures().count());
            (ok as f64 / self.items.len() as f64) * 100.0
        }
    }

    /// One structured summary line.
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            instruments = self.instruments,
            items = self.items.len(),
            advanced = self.advanced,
            errors = self.errors,
            empty = self.empty,
            total_rows = self.total_rows,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "sync finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, phase: SyncPhase, state: ItemState, rows: Option<usize>) -> ItemReport {
        let mut item = ItemReport::planned(id, phase, Period::Tick, None);
        item.state = state;
        item.rows = rows;
        item
    }

    #[test]
    fn totals_follow_recorded_items() {
        let mut report = SyncReport::new();
        report.record(item("a", SyncPhase::Download, ItemState::Completed, None));
        report.record(item("a", SyncPhase::Save, ItemState::Completed, Some(10)));
        report.record(item("a", SyncPhase::Save, ItemState::Completed, None));
        report.record(item("b", SyncPhase::Save, ItemState::Failed, None));

        assert_eq!(report.errors, 1);
        assert_eq!(report.empty, 1);
        assert_eq!(report.total_rows, 10);
        assert_eq!(report.success_rate(), 75.0);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn advancing_only_touches_completed_items_of_that_phase() {
        let mut report = SyncReport::new();
        report.record(item("a", SyncPhase::Download, ItemState::Completed, None));
        report.record(item("a", SyncPhase::Save, ItemState::Completed, Some(1)));
        report.record(item("b", SyncPhase::Download, ItemState::Completed, None));
        report.mark_advanced("a", SyncPhase::Download);

        let states: Vec<_> = report.items.iter().map(|i| i.state).collect();
        assert_eq!(
            states,
            [ItemState::Advanced, ItemState::Completed, ItemState::Completed]
        );
        assert_eq!(report.advanced, 1);
    }

    #[test]
    fn empty_run_has_zero_rate() {
        assert_eq!(SyncReport::new().success_rate(), 0.0);
    }
}
