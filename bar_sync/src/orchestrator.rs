//! Sequential sync loop over one instrument category.
//!
//! Per instrument, in id order:
//!
//! 1. download phase: ask the terminal to cache every period over the
//!    download window, then advance the download watermark if all succeeded;
//! 2. save phase: read every (period, adjustment) over the save window,
//!    merge it into the series file, then advance the save watermark if all
//!    succeeded. The save window never ends past the download watermark, so
//!    the save phase only reads what the terminal is known to have cached.
//!
//! Item failures are logged and recorded; they never stop the batch.

use std::time::Instant;

use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use market_data_ingestor::{
    models::{
        adjustment::Adjustment, bar::Bar, instrument::Instrument, period::Period,
        request_params::BarsRequestParams,
    },
    providers::Terminal,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::CategoryPlan,
    error::SyncError,
    planner::{FetchWindow, plan, plan_phase},
    progress::{ProgressStore, SyncPhase, SyncProgress},
    report::{ItemReport, ItemState, SyncReport},
    series::store::{SeriesKey, SeriesStore},
};

/// Drives one category through download and save.
pub struct SyncOrchestrator<'a, T: ?Sized, S: ?Sized> {
    terminal: &'a T,
    store: &'a S,
    series: SeriesStore,
    plan: CategoryPlan,
    init_begin: DateTime<Utc>,
}

impl<'a, T, S> SyncOrchestrator<'a, T, S>
where
    T: Terminal + ?Sized,
    S: ProgressStore + ?Sized,
{
    /// Orchestrator for `plan`'s category writing under `series`.
    pub fn new(
        terminal: &'a T,
        store: &'a S,
        series: SeriesStore,
        plan: CategoryPlan,
        init_begin: DateTime<Utc>,
    ) -> Self {
        Self {
            terminal,
            store,
            series,
            plan,
            init_begin,
        }
    }

    /// Synchronize every registered instrument of the category up to `init_end`.
    ///
    /// Fails only when the terminal is disconnected or the instrument list
    /// cannot be read; everything else lands in the report.
    pub async fn run(
        &self,
        conn: &mut SqliteConnection,
        init_end: DateTime<Utc>,
    ) -> Result<SyncReport, SyncError> {
        if !self.terminal.is_connected().await {
            return Err(SyncError::Connection(
                "terminal reports no active session".to_string(),
            ));
        }

        let started = Instant::now();
        let category = self.plan.category;
        let instruments = self.store.instruments(conn, Some(category))?;
        info!(%category, instruments = instruments.len(), init_begin = %self.init_begin, %init_end, "sync starting");

        let mut report = SyncReport::new();
        for instrument in &instruments {
            report.instruments += 1;
            let item_started = Instant::now();
            let progress = match self.store.get(conn, &instrument.long_id) {
                Ok(p) => p,
                Err(e) => {
                    error!(instrument = %instrument.long_id, error = %e, "cannot read progress, skipping instrument");
                    report.errors += 1;
                    continue;
                }
            };

            let cached_until = self
                .download_phase(conn, instrument, &progress, init_end, &mut report)
                .await;
            match cached_until {
                Some(cached_until) => {
                    let save_end = cached_until.min(init_end);
                    self.save_phase(conn, instrument, &progress, save_end, &mut report)
                        .await;
                }
                None => warn!(
                    instrument = %instrument.long_id,
                    "nothing downloaded yet, save phase skipped"
                ),
            }

            info!(
                instrument = %instrument.long_id,
                name = %instrument.display_name,
                done = report.instruments,
                elapsed = format!("{:.2}s", item_started.elapsed().as_secs_f64()),
                "instrument finished"
            );
        }

        report.elapsed = started.elapsed();
        report.log_summary(category.as_str());
        Ok(report)
    }

    /// Returns the end of the download watermark once the phase is over.
    async fn download_phase(
        &self,
        conn: &mut SqliteConnection,
        instrument: &Instrument,
        progress: &SyncProgress,
        init_end: DateTime<Utc>,
        report: &mut SyncReport,
    ) -> Option<DateTime<Utc>> {
        let window = plan(progress, self.init_begin, init_end);
        let mut all_ok = true;

        for &period in &self.plan.periods {
            let mut item =
                ItemReport::planned(&instrument.long_id, SyncPhase::Download, period, None);
            let started = Instant::now();
            item.state = ItemState::Fetching;
            match self
                .terminal
                .download_range(&instrument.long_id, period, window.begin, window.end)
                .await
            {
                Ok(()) => {
                    item.state = ItemState::Completed;
                    debug!(instrument = %instrument.long_id, %period, elapsed = format!("{:.2}s", started.elapsed().as_secs_f64()), "download finished");
                }
                Err(e) => {
                    all_ok = false;
                    error!(instrument = %instrument.long_id, %period, error = %e, "download failed");
                    item.state = ItemState::Failed;
                    item.error = Some(e.to_string());
                }
            }
            item.elapsed = started.elapsed();
            report.record(item);
        }

        let advanced = all_ok
            && self.advance(conn, instrument, SyncPhase::Download, &window, progress, report);
        if advanced {
            Some(window.end)
        } else {
            progress.download.map(|w| w.end)
        }
    }

    async fn save_phase(
        &self,
        conn: &mut SqliteConnection,
        instrument: &Instrument,
        progress: &SyncProgress,
        save_end: DateTime<Utc>,
        report: &mut SyncReport,
    ) {
        let window = plan_phase(progress, SyncPhase::Save, self.init_begin, save_end);
        let mut all_ok = true;

        for &period in &self.plan.periods {
            for &adjustment in &self.plan.adjustments {
                let item = self
                    .save_item(instrument, period, adjustment, &window)
                    .await;
                all_ok &= item.state != ItemState::Failed;
                report.record(item);
            }
        }

        if all_ok {
            self.advance(conn, instrument, SyncPhase::Save, &window, progress, report);
        }
    }

    async fn save_item(
        &self,
        instrument: &Instrument,
        period: Period,
        adjustment: Adjustment,
        window: &FetchWindow,
    ) -> ItemReport {
        let mut item =
            ItemReport::planned(&instrument.long_id, SyncPhase::Save, period, Some(adjustment));
        let started = Instant::now();
        let begin = if adjustment.rewrites_history() {
            self.init_begin
        } else {
            window.begin
        };
        let params = BarsRequestParams {
            instrument_ids: vec![instrument.long_id.clone()],
            period,
            adjustment,
            start: begin,
            end: window.end,
        };

        item.state = ItemState::Fetching;
        let result = match self.terminal.read_range(&params).await {
            Ok(series) => {
                let bars: Vec<Bar> = series
                    .into_iter()
                    .filter(|s| s.instrument_id == instrument.long_id)
                    .flat_map(|s| s.bars)
                    .collect();
                item.state = ItemState::Merging;
                let key = SeriesKey {
                    instrument,
                    period,
                    adjustment,
                };
                self.series.append(&key, bars)
            }
            Err(e) => Err(SyncError::from(e)),
        };

        match result {
            Ok(outcome) => {
                item.state = ItemState::Completed;
                item.rows = outcome.rows();
                debug!(
                    instrument = %instrument.long_id,
                    %period,
                    %adjustment,
                    ?outcome,
                    elapsed = format!("{:.2}s", started.elapsed().as_secs_f64()),
                    "save finished"
                );
            }
            Err(e) => {
                error!(instrument = %instrument.long_id, %period, %adjustment, error = %e, "save failed");
                item.state = ItemState::Failed;
                item.error = Some(e.to_string());
            }
        }
        item.elapsed = started.elapsed();
        item
    }

    fn advance(
        &self,
        conn: &mut SqliteConnection,
        instrument: &Instrument,
        phase: SyncPhase,
        window: &FetchWindow,
        progress: &SyncProgress,
        report: &mut SyncReport,
    ) -> bool {
        if window.is_inverted() {
            warn!(
                instrument = %instrument.long_id,
                phase = phase.as_str(),
                begin = %window.begin,
                end = %window.end,
                "window is inverted, watermark kept"
            );
            return false;
        }
        let next = window.advanced_watermark(progress.phase(phase));
        match self
            .store
            .advance(conn, &instrument.long_id, phase, next.begin, next.end)
        {
            Ok(()) => {
                report.mark_advanced(&instrument.long_id, phase);
                true
            }
            Err(e) => {
                error!(instrument = %instrument.long_id, phase = phase.as_str(), error = %e, "cannot advance watermark");
                report.errors += 1;
                false
            }
        }
    }
}
