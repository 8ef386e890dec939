//! SQLite implementation of [`ProgressStore`](super::ProgressStore).

use chrono::{DateTime, Utc};
use diesel::{prelude::*, upsert::excluded};
use market_data_ingestor::models::instrument::{Instrument, InstrumentCategory, InstrumentDetail};
use tracing::debug;

use crate::{
    error::StorageError,
    models::{ExchangeRow, InstrumentRow, NewInstrument, ProgressRow},
    progress::{ProgressStore, RegisterCounts, StoreResult, SyncPhase, SyncProgress, Watermark},
    schema::{exchange, instrument, sync_progress},
    tz,
};

use crate::schema::sync_progress::dsl as sp;

/// [`ProgressStore`] backed by the SQLite schema in the embedded migrations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProgressStore;

impl SqliteProgressStore {
    /// Create the store.
    pub fn new() -> Self {
        Self
    }
}

fn parse_pair(
    id: &str,
    begin: Option<&str>,
    end: Option<&str>,
) -> StoreResult<Option<Watermark>> {
    let parse = |s: &str| {
        tz::parse_ts_to_utc(s).map_err(|e| StorageError::Timestamp(format!("{id}: {e:#}")))
    };
    match (begin, end) {
        (Some(b), Some(e)) => Ok(Some(Watermark {
            begin: parse(b)?,
            end: parse(e)?,
        })),
        (None, None) => Ok(None),
        _ => Err(StorageError::Decode {
            id: id.to_string(),
            message: "half-set watermark pair".into(),
        }),
    }
}

fn progress_from_row(row: &ProgressRow) -> StoreResult<SyncProgress> {
    let id = row.instrument_long_id.as_str();
    Ok(SyncProgress {
        download: parse_pair(id, row.download_begin.as_deref(), row.download_end.as_deref())?,
        save: parse_pair(id, row.save_begin.as_deref(), row.save_end.as_deref())?,
    })
}

fn instrument_from_row(row: InstrumentRow) -> StoreResult<Instrument> {
    let category: InstrumentCategory =
        row.category.parse().map_err(|message| StorageError::Decode {
            id: row.instrument_long_id.clone(),
            message,
        })?;
    let detail: InstrumentDetail =
        serde_json::from_str(&row.detail_json).map_err(|e| StorageError::Decode {
            id: row.instrument_long_id.clone(),
            message: format!("detail_json: {e}"),
        })?;
    Ok(Instrument {
        long_id: row.instrument_long_id,
        instrument_id: row.instrument_id,
        category,
        xt_exchange_id: row.xt_exchange_id,
        exchange_id: row.exchange_id,
        exchange_name: row.exchange_name,
        display_name: row.display_name,
        detail,
    })
}

impl ProgressStore for SqliteProgressStore {
    fn get(&self, conn: &mut SqliteConnection, instrument_id: &str) -> StoreResult<SyncProgress> {
        let row = sp::sync_progress
            .find(instrument_id)
            .select(ProgressRow::as_select())
            .first(conn)
            .optional()?;
        match row {
            Some(row) => progress_from_row(&row),
            None => Ok(SyncProgress::NEVER),
        }
    }

    fn advance(
        &self,
        conn: &mut SqliteConnection,
        instrument_id: &str,
        phase: SyncPhase,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<()> {
        if begin > end {
            return Err(StorageError::InvertedWindow { begin, end });
        }
        let b = tz::to_rfc3339_millis(begin);
        let e = tz::to_rfc3339_millis(end);

        // INSERT .. ON CONFLICT (instrument_long_id) DO UPDATE, one statement per call
        let written = match phase {
            SyncPhase::Download => diesel::insert_into(sp::sync_progress)
                .values((
                    sp::instrument_long_id.eq(instrument_id),
                    sp::download_begin.eq(&b),
                    sp::download_end.eq(&e),
                ))
                .on_conflict(sp::instrument_long_id)
                .do_update()
                .set((
                    sp::download_begin.eq(excluded(sp::download_begin)),
                    sp::download_end.eq(excluded(sp::download_end)),
                ))
                .execute(conn)?,
            SyncPhase::Save => diesel::insert_into(sp::sync_progress)
                .values((
                    sp::instrument_long_id.eq(instrument_id),
                    sp::save_begin.eq(&b),
                    sp::save_end.eq(&e),
                ))
                .on_conflict(sp::instrument_long_id)
                .do_update()
                .set((
                    sp::save_begin.eq(excluded(sp::save_begin)),
                    sp::save_end.eq(excluded(sp::save_end)),
                ))
                .execute(conn)?,
        };
        debug!(instrument_id, phase = phase.as_str(), begin = %b, end = %e, written, "watermark advanced");
        Ok(())
    }

    fn list(
        &self,
        conn: &mut SqliteConnection,
        category: Option<InstrumentCategory>,
    ) -> StoreResult<Vec<(String, SyncProgress)>> {
        let mut query = sync_progress::table
            .inner_join(instrument::table)
            .select(ProgressRow::as_select())
            .order(sp::instrument_long_id.asc())
            .into_boxed();
        if let Some(category) = category {
            query = query.filter(instrument::category.eq(category.as_str()));
        }
        query
            .load(conn)?
            .iter()
            .map(|row| Ok((row.instrument_long_id.clone(), progress_from_row(row)?)))
            .collect()
    }

    fn instruments(
        &self,
        conn: &mut SqliteConnection,
        category: Option<InstrumentCategory>,
    ) -> StoreResult<Vec<Instrument>> {
        let mut query = instrument::table
            .select(InstrumentRow::as_select())
            .order(instrument::instrument_long_id.asc())
            .into_boxed();
        if let Some(category) = category {
            query = query.filter(instrument::category.eq(category.as_str()));
        }
        query.load(conn)?.into_iter().map(instrument_from_row).collect()
    }

    fn register(
        &self,
        conn: &mut SqliteConnection,
        instruments: &[Instrument],
    ) -> StoreResult<RegisterCounts> {
        conn.immediate_transaction::<_, StorageError, _>(|conn| {
            let mut counts = RegisterCounts::default();
            for ins in instruments {
                let detail_json = serde_json::to_string(&ins.detail).map_err(|e| {
                    StorageError::Decode {
                        id: ins.long_id.clone(),
                        message: format!("detail_json: {e}"),
                    }
                })?;
                let row = NewInstrument {
                    instrument_long_id: &ins.long_id,
                    instrument_id: &ins.instrument_id,
                    category: ins.category.as_str(),
                    xt_exchange_id: &ins.xt_exchange_id,
                    exchange_id: &ins.exchange_id,
                    exchange_name: &ins.exchange_name,
                    display_name: &ins.display_name,
                    detail_json: &detail_json,
                };
                diesel::insert_into(instrument::table)
                    .values(&row)
                    .on_conflict(instrument::instrument_long_id)
                    .do_update()
                    .set(&row)
                    .execute(conn)?;

                // progress is never reset by re-registration
                let created = diesel::insert_into(sp::sync_progress)
                    .values(sp::instrument_long_id.eq(&ins.long_id))
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                if created == 1 {
                    counts.inserted += 1;
                } else {
                    counts.refreshed += 1;
                }
            }
            Ok(counts)
        })
    }

    fn upsert_exchanges(
        &self,
        conn: &mut SqliteConnection,
        exchanges: &[ExchangeRow],
    ) -> StoreResult<usize> {
        conn.immediate_transaction::<_, StorageError, _>(|conn| {
            let mut written = 0;
            for row in exchanges {
                written += diesel::insert_into(exchange::table)
                    .values(row)
                    .on_conflict(exchange::xt_exchange_id)
                    .do_update()
                    .set(row)
                    .execute(conn)?;
            }
            Ok(written)
        })
    }

    fn exchanges(
        &self,
        conn: &mut SqliteConnection,
        category: InstrumentCategory,
    ) -> StoreResult<Vec<ExchangeRow>> {
        Ok(exchange::table
            .filter(exchange::category.eq(category.as_str()))
            .order(exchange::xt_exchange_id.asc())
            .select(ExchangeRow::as_select())
            .load(conn)?)
    }
}
