//! Diesel rows for the tables in [`crate::schema`].
//!
//! See the embedded migrations for constraints and the `updated_at` triggers.

use diesel::prelude::*;

use crate::schema::*;

/// A row in [`crate::schema::exchange`].
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = exchange)]
#[diesel(primary_key(xt_exchange_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExchangeRow {
    /// Terminal market code, e.g. `"DF"`.
    pub xt_exchange_id: String,
    /// `"FUTURE"` or `"STOCK"`.
    pub category: String,
    /// Exchange code as found in instrument details, e.g. `"DCE"`.
    pub exchange_id: String,
    /// Display name used in series file names.
    pub exchange_name: String,
}

/// A row in [`crate::schema::instrument`].
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = instrument)]
#[diesel(primary_key(instrument_long_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InstrumentRow {
    /// `{instrument_id}.{xt_exchange_id}`.
    pub instrument_long_id: String,
    /// Terminal instrument code, e.g. `"a00"`.
    pub instrument_id: String,
    /// `"FUTURE"` or `"STOCK"`.
    pub category: String,
    /// FK to [`ExchangeRow::xt_exchange_id`].
    pub xt_exchange_id: String,
    /// Exchange code copied from the exchange row.
    pub exchange_id: String,
    /// Exchange display name copied from the exchange row.
    pub exchange_name: String,
    /// Instrument display name.
    pub display_name: String,
    /// Raw terminal detail record as a JSON object.
    pub detail_json: String,
    /// Row creation time (RFC-3339 UTC).
    pub created_at: String,
    /// Last metadata refresh (RFC-3339 UTC, trigger maintained).
    pub updated_at: String,
}

/// Insertable/updatable form of [`InstrumentRow`].
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = instrument, primary_key(instrument_long_id))]
pub struct NewInstrument<'a> {
    /// Primary key.
    pub instrument_long_id: &'a str,
    /// Terminal instrument code.
    pub instrument_id: &'a str,
    /// Category label.
    pub category: &'a str,
    /// FK to the exchange row.
    pub xt_exchange_id: &'a str,
    /// Exchange code.
    pub exchange_id: &'a str,
    /// Exchange display name.
    pub exchange_name: &'a str,
    /// Instrument display name.
    pub display_name: &'a str,
    /// Raw detail JSON.
    pub detail_json: &'a str,
}

/// A row in [`crate::schema::sync_progress`].
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = sync_progress)]
#[diesel(primary_key(instrument_long_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProgressRow {
    /// FK to [`InstrumentRow::instrument_long_id`].
    pub instrument_long_id: String,
    /// Download watermark start (RFC-3339 UTC).
    pub download_begin: Option<String>,
    /// Download watermark end (RFC-3339 UTC).
    pub download_end: Option<String>,
    /// Save watermark start (RFC-3339 UTC).
    pub save_begin: Option<String>,
    /// Save watermark end (RFC-3339 UTC).
    pub save_end: Option<String>,
    /// Last change (trigger maintained).
    pub updated_at: String,
}
