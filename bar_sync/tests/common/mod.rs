#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Mutex,
};

use async_trait::async_trait;
use bar_sync::{
    db::{connection, migrate},
    models::ExchangeRow,
    tz::parse_compact_local,
};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Asia::Shanghai;
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use market_data_ingestor::{
    models::{
        adjustment::Adjustment,
        bar::{Bar, BarKey},
        bar_series::BarSeries,
        instrument::{Instrument, InstrumentCategory, InstrumentDetail},
        period::Period,
        request_params::BarsRequestParams,
    },
    providers::{
        HistoryDownloader, HistoryReader, InstrumentCatalog, ProviderError, TerminalSession,
    },
};
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_all(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

/// `YYYYMMDDHHMMSS` in Asia/Shanghai.
pub fn local(s: &str) -> DateTime<Utc> {
    parse_compact_local(s, Shanghai).unwrap()
}

pub fn cst() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

/// Key of an instant rendered at +08:00.
pub fn key_at(t: DateTime<Utc>) -> BarKey {
    BarKey::from_epoch_millis(t.timestamp_millis(), cst()).unwrap()
}

pub fn bar(key: i64, close: f64) -> Bar {
    Bar::new(BarKey::new(key))
        .with_field("close", close)
        .with_field("volume", 10_i64)
}

pub fn exchange_rows() -> Vec<ExchangeRow> {
    let row = |xt: &str, cat: &str, code: &str, name: &str| ExchangeRow {
        xt_exchange_id: xt.into(),
        category: cat.into(),
        exchange_id: code.into(),
        exchange_name: name.into(),
    };
    vec![
        row("DF", "FUTURE", "DCE", "大商所"),
        row("SF", "FUTURE", "SHFE", "上期所"),
        row("SH", "STOCK", "SSE", "上交所"),
    ]
}

pub fn detail(instrument_id: &str, exchange_id: &str, product: &str) -> InstrumentDetail {
    [
        ("InstrumentID", instrument_id),
        ("ExchangeID", exchange_id),
        ("ProductName", product),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.into()))
    .collect()
}

pub fn future(instrument_id: &str, xt: &str, exchange_id: &str, exchange_name: &str) -> Instrument {
    Instrument {
        long_id: Instrument::long_id_of(instrument_id, xt),
        instrument_id: instrument_id.into(),
        category: InstrumentCategory::Future,
        xt_exchange_id: xt.into(),
        exchange_id: exchange_id.into(),
        exchange_name: exchange_name.into(),
        display_name: instrument_id.to_uppercase(),
        detail: detail(instrument_id, exchange_id, &instrument_id.to_uppercase()),
    }
}

pub fn stock(instrument_id: &str) -> Instrument {
    Instrument {
        long_id: Instrument::long_id_of(instrument_id, "SH"),
        instrument_id: instrument_id.into(),
        category: InstrumentCategory::Stock,
        xt_exchange_id: "SH".into(),
        exchange_id: "SSE".into(),
        exchange_name: "上交所".into(),
        display_name: format!("S{instrument_id}"),
        detail: detail(instrument_id, "SSE", &format!("S{instrument_id}")),
    }
}

type SeriesId = (String, Period, Adjustment);

#[derive(Default)]
struct FakeState {
    connected: bool,
    group: Vec<String>,
    details: HashMap<String, InstrumentDetail>,
    bars: HashMap<SeriesId, Vec<Bar>>,
    failing: HashSet<String>,
    failing_downloads: HashSet<String>,
    downloads: Vec<(String, Period, DateTime<Utc>, DateTime<Utc>)>,
    reads: Vec<BarsRequestParams>,
}

/// Deterministic terminal. `read_range` serves the stored bars whose key
/// falls inside the requested window at +08:00.
pub struct FakeTerminal {
    state: Mutex<FakeState>,
}

impl FakeTerminal {
    pub fn connected() -> Self {
        Self {
            state: Mutex::new(FakeState {
                connected: true,
                ..Default::default()
            }),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn list(&self, ids: &[&str]) {
        self.state.lock().unwrap().group = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_detail(&self, long_id: &str, detail: InstrumentDetail) {
        self.state
            .lock()
            .unwrap()
            .details
            .insert(long_id.to_string(), detail);
    }

    pub fn serve(&self, long_id: &str, period: Period, adjustment: Adjustment, bars: Vec<Bar>) {
        self.state
            .lock()
            .unwrap()
            .bars
            .insert((long_id.to_string(), period, adjustment), bars);
    }

    /// Every call for `long_id` fails until [`FakeTerminal::heal`].
    pub fn fail(&self, long_id: &str) {
        self.state.lock().unwrap().failing.insert(long_id.to_string());
    }

    /// Only `download_range` fails for `long_id`; reads still answer from
    /// whatever was served.
    pub fn fail_downloads(&self, long_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_downloads
            .insert(long_id.to_string());
    }

    pub fn heal(&self, long_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing.remove(long_id);
        state.failing_downloads.remove(long_id);
    }

    pub fn downloads(&self) -> Vec<(String, Period, DateTime<Utc>, DateTime<Utc>)> {
        self.state.lock().unwrap().downloads.clone()
    }

    pub fn reads(&self) -> Vec<BarsRequestParams> {
        self.state.lock().unwrap().reads.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.downloads.clear();
        state.reads.clear();
    }

    fn check(state: &FakeState, long_id: &str) -> Result<(), ProviderError> {
        if state.failing.contains(long_id) {
            return Err(ProviderError::Api(format!("500: {long_id} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl TerminalSession for FakeTerminal {
    async fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}

#[async_trait]
impl InstrumentCatalog for FakeTerminal {
    async fn list_instruments_in_group(&self, _group: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.state.lock().unwrap().group.clone())
    }

    async fn instrument_detail(
        &self,
        long_id: &str,
    ) -> Result<Option<InstrumentDetail>, ProviderError> {
        let state = self.state.lock().unwrap();
        Self::check(&state, long_id)?;
        Ok(state.details.get(long_id).cloned())
    }
}

#[async_trait]
impl HistoryDownloader for FakeTerminal {
    async fn download_range(
        &self,
        long_id: &str,
        period: Period,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.downloads.push((long_id.to_string(), period, start, end));
        if state.failing_downloads.contains(long_id) {
            return Err(ProviderError::Api(format!("download of {long_id} timed out")));
        }
        Self::check(&state, long_id)
    }
}

#[async_trait]
impl HistoryReader for FakeTerminal {
    async fn read_range(
        &self,
        params: &BarsRequestParams,
    ) -> Result<Vec<BarSeries>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.reads.push(params.clone());
        let (lo, hi) = (key_at(params.start), key_at(params.end));
        let mut out = Vec::new();
        for id in &params.instrument_ids {
            Self::check(&state, id)?;
            let bars = state
                .bars
                .get(&(id.clone(), params.period, params.adjustment))
                .map(|bars| {
                    bars.iter()
                        .filter(|b| b.key >= lo && b.key <= hi)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            out.push(BarSeries {
                instrument_id: id.clone(),
                period: params.period,
                bars,
            });
        }
        Ok(out)
    }
}
