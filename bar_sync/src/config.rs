//! TOML configuration: parsing, validation and resolution.
//!
//! [`SyncConfig`] is the raw file shape; [`SyncConfig::resolve`] validates it
//! into [`SyncSettings`], the explicit struct handed to the orchestrator.
//!
//! ```toml
//! database_url = "sqlite://bar_sync.db"
//! data_dir = "barData"
//! init_begin = "20100101000000"
//! timezone = "Asia/Shanghai"
//! key_utc_offset_hours = 8
//!
//! [terminal]
//! base_url = "http://127.0.0.1:58610"
//! request_timeout_secs = 600
//!
//! [[exchanges]]
//! category = "FUTURE"
//! xt_exchange_id = "DF"
//! exchange_id = "DCE"
//! exchange_name = "大商所"
//!
//! [[categories]]
//! category = "FUTURE"
//! group = "连续合约"
//! id_pattern = "00."
//! periods = ["tick", "1m", "5m", "15m", "1h", "1d"]
//! adjustments = ["none"]
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use market_data_ingestor::models::{
    adjustment::Adjustment, instrument::InstrumentCategory, period::Period,
};
use serde::Deserialize;
use shared_utils::env::get_env_var_opt;
use thiserror::Error;

use crate::{
    models::ExchangeRow,
    tz::parse_compact_local,
};

/// Environment variable overriding `database_url`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`SyncConfig`].
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not acceptable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

fn default_key_offset() -> i32 {
    8
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("barData")
}

/// Raw configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// SQLite URL or path of the progress database.
    pub database_url: String,
    /// Root directory of the series files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Global range start, `YYYYMMDDHHMMSS` wall time in `timezone`.
    pub init_begin: String,
    /// IANA zone for wall-clock times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Fixed UTC offset bar keys are rendered at.
    #[serde(default = "default_key_offset")]
    pub key_utc_offset_hours: i32,
    /// Terminal gateway connection.
    pub terminal: TerminalCfg,
    /// Exchange seed rows.
    #[serde(default)]
    pub exchanges: Vec<ExchangeCfg>,
    /// Per-category sync plans; built-in defaults when empty.
    #[serde(default)]
    pub categories: Vec<CategoryCfg>,
}

/// `[terminal]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalCfg {
    /// Gateway base URL.
    pub base_url: String,
    /// Per-request timeout; history downloads can be slow.
    #[serde(default = "TerminalCfg::default_timeout")]
    pub request_timeout_secs: u64,
}

impl TerminalCfg {
    fn default_timeout() -> u64 {
        600
    }
}

/// `[[exchanges]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeCfg {
    /// `FUTURE` or `STOCK`.
    pub category: InstrumentCategory,
    /// Terminal market code, e.g. `DF`.
    pub xt_exchange_id: String,
    /// Exchange code found in instrument details, e.g. `DCE`.
    pub exchange_id: String,
    /// Display name.
    pub exchange_name: String,
}

/// `[[categories]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryCfg {
    /// `FUTURE` or `STOCK`.
    pub category: InstrumentCategory,
    /// Terminal sector listing the instruments.
    pub group: String,
    /// Only ids containing this substring are registered.
    #[serde(default)]
    pub id_pattern: Option<String>,
    /// Periods to sync.
    pub periods: Vec<Period>,
    /// Adjustment variants to save.
    pub adjustments: Vec<Adjustment>,
}

/// Resolved sync plan for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPlan {
    /// Category.
    pub category: InstrumentCategory,
    /// Terminal sector.
    pub group: String,
    /// Id filter applied at registration.
    pub id_pattern: Option<String>,
    /// Periods to sync, in order.
    pub periods: Vec<Period>,
    /// Adjustment variants to save, in order.
    pub adjustments: Vec<Adjustment>,
}

impl CategoryPlan {
    /// Built-in plan: continuous futures with ticks, or stocks with
    /// raw and front-ratio bars.
    pub fn default_for(category: InstrumentCategory) -> Self {
        let periods = |codes: &[&str]| -> Vec<Period> {
            codes.iter().filter_map(|c| c.parse().ok()).collect()
        };
        match category {
            InstrumentCategory::Future => CategoryPlan {
                category,
                group: "连续合约".to_string(),
                id_pattern: Some("00.".to_string()),
                periods: periods(&["tick", "1m", "5m", "15m", "1h", "1d"]),
                adjustments: vec![Adjustment::Raw],
            },
            InstrumentCategory::Stock => CategoryPlan {
                category,
                group: "沪深A股".to_string(),
                id_pattern: None,
                periods: periods(&["1m", "5m", "15m", "1h", "1d"]),
                adjustments: vec![Adjustment::Raw, Adjustment::FrontRatio],
            },
        }
    }

    /// Whether a listed id passes the registration filter.
    pub fn accepts(&self, long_id: &str) -> bool {
        self.id_pattern
            .as_deref()
            .is_none_or(|pattern| long_id.contains(pattern))
    }
}

/// Gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalSettings {
    /// Gateway base URL.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Progress database URL.
    pub database_url: String,
    /// Series root directory.
    pub data_dir: PathBuf,
    /// Global range start.
    pub init_begin: DateTime<Utc>,
    /// Zone for wall-clock times.
    pub timezone: Tz,
    /// Offset bar keys are rendered at.
    pub key_offset: FixedOffset,
    /// Gateway connection.
    pub terminal: TerminalSettings,
    /// Exchange seed rows.
    pub exchanges: Vec<ExchangeRow>,
    /// Category plans.
    pub categories: Vec<CategoryPlan>,
}

impl SyncSettings {
    /// Plan for one category.
    pub fn category(&self, category: InstrumentCategory) -> Option<&CategoryPlan> {
        self.categories.iter().find(|c| c.category == category)
    }
}

impl SyncConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a file, then apply `DATABASE_URL` if set.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_toml_str(&s)?;
        if let Some(url) = get_env_var_opt(DATABASE_URL_ENV) {
            cfg.database_url = url;
        }
        Ok(cfg)
    }

    /// Validate and convert into [`SyncSettings`].
    pub fn resolve(self) -> Result<SyncSettings, ConfigError> {
        let invalid = |m: String| ConfigError::Invalid(m);

        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| invalid(format!("unknown timezone {:?}", self.timezone)))?;
        let init_begin = parse_compact_local(&self.init_begin, timezone)
            .map_err(|e| invalid(format!("init_begin: {e:#}")))?;
        let hours = self.key_utc_offset_hours;
        let key_offset = if (-12..=14).contains(&hours) {
            FixedOffset::east_opt(hours * 3600)
        } else {
            None
        }
        .ok_or_else(|| invalid(format!("key_utc_offset_hours out of range: {hours}")))?;

        if self.database_url.trim().is_empty() {
            return Err(invalid("database_url is empty".into()));
        }
        if self.terminal.request_timeout_secs == 0 {
            return Err(invalid("terminal.request_timeout_secs must be positive".into()));
        }

        let mut exchanges: Vec<ExchangeRow> = Vec::with_capacity(self.exchanges.len());
        for e in self.exchanges {
            if exchanges.iter().any(|x| x.xt_exchange_id == e.xt_exchange_id) {
                return Err(invalid(format!("duplicate exchange {}", e.xt_exchange_id)));
            }
            exchanges.push(ExchangeRow {
                xt_exchange_id: e.xt_exchange_id.trim().to_string(),
                category: e.category.as_str().to_string(),
                exchange_id: e.exchange_id.trim().to_string(),
                exchange_name: e.exchange_name.trim().to_string(),
            });
        }

        let mut categories: Vec<CategoryPlan> = Vec::new();
        for c in self.categories {
            if categories.iter().any(|p| p.category == c.category) {
                return Err(invalid(format!("category {} configured twice", c.category)));
            }
            if c.periods.is_empty() || c.adjustments.is_empty() {
                return Err(invalid(format!(
                    "category {} needs at least one period and one adjustment",
                    c.category
                )));
            }
            categories.push(CategoryPlan {
                category: c.category,
                group: c.group,
                id_pattern: c.id_pattern.filter(|p| !p.is_empty()),
                periods: c.periods,
                adjustments: c.adjustments,
            });
        }
        if categories.is_empty() {
            categories = vec![
                CategoryPlan::default_for(InstrumentCategory::Future),
                CategoryPlan::default_for(InstrumentCategory::Stock),
            ];
        }

        Ok(SyncSettings {
            database_url: self.database_url,
            data_dir: self.data_dir,
            init_begin,
            timezone,
            key_offset,
            terminal: TerminalSettings {
                base_url: self.terminal.base_url,
                request_timeout: Duration::from_secs(self.terminal.request_timeout_secs),
            },
            exchanges,
            categories,
        })
    }
}
