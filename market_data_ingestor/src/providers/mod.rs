//! Capability traits for the vendor market-data terminal.
//!
//! The sync engine never talks to a vendor SDK directly. It is written against
//! four small async traits, one per thing the terminal can do, so tests can
//! swap in deterministic fixtures and the production build can use the HTTP
//! [`gateway`] client. [`Terminal`] is the blanket union of all four.
//!
//! # Example
//!
//! ```rust
//! # use async_trait::async_trait;
//! # use market_data_ingestor::providers::{ProviderError, TerminalSession};
//! struct AlwaysUp;
//!
//! #[async_trait]
//! impl TerminalSession for AlwaysUp {
//!     async fn is_connected(&self) -> bool {
//!         true
//!     }
//! }
//! ```
pub mod errors;
pub mod gateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use errors::{ProviderError, ProviderInitError};

use crate::models::{
    bar_series::BarSeries, instrument::InstrumentDetail, period::Period,
    request_params::BarsRequestParams,
};

#[async_trait]
pub trait TerminalSession: Send + Sync {
    /// Whether the terminal is reachable and logged in.
    async fn is_connected(&self) -> bool;
}

#[async_trait]
pub trait InstrumentCatalog: Send + Sync {
    /// Long ids of every instrument in a terminal sector/group.
    async fn list_instruments_in_group(&self, group: &str) -> Result<Vec<String>, ProviderError>;

    /// Raw detail record, `None` when the terminal does not know the id.
    async fn instrument_detail(
        &self,
        long_id: &str,
    ) -> Result<Option<InstrumentDetail>, ProviderError>;
}

#[async_trait]
pub trait HistoryDownloader: Send + Sync {
    /// Ask the terminal to pull `[start, end]` for one instrument/period into
    /// its local cache. Returns once the download has finished.
    async fn download_range(
        &self,
        long_id: &str,
        period: Period,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// Read cached history. Ids with no data may be missing from the result
    /// or carry an empty bar list.
    async fn read_range(&self, params: &BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError>;
}

/// Everything the sync engine needs from a terminal.
pub trait Terminal: TerminalSession + InstrumentCatalog + HistoryDownloader + HistoryReader {}

impl<T> Terminal for T where
    T: TerminalSession + InstrumentCatalog + HistoryDownloader + HistoryReader
{
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use crate::models::{adjustment::Adjustment, bar::{Bar, BarKey}};

    use super::*;

    #[derive(Default)]
    struct Recording {
        downloads: Mutex<Vec<(String, Period)>>,
    }

    #[async_trait]
    impl TerminalSession for Recording {
        async fn is_connected(&self) -> bool {
            true
        }
    }

    #[async_trait]
    impl InstrumentCatalog for Recording {
        async fn list_instruments_in_group(
            &self,
            _group: &str,
        ) -> Result<Vec<String>, ProviderError> {
            Ok(vec!["a00.DF".into(), "a2409.DF".into()])
        }

        async fn instrument_detail(
            &self,
            _long_id: &str,
        ) -> Result<Option<InstrumentDetail>, ProviderError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl HistoryDownloader for Recording {
        async fn download_range(
            &self,
            long_id: &str,
            period: Period,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<(), ProviderError> {
            self.downloads.lock().unwrap().push((long_id.to_string(), period));
            Ok(())
        }
    }

    #[async_trait]
    impl HistoryReader for Recording {
        async fn read_range(
            &self,
            params: &BarsRequestParams,
        ) -> Result<Vec<BarSeries>, ProviderError> {
            Ok(params
                .instrument_ids
                .iter()
                .map(|id| BarSeries {
                    instrument_id: id.clone(),
                    period: params.period,
                    bars: vec![Bar::new(BarKey::new(1))],
                })
                .collect())
        }
    }

    // Picked at runtime, used only through the trait object.
    fn boxed() -> Box<dyn Terminal> {
        Box::new(Recording::default())
    }

    #[tokio::test]
    async fn terminal_is_usable_as_a_trait_object() {
        let terminal = boxed();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        assert!(terminal.is_connected().await);
        terminal
            .download_range("a00.DF", Period::Tick, start, end)
            .await
            .unwrap();

        let params = BarsRequestParams {
            instrument_ids: vec!["a00.DF".into()],
            period: "1d".parse().unwrap(),
            adjustment: Adjustment::Raw,
            start,
            end,
        };
        let series = terminal.read_range(&params).await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].bars.len(), 1);
    }
}
