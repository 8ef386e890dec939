use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use reqwest::{Client, Response, StatusCode, Url, header};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shared_utils::env::get_env_var;
use tracing::{debug, warn};

use crate::{
    models::{
        bar_series::BarSeries, instrument::InstrumentDetail, period::Period,
        request_params::BarsRequestParams,
    },
    providers::{
        HistoryDownloader, HistoryReader, InstrumentCatalog, ProviderError, ProviderInitError,
        TerminalSession,
        gateway::{
            params::{construct_download, construct_read},
            response::{
                DetailResponse, DownloadResponse, InstrumentListResponse, ReadResponse,
                SessionResponse, rows_to_bars,
            },
        },
    },
};

/// Environment variable holding the gateway bearer token.
pub const TOKEN_ENV: &str = "TERMINAL_TOKEN";

/// Connection settings for [`GatewayTerminal`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Timezone the terminal interprets `start_time`/`end_time` in.
    pub terminal_tz: Tz,
    /// Offset bar keys are rendered at.
    pub key_offset: FixedOffset,
}

/// HTTP/JSON client for a terminal gateway process.
pub struct GatewayTerminal {
    client: Client,
    base_url: Url,
    terminal_tz: Tz,
    key_offset: FixedOffset,
    _token: SecretString,
}

impl GatewayTerminal {
    /// Creates a client, reading the token from `TERMINAL_TOKEN`.
    pub fn connect(config: GatewayConfig) -> Result<Self, ProviderInitError> {
        let token = SecretString::new(get_env_var(TOKEN_ENV)?.into());
        Self::with_token(config, token)
    }

    pub fn with_token(
        config: GatewayConfig,
        token: SecretString,
    ) -> Result<Self, ProviderInitError> {
        let mut raw = config.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw).map_err(|e| ProviderInitError::BaseUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;

        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))?;
        auth.set_sensitive(true);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            terminal_tz: config.terminal_tz,
            key_offset: config.key_offset,
            _token: token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::Validation(format!("bad endpoint {path:?}: {e}")))
    }

    async fn session(&self) -> Result<SessionResponse, ProviderError> {
        let response = self.client.get(self.endpoint("session")?).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        if !response.status().is_success() {
            let status = response.status();
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return Err(ProviderError::Api(format!("{status}: {error_msg}")));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TerminalSession for GatewayTerminal {
    async fn is_connected(&self) -> bool {
        match self.session().await {
            Ok(session) => session.connected,
            Err(e) => {
                warn!(error = %e, "terminal session probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl InstrumentCatalog for GatewayTerminal {
    async fn list_instruments_in_group(&self, group: &str) -> Result<Vec<String>, ProviderError> {
        let mut url = self.endpoint("sectors/")?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Validation("gateway URL cannot be a base".into()))?
            .pop_if_empty()
            .extend([group, "instruments"]);
        let response = self.client.get(url).send().await?;
        let list = Self::decode::<InstrumentListResponse>(response).await?;
        debug!(group, count = list.instruments.len(), "listed sector instruments");
        Ok(list.instruments)
    }

    async fn instrument_detail(
        &self,
        long_id: &str,
    ) -> Result<Option<InstrumentDetail>, ProviderError> {
        let mut url = self.endpoint("instruments/")?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Validation("gateway URL cannot be a base".into()))?
            .pop_if_empty()
            .push(long_id);
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Self::decode::<DetailResponse>(response).await?.detail)
    }
}

#[async_trait]
impl HistoryDownloader for GatewayTerminal {
    async fn download_range(
        &self,
        long_id: &str,
        period: Period,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ProviderError> {
        let body = construct_download(long_id, period, start, end, self.terminal_tz)?;
        let response = self
            .client
            .post(self.endpoint("history/download")?)
            .json(&body)
            .send()
            .await?;
        match Self::decode::<DownloadResponse>(response).await?.error {
            Some(message) => Err(ProviderError::Api(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HistoryReader for GatewayTerminal {
    async fn read_range(
        &self,
        params: &BarsRequestParams,
    ) -> Result<Vec<BarSeries>, ProviderError> {
        let body = construct_read(params, self.terminal_tz)?;
        let response = self
            .client
            .post(self.endpoint("history/read")?)
            .json(&body)
            .send()
            .await?;
        let payload = Self::decode::<ReadResponse>(response).await?;

        payload
            .data
            .into_iter()
            .map(|(instrument_id, rows)| {
                Ok(BarSeries {
                    instrument_id,
                    period: params.period,
                    bars: rows_to_bars(rows, self.key_offset)?,
                })
            })
            .collect()
    }
}
