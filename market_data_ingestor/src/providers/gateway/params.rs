use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    models::{period::Period, request_params::BarsRequestParams},
    providers::ProviderError,
};

/// Body of `POST /history/download`.
#[derive(Debug, Serialize, PartialEq)]
pub struct DownloadRequest<'a> {
    pub stock_code: &'a str,
    pub period: String,
    pub start_time: String,
    pub end_time: String,
}

/// Body of `POST /history/read`.
#[derive(Debug, Serialize, PartialEq)]
pub struct ReadRequest<'a> {
    pub stock_list: &'a [String],
    pub period: String,
    pub start_time: String,
    pub end_time: String,
    pub dividend_type: &'static str,
    pub fill_data: bool,
}

/// Wall-clock layout the terminal speaks.
pub const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";

/// `YYYYMMDDHHMMSS` wall-clock time in the terminal's timezone.
pub fn compact_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(COMPACT_FORMAT).to_string()
}

pub fn construct_download<'a>(
    long_id: &'a str,
    period: Period,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
) -> Result<DownloadRequest<'a>, ProviderError> {
    if long_id.trim().is_empty() {
        return Err(ProviderError::Validation("empty instrument id".into()));
    }
    Ok(DownloadRequest {
        stock_code: long_id,
        period: period.to_string(),
        start_time: compact_time(start, tz),
        end_time: compact_time(end, tz),
    })
}

pub fn construct_read(
    params: &BarsRequestParams,
    tz: Tz,
) -> Result<ReadRequest<'_>, ProviderError> {
    if params.instrument_ids.is_empty() {
        return Err(ProviderError::Validation("no instrument ids requested".into()));
    }
    Ok(ReadRequest {
        stock_list: &params.instrument_ids,
        period: params.period.to_string(),
        start_time: compact_time(params.start, tz),
        end_time: compact_time(params.end, tz),
        dividend_type: params.adjustment.as_str(),
        // gap filling would invent bars the merge cannot tell apart from real ones
        fill_data: false,
    })
}
