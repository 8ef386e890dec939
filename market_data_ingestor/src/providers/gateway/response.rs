use chrono::FixedOffset;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    models::{
        bar::{Bar, BarKey, FieldValue},
        instrument::InstrumentDetail,
    },
    providers::ProviderError,
};

/// Name of the epoch-millisecond column every history row carries.
pub const TIME_FIELD: &str = "time";

pub type GatewayRow = IndexMap<String, FieldValue>;

#[derive(Deserialize, Debug)]
pub struct SessionResponse {
    pub connected: bool,
}

#[derive(Deserialize, Debug)]
pub struct InstrumentListResponse {
    pub instruments: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct DetailResponse {
    pub detail: Option<InstrumentDetail>,
}

#[derive(Deserialize, Debug)]
pub struct DownloadResponse {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ReadResponse {
    pub data: IndexMap<String, Vec<GatewayRow>>,
}

/// Convert raw history rows into keyed bars. The full row, `time`
/// included, stays in the payload.
pub fn rows_to_bars(
    rows: Vec<GatewayRow>,
    key_offset: FixedOffset,
) -> Result<Vec<Bar>, ProviderError> {
    rows.into_iter()
        .map(|fields| {
            let ms = match fields.get(TIME_FIELD) {
                Some(FieldValue::Int(ms)) => *ms,
                Some(FieldValue::Float(ms)) if ms.fract() == 0.0 => *ms as i64,
                other => {
                    return Err(ProviderError::Internal(format!(
                        "history row without an integer `{TIME_FIELD}` field: {other:?}"
                    )));
                }
            };
            let key = BarKey::from_epoch_millis(ms, key_offset).ok_or_else(|| {
                ProviderError::Internal(format!("bar time {ms} is out of range"))
            })?;
            Ok(Bar { key, fields })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_become_bars_keyed_by_local_time() {
        let body = r#"{"data": {"a00.DF": [
            {"time": 1706706798123, "open": 4100.0, "volume": 12},
            {"time": 1706706800000.0, "open": 4101.0, "volume": 3}
        ]}}"#;
        let mut resp: ReadResponse = serde_json::from_str(body).unwrap();
        let rows = resp.data.shift_remove("a00.DF").unwrap();
        let bars = rows_to_bars(rows, FixedOffset::east_opt(8 * 3600).unwrap()).unwrap();

        assert_eq!(bars[0].key.get(), 20240131211318123);
        assert_eq!(bars[1].key.get(), 20240131211320000);
        assert_eq!(bars[0].field("volume"), Some(&FieldValue::Int(12)));
        assert!(bars[0].field(TIME_FIELD).is_some());
    }

    #[test]
    fn tick_rows_with_quote_levels_parse() {
        let body = r#"{"data": {"a00.DF": [
            {"time": 1706706798123, "lastPrice": 4100.0, "volume": 12,
             "askPrice": [4101.0, 0, 0, 0, 0], "bidPrice": [4099.0, 0, 0, 0, 0],
             "askVol": [5, 0, 0, 0, 0], "bidVol": [7, 0, 0, 0, 0]}
        ]}}"#;
        let mut resp: ReadResponse = serde_json::from_str(body).unwrap();
        let rows = resp.data.shift_remove("a00.DF").unwrap();
        let bars = rows_to_bars(rows, FixedOffset::east_opt(8 * 3600).unwrap()).unwrap();

        assert_eq!(bars[0].key.get(), 20240131211318123);
        assert_eq!(
            bars[0].field("askPrice"),
            Some(&FieldValue::List(vec![4101.0, 0.0, 0.0, 0.0, 0.0]))
        );
        assert_eq!(
            bars[0].field("bidVol"),
            Some(&FieldValue::List(vec![7.0, 0.0, 0.0, 0.0, 0.0]))
        );
    }

    #[test]
    fn row_without_time_is_an_error() {
        let row: GatewayRow = serde_json::from_str(r#"{"open": 1.0}"#).unwrap();
        let err = rows_to_bars(vec![row], FixedOffset::east_opt(0).unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::Internal(_)));
    }
}
