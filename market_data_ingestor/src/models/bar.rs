//! Canonical in-memory representation of one bar (or tick) observation.
//!
//! A [`Bar`] is a sortable [`BarKey`] plus an opaque, ordered payload of named
//! fields. Nothing downstream of the providers interprets the payload:
//! merge, dedup and persistence only ever look at the key.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Fixed-width `YYYYMMDDHHMMSSmmm` timestamp key.
///
/// The key is built after the bar time has been shifted to a single fixed UTC
/// offset, so numeric order and chronological order coincide. Arbitrary
/// integers are accepted through [`BarKey::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BarKey(i64);

impl BarKey {
    /// Wrap a raw key value.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Build the key for an epoch-millisecond timestamp seen at `offset`.
    ///
    /// Returns `None` when the instant is out of chrono's range or falls
    /// outside years 0..=9999 (the key would no longer be fixed width).
    pub fn from_epoch_millis(ms: i64, offset: FixedOffset) -> Option<Self> {
        let local = DateTime::<Utc>::from_timestamp_millis(ms)?.with_timezone(&offset);
        let year = i64::from(local.year());
        if !(0..=9999).contains(&year) {
            return None;
        }
        let raw = year * 10_000_000_000_000
            + i64::from(local.month()) * 100_000_000_000
            + i64::from(local.day()) * 1_000_000_000
            + i64::from(local.hour()) * 10_000_000
            + i64::from(local.minute()) * 100_000
            + i64::from(local.second()) * 1_000
            + i64::from(local.timestamp_subsec_millis().min(999));
        Some(Self(raw))
    }

    /// Calendar date encoded in the first eight digits, if the key is a real
    /// 17-digit timestamp key.
    pub fn trading_date(self) -> Option<NaiveDate> {
        let ymd = self.0.checked_div(1_000_000_000)?;
        let (y, m, d) = (ymd / 10_000, (ymd / 100) % 100, ymd % 100);
        NaiveDate::from_ymd_opt(i32::try_from(y).ok()?, m as u32, d as u32)
    }
}

impl fmt::Display for BarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:017}", self.0)
    }
}

/// One payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Missing value.
    Null,
    /// Integer value (volumes, epoch times, counts).
    Int(i64),
    /// Floating point value (prices, turnover).
    Float(f64),
    /// Free text.
    Text(String),
    /// Numeric list, such as the five level-2 quote levels of a tick.
    List(Vec<f64>),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(v: Vec<f64>) -> Self {
        Self::List(v)
    }
}

/// A single observation: key plus opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Sort and dedup key.
    pub key: BarKey,
    /// Payload columns in vendor order.
    pub fields: IndexMap<String, FieldValue>,
}

impl Bar {
    /// A bar with an empty payload.
    pub fn new(key: BarKey) -> Self {
        Self {
            key,
            fields: IndexMap::new(),
        }
    }

    /// Builder-style payload insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a payload field.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cst() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn key_from_millis_uses_fixed_offset() {
        // 2024-01-31T13:13:18.123Z is 21:13:18.123 at +08:00
        let key = BarKey::from_epoch_millis(1_706_706_798_123, cst()).unwrap();
        assert_eq!(key, BarKey::new(20240131211318123));
        assert_eq!(key.to_string(), "20240131211318123");
    }

    #[test]
    fn key_crossing_midnight_lands_on_next_local_day() {
        // 2024-03-01T16:00:00Z is midnight on 2024-03-02 at +08:00
        let key = BarKey::from_epoch_millis(1_709_308_800_000, cst()).unwrap();
        assert_eq!(key.get(), 20240302000000000);
        assert_eq!(
            key.trading_date(),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[test]
    fn small_keys_render_zero_padded_and_have_no_date() {
        let key = BarKey::new(300);
        assert_eq!(key.to_string(), "00000000000000300");
        assert_eq!(key.trading_date(), None);
    }

    #[test]
    fn payload_values_deserialize_untagged() {
        let body = r#"{"time": 1706706798123, "close": 3951.5, "code": "a00", "oi": null}"#;
        let row: IndexMap<String, FieldValue> = serde_json::from_str(body).unwrap();
        assert_eq!(row["time"], FieldValue::Int(1_706_706_798_123));
        assert_eq!(row["close"], FieldValue::Float(3951.5));
        assert_eq!(row["code"], FieldValue::Text("a00".into()));
        assert_eq!(row["oi"], FieldValue::Null);
    }

    #[test]
    fn level2_arrays_deserialize_as_lists() {
        let body = r#"{"askPrice": [4101.0, 0, 0, 0, 0], "bidVol": [3, 1, 0, 0, 0]}"#;
        let row: IndexMap<String, FieldValue> = serde_json::from_str(body).unwrap();
        assert_eq!(row["askPrice"], FieldValue::List(vec![4101.0, 0.0, 0.0, 0.0, 0.0]));
        assert_eq!(row["bidVol"], FieldValue::List(vec![3.0, 1.0, 0.0, 0.0, 0.0]));
    }
}
