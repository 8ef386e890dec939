//! Time zone parsing and conversion helpers.
//!
//! - [`parse_ts_to_utc`] / [`to_rfc3339_millis`]: the RFC-3339 UTC strings the
//!   progress store persists.
//! - [`parse_compact_local`]: `YYYYMMDDHHMMSS` wall-clock times, the format
//!   used in configuration and by the terminal, resolved in an IANA zone.
//!   Rendering the other way is
//!   [`compact_time`](market_data_ingestor::providers::gateway::params::compact_time).
//!
//! Local times are only accepted at config/CLI edges; everything stored or
//! compared internally is UTC.

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use market_data_ingestor::providers::gateway::params::COMPACT_FORMAT;

/// RFC-3339 with offset -> UTC.
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// Format a UTC datetime as an RFC-3339 string with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Ambiguous wall times take the earlier instant; wall times inside a
/// clock-forward gap move to the first minute after it (at most 2 hours on).
fn resolve_local(naive: NaiveDateTime, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
        LocalResult::None => {
            let mut t = naive;
            for _ in 0..120 {
                t += chrono::Duration::minutes(1);
                if let LocalResult::Single(dt) = tz.from_local_datetime(&t) {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            Err(anyhow!("nonexistent local time {naive} in {tz}"))
        }
    }
}

/// Parse `YYYYMMDDHHMMSS` (or a bare `YYYYMMDD`, meaning midnight) as wall
/// time in `tz`.
pub fn parse_compact_local(s: &str, tz: Tz) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if !matches!(s.len(), 8 | 14) || !s.bytes().all(|b| b.is_ascii_digit()) {
        bail!("bad compact timestamp (want YYYYMMDD or YYYYMMDDHHMMSS): {s:?}");
    }
    let full = if s.len() == 8 {
        format!("{s}000000")
    } else {
        s.to_string()
    };
    let naive = NaiveDateTime::parse_from_str(&full, COMPACT_FORMAT)
        .with_context(|| format!("not a calendar time: {s}"))?;
    resolve_local(naive, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Shanghai;
    use market_data_ingestor::providers::gateway::params::compact_time;

    #[test]
    fn parse_rfc3339_offset_to_utc() {
        let got = parse_ts_to_utc("2024-03-10T09:30:00-05:00").expect("parse");
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap());
    }

    #[test]
    fn millis_round_trip_through_storage_format() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let s = to_rfc3339_millis(t);
        assert_eq!(s, "2024-06-01T00:00:00.000Z");
        assert_eq!(parse_ts_to_utc(&s).unwrap(), t);
    }

    #[test]
    fn compact_local_times_resolve_at_plus_eight() {
        let got = parse_compact_local("20240101000000", Shanghai).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2023, 12, 31, 16, 0, 0).unwrap());
        assert_eq!(compact_time(got, Shanghai), "20240101000000");

        let afternoon = parse_compact_local("20240131211318", Shanghai).unwrap();
        assert_eq!(afternoon, Utc.with_ymd_and_hms(2024, 1, 31, 13, 13, 18).unwrap());
    }

    #[test]
    fn bare_date_means_local_midnight() {
        let day_only = parse_compact_local(" 20240601 ", Shanghai).unwrap();
        assert_eq!(day_only, Utc.with_ymd_and_hms(2024, 5, 31, 16, 0, 0).unwrap());
        assert_eq!(day_only, parse_compact_local("20240601000000", Shanghai).unwrap());
    }

    #[test]
    fn malformed_compact_strings_are_rejected() {
        for bad in [
            "",
            "2024-01-01",
            "202401010000",
            "2024010100000x",
            "+20240101000000",
            "20240101000000000",
        ] {
            assert!(parse_compact_local(bad, Shanghai).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn impossible_calendar_values_are_rejected() {
        for bad in ["20240230", "20231301000000", "20240101250000", "20240101006000"] {
            let err = parse_compact_local(bad, Shanghai).unwrap_err();
            assert!(err.to_string().contains("not a calendar time"), "{bad}: {err}");
        }
        // leap day exists in 2024
        assert!(parse_compact_local("20240229", Shanghai).is_ok());
    }
}
