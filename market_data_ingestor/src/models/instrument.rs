use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::bar::FieldValue;

/// Vendor detail record kept verbatim for an instrument.
pub type InstrumentDetail = IndexMap<String, FieldValue>;

/// Broad instrument family. Drives the period list, adjustment variants and
/// the storage sub-directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstrumentCategory {
    Future,
    Stock,
}

impl InstrumentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentCategory::Future => "FUTURE",
            InstrumentCategory::Stock => "STOCK",
        }
    }
}

impl fmt::Display for InstrumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FUTURE" | "FUTURES" => Ok(InstrumentCategory::Future),
            "STOCK" | "STOCKS" => Ok(InstrumentCategory::Stock),
            other => Err(format!("unknown instrument category: {other}")),
        }
    }
}

/// A tradable series as known to the terminal, joined with its exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    /// `{instrument_id}.{xt_exchange_id}`, the globally unique key.
    pub long_id: String,
    pub instrument_id: String,
    pub category: InstrumentCategory,
    pub xt_exchange_id: String,
    pub exchange_id: String,
    /// Human readable exchange name used in file names.
    pub exchange_name: String,
    pub display_name: String,
    pub detail: InstrumentDetail,
}

impl Instrument {
    /// Compose the long id the terminal uses for history requests.
    pub fn long_id_of(instrument_id: &str, xt_exchange_id: &str) -> String {
        format!("{instrument_id}.{xt_exchange_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_its_label() {
        for c in [InstrumentCategory::Future, InstrumentCategory::Stock] {
            assert_eq!(c.as_str().parse::<InstrumentCategory>().unwrap(), c);
        }
        assert_eq!("future".parse::<InstrumentCategory>().unwrap(), InstrumentCategory::Future);
        assert!("bond".parse::<InstrumentCategory>().is_err());
    }

    #[test]
    fn long_id_joins_with_a_dot() {
        assert_eq!(Instrument::long_id_of("rb00", "SF"), "rb00.SF");
    }
}
