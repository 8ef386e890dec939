use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Price adjustment ("dividend type") applied when reading history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Unadjusted prices.
    #[default]
    #[serde(rename = "none")]
    Raw,
    Front,
    Back,
    FrontRatio,
    BackRatio,
}

impl Adjustment {
    pub fn as_str(self) -> &'static str {
        match self {
            Adjustment::Raw => "none",
            Adjustment::Front => "front",
            Adjustment::Back => "back",
            Adjustment::FrontRatio => "front_ratio",
            Adjustment::BackRatio => "back_ratio",
        }
    }

    /// Adjusted series are recomputed over the whole history whenever a new
    /// corporate action lands, so they cannot be appended incrementally.
    pub fn rewrites_history(self) -> bool {
        !matches!(self, Adjustment::Raw)
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Adjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Adjustment::Raw),
            "front" => Ok(Adjustment::Front),
            "back" => Ok(Adjustment::Back),
            "front_ratio" => Ok(Adjustment::FrontRatio),
            "back_ratio" => Ok(Adjustment::BackRatio),
            other => Err(format!("unknown adjustment: {other}")),
        }
    }
}
