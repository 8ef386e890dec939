//! Bar periods understood by the terminal: `tick` plus `{n}{m|h|d|w}` bars.

use std::{fmt, num::NonZeroU32, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid period {input:?}: {message}")]
    InvalidInput { input: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeframeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeframeUnit {
    fn suffix(self) -> char {
        match self {
            TimeframeUnit::Minute => 'm',
            TimeframeUnit::Hour => 'h',
            TimeframeUnit::Day => 'd',
            TimeframeUnit::Week => 'w',
        }
    }
}

/// Aggregated bar width, e.g. 15 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeframe {
    pub amount: NonZeroU32,
    pub unit: TimeframeUnit,
}

/// One requestable series period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    /// Raw trade ticks.
    Tick,
    /// Aggregated bars.
    Bars(Timeframe),
}

impl Period {
    /// `None` when `amount` is zero.
    pub fn bars(amount: u32, unit: TimeframeUnit) -> Option<Self> {
        NonZeroU32::new(amount).map(|amount| Period::Bars(Timeframe { amount, unit }))
    }

    pub fn is_tick(self) -> bool {
        matches!(self, Period::Tick)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Tick => f.write_str("tick"),
            Period::Bars(tf) => write!(f, "{}{}", tf.amount, tf.unit.suffix()),
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_lowercase();
        let invalid = |message: &str| PeriodError::InvalidInput {
            input: s.to_string(),
            message: message.to_string(),
        };
        if input == "tick" {
            return Ok(Period::Tick);
        }
        let Some(suffix) = input.chars().last() else {
            return Err(invalid("empty period"));
        };
        let unit = match suffix {
            'm' => TimeframeUnit::Minute,
            'h' => TimeframeUnit::Hour,
            'd' => TimeframeUnit::Day,
            'w' => TimeframeUnit::Week,
            _ => return Err(invalid("expected tick or a m/h/d/w suffix")),
        };
        let digits = &input[..input.len() - 1];
        let amount: u32 = digits
            .parse()
            .map_err(|_| invalid("amount must be a positive integer"))?;
        Period::bars(amount, unit).ok_or_else(|| invalid("amount must be non-zero"))
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}
