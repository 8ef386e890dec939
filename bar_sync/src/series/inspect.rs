//! Offline summary of a series file: size, key range and bars per day.

use std::{collections::BTreeMap, fmt};

use chrono::{Datelike, NaiveDate, Weekday};
use indexmap::IndexSet;
use market_data_ingestor::models::bar::{Bar, BarKey};

/// Bars counted for one calendar day of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    /// Day taken from the first eight key digits.
    pub date: NaiveDate,
    /// Bars on that day.
    pub bars: usize,
}

impl DailyCount {
    /// Day of week.
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }
}

/// Result of [`summarize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSummary {
    /// Total rows.
    pub rows: usize,
    /// Payload columns in first-seen order.
    pub columns: Vec<String>,
    /// Smallest key.
    pub first: Option<BarKey>,
    /// Largest key.
    pub last: Option<BarKey>,
    /// Per-day counts for the most recent days, oldest first.
    pub days: Vec<DailyCount>,
    /// Rows whose key does not encode a calendar date.
    pub undated: usize,
}

/// Summarize `bars`, keeping counts for at most `last_days` days.
pub fn summarize(bars: &[Bar], last_days: usize) -> SeriesSummary {
    let mut columns: IndexSet<&str> = IndexSet::new();
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut undated = 0;
    for bar in bars {
        columns.extend(bar.fields.keys().map(String::as_str));
        match bar.key.trading_date() {
            Some(date) => *per_day.entry(date).or_default() += 1,
            None => undated += 1,
        }
    }

    let skip = per_day.len().saturating_sub(last_days);
    SeriesSummary {
        rows: bars.len(),
        columns: columns.into_iter().map(str::to_string).collect(),
        first: bars.iter().map(|b| b.key).min(),
        last: bars.iter().map(|b| b.key).max(),
        days: per_day
            .into_iter()
            .skip(skip)
            .map(|(date, bars)| DailyCount { date, bars })
            .collect(),
        undated,
    }
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows: {}", self.rows)?;
        writeln!(f, "columns: {}", self.columns.join(", "))?;
        match (self.first, self.last) {
            (Some(first), Some(last)) => writeln!(f, "range: {first} .. {last}")?,
            _ => writeln!(f, "range: empty")?,
        }
        if self.undated > 0 {
            writeln!(f, "undated rows: {}", self.undated)?;
        }
        write!(f, "bars per day (last {} days):", self.days.len())?;
        for day in &self.days {
            write!(f, "\n{} {} {}", day.date, day.weekday(), day.bars)?;
        }
        Ok(())
    }
}
