//! A collection of bars for one instrument and period.

use crate::models::{bar::Bar, period::Period};

/// Self-describing set of bars returned by a history read.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    /// Long instrument id the data belongs to.
    pub instrument_id: String,
    pub period: Period,
    /// Bars in the order the vendor returned them; not necessarily sorted.
    pub bars: Vec<Bar>,
}
