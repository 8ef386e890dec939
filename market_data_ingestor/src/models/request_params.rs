use chrono::{DateTime, Utc};

use crate::models::{adjustment::Adjustment, period::Period};

/// Parameters for reading cached history out of the terminal.
///
/// The window is inclusive on both ends, matching the terminal's own
/// `start_time`/`end_time` semantics.
#[derive(Clone, Debug, PartialEq)]
pub struct BarsRequestParams {
    /// Long instrument ids, e.g. `["rb00.SF"]`.
    pub instrument_ids: Vec<String>,

    pub period: Period,

    pub adjustment: Adjustment,

    pub start: DateTime<Utc>,

    pub end: DateTime<Utc>,
}
