//! Ordered, deduplicated bar series and the merge that grows them.
//!
//! [`merge_append`] is pure; [`store::SeriesStore`] wraps it with the file
//! read, the shrink guard and the atomic replace.

use market_data_ingestor::models::bar::{Bar, BarKey};
use thiserror::Error;

pub mod inspect;
pub mod store;

/// Bars with strictly increasing keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    /// The bars in key order.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Consume into the bar vector.
    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// True when the series holds no bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Smallest key.
    pub fn first_key(&self) -> Option<BarKey> {
        self.bars.first().map(|b| b.key)
    }

    /// Largest key.
    pub fn last_key(&self) -> Option<BarKey> {
        self.bars.last().map(|b| b.key)
    }
}

/// The merge would have lost rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("merge shrank the series from {existing} to {merged} rows")]
pub struct MergeError {
    /// Rows in the existing series.
    pub existing: usize,
    /// Rows after merging.
    pub merged: usize,
}

/// Merge `incoming` into `existing`.
///
/// Rows are concatenated (existing first), stably sorted by key and
/// deduplicated keeping the last occurrence, so an incoming bar replaces a
/// stored bar with the same key. Fails when the result is shorter than
/// `existing`, which only happens when the stored data already held
/// duplicate keys.
pub fn merge_append(existing: Option<Vec<Bar>>, incoming: Vec<Bar>) -> Result<Series, MergeError> {
    let mut all = existing.unwrap_or_default();
    let existing_len = all.len();
    all.extend(incoming);
    all.sort_by_key(|b| b.key);

    let mut merged: Vec<Bar> = Vec::with_capacity(all.len());
    for bar in all {
        match merged.last_mut() {
            Some(last) if last.key == bar.key => *last = bar,
            _ => merged.push(bar),
        }
    }

    if merged.len() < existing_len {
        return Err(MergeError {
            existing: existing_len,
            merged: merged.len(),
        });
    }
    Ok(Series { bars: merged })
}

#[cfg(test)]
mod tests {
    use market_data_ingestor::models::bar::FieldValue;
    use proptest::prelude::*;

    use super::*;

    fn bar(key: i64, v: &str) -> Bar {
        Bar::new(BarKey::new(key)).with_field("v", v)
    }

    fn keys(series: &Series) -> Vec<i64> {
        series.bars().iter().map(|b| b.key.get()).collect()
    }

    #[test]
    fn incoming_wins_on_duplicate_keys() {
        let existing = vec![bar(100, "a"), bar(200, "b"), bar(300, "c")];
        let incoming = vec![bar(300, "new"), bar(400, "x")];

        let merged = merge_append(Some(existing), incoming).unwrap();

        assert_eq!(keys(&merged), [100, 200, 300, 400]);
        assert_eq!(merged.bars()[2].field("v"), Some(&FieldValue::Text("new".into())));
        assert_eq!(merged.bars()[3].field("v"), Some(&FieldValue::Text("x".into())));
    }

    #[test]
    fn absent_existing_is_empty() {
        let merged = merge_append(None, vec![bar(2, "b"), bar(1, "a"), bar(2, "c")]).unwrap();
        assert_eq!(keys(&merged), [1, 2]);
        assert_eq!(merged.bars()[1].field("v"), Some(&FieldValue::Text("c".into())));
        assert_eq!(merged.first_key(), Some(BarKey::new(1)));
        assert_eq!(merged.last_key(), Some(BarKey::new(2)));
    }

    #[test]
    fn empty_incoming_keeps_existing() {
        let existing = vec![bar(1, "a"), bar(2, "b")];
        let merged = merge_append(Some(existing.clone()), vec![]).unwrap();
        assert_eq!(merged.into_bars(), existing);
    }

    #[test]
    fn duplicated_stored_keys_trip_the_guard() {
        let existing = vec![bar(1, "a"), bar(1, "b"), bar(2, "c")];
        let err = merge_append(Some(existing), vec![]).unwrap_err();
        assert_eq!(err, MergeError { existing: 3, merged: 2 });
    }

    fn arb_bars(max: usize) -> impl Strategy<Value = Vec<Bar>> {
        prop::collection::vec((0i64..50, 0i64..1000), 0..max).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| Bar::new(BarKey::new(k)).with_field("v", v))
                .collect()
        })
    }

    fn arb_series(max: usize) -> impl Strategy<Value = Vec<Bar>> {
        arb_bars(max).prop_map(|bars| merge_append(None, bars).unwrap().into_bars())
    }

    proptest! {
        #[test]
        fn output_is_strictly_ascending(existing in arb_series(30), incoming in arb_bars(30)) {
            let merged = merge_append(Some(existing), incoming).unwrap();
            prop_assert!(merged.bars().windows(2).all(|w| w[0].key < w[1].key));
        }

        #[test]
        fn never_shrinks_and_keeps_every_key(existing in arb_series(30), incoming in arb_bars(30)) {
            let merged = merge_append(Some(existing.clone()), incoming.clone()).unwrap();
            prop_assert!(merged.len() >= existing.len());
            for b in existing.iter().chain(incoming.iter()) {
                prop_assert!(merged.bars().iter().any(|m| m.key == b.key));
            }
        }

        #[test]
        fn last_incoming_value_wins(existing in arb_series(30), incoming in arb_bars(30)) {
            let merged = merge_append(Some(existing), incoming.clone()).unwrap();
            for m in merged.bars() {
                if let Some(last) = incoming.iter().rev().find(|b| b.key == m.key) {
                    prop_assert_eq!(m, last);
                }
            }
        }

        #[test]
        fn merging_nothing_is_idempotent(existing in arb_series(30)) {
            let once = merge_append(Some(existing.clone()), vec![]).unwrap();
            prop_assert_eq!(once.bars(), existing.as_slice());
            let twice = merge_append(Some(once.into_bars()), vec![]).unwrap();
            prop_assert_eq!(twice.bars(), existing.as_slice());
        }

        #[test]
        fn input_order_does_not_matter_for_unique_keys(
            mut keys in prop::collection::hash_set(0i64..1000, 0..40)
                .prop_map(|s| s.into_iter().collect::<Vec<_>>())
        ) {
            let bars: Vec<Bar> = keys.iter().map(|k| Bar::new(BarKey::new(*k))).collect();
            let merged = merge_append(None, bars).unwrap();
            keys.sort_unstable();
            let got: Vec<i64> = merged.bars().iter().map(|b| b.key.get()).collect();
            prop_assert_eq!(got, keys);
        }
    }
}
