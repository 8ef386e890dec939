//! Instrument discovery and registration.
//!
//! Lists a terminal sector, keeps the ids matching the category filter,
//! resolves each id's detail record, joins it with the configured exchange on
//! the detail's `ExchangeID`, and registers the result. Registration refreshes
//! metadata but never touches existing progress.

use diesel::SqliteConnection;
use market_data_ingestor::{
    models::{
        bar::FieldValue,
        instrument::{Instrument, InstrumentDetail},
    },
    providers::InstrumentCatalog,
};
use tracing::{info, warn};

use crate::{
    config::CategoryPlan,
    error::SyncError,
    models::ExchangeRow,
    progress::{ProgressStore, RegisterCounts},
};

/// Outcome of [`register_category`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterReport {
    /// Ids listed in the sector that passed the filter.
    pub discovered: usize,
    /// Stored counts.
    pub counts: RegisterCounts,
    /// Ids that could not be registered, with the reason.
    pub skipped: Vec<(String, String)>,
}

fn text_field<'a>(detail: &'a InstrumentDetail, name: &str) -> Option<&'a str> {
    match detail.get(name) {
        Some(FieldValue::Text(s)) if !s.trim().is_empty() => Some(s.trim()),
        _ => None,
    }
}

/// Build an [`Instrument`] from a terminal detail record and the exchanges of
/// its category.
pub fn resolve_instrument(
    plan: &CategoryPlan,
    detail: InstrumentDetail,
    exchanges: &[ExchangeRow],
) -> Result<Instrument, String> {
    let instrument_id = text_field(&detail, "InstrumentID").ok_or("detail has no InstrumentID")?;
    let exchange_id = text_field(&detail, "ExchangeID").ok_or("detail has no ExchangeID")?;
    let exchange = exchanges
        .iter()
        .find(|e| e.exchange_id == exchange_id)
        .ok_or_else(|| format!("exchange {exchange_id} is not configured for {}", plan.category))?;
    let display_name = text_field(&detail, "ProductName")
        .or_else(|| text_field(&detail, "InstrumentName"))
        .unwrap_or(instrument_id);

    Ok(Instrument {
        long_id: Instrument::long_id_of(instrument_id, &exchange.xt_exchange_id),
        instrument_id: instrument_id.to_string(),
        category: plan.category,
        xt_exchange_id: exchange.xt_exchange_id.clone(),
        exchange_id: exchange.exchange_id.clone(),
        exchange_name: exchange.exchange_name.clone(),
        display_name: display_name.to_string(),
        detail,
    })
}

/// Seed exchanges, discover the category's instruments and register them.
///
/// Per-id failures (unknown id, unconfigured exchange) are logged and
/// reported in [`RegisterReport::skipped`]; listing and storage failures abort.
pub async fn register_category<C, S>(
    catalog: &C,
    store: &S,
    conn: &mut SqliteConnection,
    plan: &CategoryPlan,
    seed: &[ExchangeRow],
) -> Result<RegisterReport, SyncError>
where
    C: InstrumentCatalog + ?Sized,
    S: ProgressStore + ?Sized,
{
    if !seed.is_empty() {
        store.upsert_exchanges(conn, seed)?;
    }
    let exchanges = store.exchanges(conn, plan.category)?;

    let ids = catalog.list_instruments_in_group(&plan.group).await?;
    let ids: Vec<String> = ids.into_iter().filter(|id| plan.accepts(id)).collect();

    let mut report = RegisterReport {
        discovered: ids.len(),
        ..Default::default()
    };
    let mut instruments = Vec::with_capacity(ids.len());
    for id in ids {
        let resolved = match catalog.instrument_detail(&id).await {
            Ok(Some(detail)) => resolve_instrument(plan, detail, &exchanges),
            Ok(None) => Err("terminal has no detail record".to_string()),
            Err(e) => Err(e.to_string()),
        };
        match resolved {
            Ok(instrument) => instruments.push(instrument),
            Err(reason) => {
                warn!(id, %reason, "instrument skipped");
                report.skipped.push((id, reason));
            }
        }
    }

    report.counts = store.register(conn, &instruments)?;
    info!(
        category = %plan.category,
        group = %plan.group,
        discovered = report.discovered,
        inserted = report.counts.inserted,
        refreshed = report.counts.refreshed,
        skipped = report.skipped.len(),
        "instruments registered"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use market_data_ingestor::models::instrument::InstrumentCategory;

    use super::*;

    fn detail(pairs: &[(&str, &str)]) -> InstrumentDetail {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect()
    }

    fn dce() -> Vec<ExchangeRow> {
        vec![ExchangeRow {
            xt_exchange_id: "DF".into(),
            category: "FUTURE".into(),
            exchange_id: "DCE".into(),
            exchange_name: "大商所".into(),
        }]
    }

    #[test]
    fn long_id_uses_the_terminal_market_code() {
        let plan = CategoryPlan::default_for(InstrumentCategory::Future);
        let ins = resolve_instrument(
            &plan,
            detail(&[("InstrumentID", "a00"), ("ExchangeID", "DCE"), ("ProductName", "豆一")]),
            &dce(),
        )
        .unwrap();
        assert_eq!(ins.long_id, "a00.DF");
        assert_eq!(ins.display_name, "豆一");
        assert_eq!(ins.exchange_name, "大商所");
        assert_eq!(ins.detail.len(), 3);
    }

    #[test]
    fn unknown_exchange_or_missing_id_is_rejected() {
        let plan = CategoryPlan::default_for(InstrumentCategory::Future);
        let err = resolve_instrument(
            &plan,
            detail(&[("InstrumentID", "rb00"), ("ExchangeID", "SHFE")]),
            &dce(),
        )
        .unwrap_err();
        assert!(err.contains("SHFE"));
        assert!(resolve_instrument(&plan, detail(&[("ExchangeID", "DCE")]), &dce()).is_err());
    }

    #[test]
    fn display_name_falls_back_to_instrument_name_then_id() {
        let plan = CategoryPlan::default_for(InstrumentCategory::Future);
        let named = resolve_instrument(
            &plan,
            detail(&[
                ("InstrumentID", "a00"),
                ("ExchangeID", "DCE"),
                ("InstrumentName", "豆一主连"),
            ]),
            &dce(),
        )
        .unwrap();
        assert_eq!(named.display_name, "豆一主连");
        let bare_detail = detail(&[("InstrumentID", "a00"), ("ExchangeID", "DCE")]);
        let bare = resolve_instrument(&plan, bare_detail, &dce()).unwrap();
        assert_eq!(bare.display_name, "a00");
    }
}
