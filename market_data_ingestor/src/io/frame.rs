//! Mapping between keyed bars and Polars DataFrames.
//!
//! The frame always starts with an `Int64` [`KEY_COLUMN`]; payload columns
//! follow in first-seen order. Each payload column keeps one value type:
//! integers give `Int64`, floats give `Float64`, text gives `String` and
//! numeric lists give `List(Float64)`. The only mix allowed is integers with
//! floats, stored as `Float64`, and only while every integer is exact as an
//! `f64`. Any other mix is a conversion error, so a stored payload is never
//! rewritten into a different type. Missing values become nulls.

use indexmap::IndexMap;
use polars::prelude::*;
use snafu::ResultExt;

use crate::{
    io::sink::{ConversionSnafu, FrameSnafu, SinkError},
    models::bar::{Bar, BarKey, FieldValue},
};

pub const KEY_COLUMN: &str = "key";

/// Largest integer magnitude an `f64` holds exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Text,
    List,
}

impl ColumnKind {
    fn of(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => None,
            FieldValue::Int(_) => Some(Self::Int),
            FieldValue::Float(_) => Some(Self::Float),
            FieldValue::Text(_) => Some(Self::Text),
            FieldValue::List(_) => Some(Self::List),
        }
    }
}

fn unify(
    name: &str,
    current: Option<ColumnKind>,
    value: &FieldValue,
) -> Result<Option<ColumnKind>, SinkError> {
    let Some(seen) = ColumnKind::of(value) else {
        return Ok(current);
    };
    match (current, seen) {
        (None, kind) => Ok(Some(kind)),
        (Some(a), b) if a == b => Ok(Some(a)),
        (Some(ColumnKind::Int), ColumnKind::Float) | (Some(ColumnKind::Float), ColumnKind::Int) => {
            Ok(Some(ColumnKind::Float))
        }
        (Some(a), b) => ConversionSnafu {
            message: format!("column {name:?} mixes {a:?} and {b:?} values"),
        }
        .fail(),
    }
}

fn exact_float(name: &str, i: i64) -> Result<f64, SinkError> {
    if i.unsigned_abs() > MAX_EXACT_INT {
        return ConversionSnafu {
            message: format!(
                "column {name:?} mixes floats with integer {i}, which f64 cannot hold exactly"
            ),
        }
        .fail();
    }
    Ok(i as f64)
}

fn list_column(name: &str, values: &[Option<&FieldValue>]) -> Column {
    let inner: usize = values
        .iter()
        .map(|v| match v {
            Some(FieldValue::List(items)) => items.len(),
            _ => 0,
        })
        .sum();
    let mut builder = ListPrimitiveChunkedBuilder::<Float64Type>::new(
        name.into(),
        values.len(),
        inner,
        DataType::Float64,
    );
    for value in values {
        match value {
            Some(FieldValue::List(items)) => builder.append_slice(items),
            _ => builder.append_null(),
        }
    }
    builder.finish().into_series().into()
}

pub fn bars_to_frame(bars: &[Bar]) -> Result<DataFrame, SinkError> {
    let mut kinds: IndexMap<&str, Option<ColumnKind>> = IndexMap::new();
    for bar in bars {
        for (name, value) in &bar.fields {
            if name == KEY_COLUMN {
                return ConversionSnafu {
                    message: format!("payload field {KEY_COLUMN:?} collides with the key column"),
                }
                .fail();
            }
            let slot = kinds.entry(name.as_str()).or_insert(None);
            *slot = unify(name, *slot, value)?;
        }
    }

    let mut columns = Vec::with_capacity(kinds.len() + 1);
    columns.push(Column::new(
        KEY_COLUMN.into(),
        bars.iter().map(|b| b.key.get()).collect::<Vec<i64>>(),
    ));

    for (name, kind) in &kinds {
        let values: Vec<Option<&FieldValue>> = bars.iter().map(|b| b.fields.get(*name)).collect();
        let column = match kind.unwrap_or(ColumnKind::Int) {
            ColumnKind::Int => Column::new(
                (*name).into(),
                values
                    .iter()
                    .map(|v| match v {
                        Some(FieldValue::Int(i)) => Some(*i),
                        _ => None,
                    })
                    .collect::<Vec<Option<i64>>>(),
            ),
            ColumnKind::Float => Column::new(
                (*name).into(),
                values
                    .iter()
                    .map(|v| match v {
                        Some(FieldValue::Int(i)) => exact_float(name, *i).map(Some),
                        Some(FieldValue::Float(f)) => Ok(Some(*f)),
                        _ => Ok(None),
                    })
                    .collect::<Result<Vec<Option<f64>>, SinkError>>()?,
            ),
            ColumnKind::Text => Column::new(
                (*name).into(),
                values
                    .iter()
                    .map(|v| match v {
                        Some(FieldValue::Text(s)) => Some(s.clone()),
                        _ => None,
                    })
                    .collect::<Vec<Option<String>>>(),
            ),
            ColumnKind::List => list_column(name, &values),
        };
        columns.push(column);
    }

    DataFrame::new(columns).context(FrameSnafu)
}

pub fn frame_to_bars(df: &DataFrame) -> Result<Vec<Bar>, SinkError> {
    let key_column = df
        .column(KEY_COLUMN)
        .context(FrameSnafu)?
        .cast(&DataType::Int64)
        .context(FrameSnafu)?;
    let keys = key_column.i64().context(FrameSnafu)?;

    let mut bars = Vec::with_capacity(df.height());
    for (row, key) in keys.into_iter().enumerate() {
        let Some(key) = key else {
            return ConversionSnafu {
                message: format!("null key at row {row}"),
            }
            .fail();
        };
        bars.push(Bar::new(BarKey::new(key)));
    }

    for column in df.get_columns() {
        if column.name().as_str() == KEY_COLUMN {
            continue;
        }
        let name = column.name().to_string();
        for (bar, value) in bars.iter_mut().zip(column_values(column)?) {
            bar.fields.insert(name.clone(), value);
        }
    }
    Ok(bars)
}

fn column_values(column: &Column) -> Result<Vec<FieldValue>, SinkError> {
    let dtype = column.dtype();
    if matches!(dtype, DataType::Null) {
        return Ok(vec![FieldValue::Null; column.len()]);
    }
    if matches!(dtype, DataType::List(_)) {
        let lists = column.as_materialized_series().list().context(FrameSnafu)?;
        let mut out = Vec::with_capacity(lists.len());
        for row in lists {
            let Some(items) = row else {
                out.push(FieldValue::Null);
                continue;
            };
            let items = items.cast(&DataType::Float64).context(FrameSnafu)?;
            // null levels read back as NaN
            let levels = items
                .f64()
                .context(FrameSnafu)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            out.push(FieldValue::List(levels));
        }
        return Ok(out);
    }
    if dtype.is_float() {
        let cast = column.cast(&DataType::Float64).context(FrameSnafu)?;
        return Ok(cast
            .f64()
            .context(FrameSnafu)?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Float))
            .collect());
    }
    if dtype.is_integer() || matches!(dtype, DataType::Boolean) {
        let cast = column.cast(&DataType::Int64).context(FrameSnafu)?;
        return Ok(cast
            .i64()
            .context(FrameSnafu)?
            .into_iter()
            .map(|v| v.map_or(FieldValue::Null, FieldValue::Int))
            .collect());
    }
    let cast = column.cast(&DataType::String).context(FrameSnafu)?;
    Ok(cast
        .str()
        .context(FrameSnafu)?
        .into_iter()
        .map(|v| v.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string())))
        .collect())
}
