use crate::column::ColumnModel;
use crate::column::DataType;
use crate::format::coerce_date;
use crate::format::coerce_number;
use crate::row::RowArena;
use crate::row::RowId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// The single active sort column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortColumn {
    pub id: String,
    pub ascending: bool,
}

impl SortColumn {
    pub fn new(id: impl Into<String>, ascending: bool) -> Self {
        Self {
            id: id.into(),
            ascending,
        }
    }
}

/// Comparison key extracted once per row before sorting.
///
/// Rows whose value fails numeric/date parsing sort last regardless of
/// direction, matching the data-shape error policy.
#[derive(Clone, Debug, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
    Missing,
}

/// Reorders `ids` by the resolved value of the sort column. Stable: rows
/// with equal keys keep their incoming relative order. The input order is
/// the pre-sort order, so ascending→descending→ascending round-trips tied
/// runs back to where they started.
pub fn sort_ids(
    arena: &RowArena,
    columns: &ColumnModel,
    ids: &mut Vec<RowId>,
    sort: Option<&SortColumn>,
) {
    let Some(sort) = sort else {
        return;
    };
    let Some(column) = columns.get(&sort.id) else {
        log::warn!("sort: unknown column `{}`", sort.id);
        return;
    };
    let keys: Vec<(RowId, SortKey)> = ids
        .iter()
        .map(|&id| {
            let key = arena
                .get(id)
                .and_then(|row| columns.resolve_field(row, column))
                .map(|value| extract_key(column.data_type, value))
                .unwrap_or(SortKey::Missing);
            (id, key)
        })
        .collect();
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| {
        // Missing keys pin to the end in either direction.
        match (&keys[a].1, &keys[b].1) {
            (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
            (SortKey::Missing, _) => Ordering::Greater,
            (_, SortKey::Missing) => Ordering::Less,
            (ka, kb) => {
                let ord = compare_keys(ka, kb);
                if sort.ascending { ord } else { ord.reverse() }
            }
        }
    });
    *ids = order.into_iter().map(|i| keys[i].0).collect();
}

fn extract_key(data_type: DataType, value: &Value) -> SortKey {
    match data_type {
        DataType::Number => coerce_number(value)
            .map(SortKey::Number)
            .unwrap_or(SortKey::Missing),
        DataType::Date => coerce_date(value)
            .map(|dt| SortKey::Number(dt.and_utc().timestamp() as f64))
            .unwrap_or(SortKey::Missing),
        DataType::Bool => SortKey::Number(if value.as_bool().unwrap_or(false) {
            1.0
        } else {
            0.0
        }),
        DataType::Text => SortKey::Text(text_key(value)),
        DataType::Auto => match value {
            Value::Null => SortKey::Missing,
            Value::Number(_) => coerce_number(value)
                .map(SortKey::Number)
                .unwrap_or(SortKey::Missing),
            Value::Bool(b) => SortKey::Number(if *b { 1.0 } else { 0.0 }),
            other => SortKey::Text(text_key(other)),
        },
    }
}

fn text_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

/// Missing keys sort after everything; mixed number/text compares the
/// number first (numbers before text).
fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
        (SortKey::Missing, _) => Ordering::Greater,
        (_, SortKey::Missing) => Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
    }
}
