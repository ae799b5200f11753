use crate::column::ColumnDescriptor;
use crate::column::ColumnModel;
use crate::column::DataType;
use crate::format::coerce_date;
use crate::format::coerce_number;
use crate::row::RowRecord;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Built-in filter operator vocabulary. Conditions across columns are
/// AND-combined; a row passes iff every condition matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    Equals,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterEquals,
    LessEquals,
    IsEmpty,
    IsNotEmpty,
    Selected,
    NotSelected,
    InRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column_id: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

impl FilterCondition {
    pub fn new(column_id: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            column_id: column_id.into(),
            operator,
            value,
        }
    }
}

/// Everything a column-supplied predicate override gets to look at.
pub struct FilterContext<'a> {
    pub record: &'a RowRecord,
    pub column: &'a ColumnDescriptor,
    /// Resolved field value, `None` when the path is missing.
    pub value: Option<&'a Value>,
    pub condition: &'a FilterCondition,
}

/// Evaluates `conditions` against one row. A column-supplied
/// `filter_override` takes precedence over the operator table for that
/// column; conditions naming unknown columns are skipped (logged by the
/// orchestrator at apply time).
pub fn row_matches(columns: &ColumnModel, record: &RowRecord, conditions: &[FilterCondition]) -> bool {
    for condition in conditions {
        let Some(column) = columns.get(&condition.column_id) else {
            continue;
        };
        let value = columns.resolve_field(record, column);
        if let Some(custom) = &column.filter_override {
            let ctx = FilterContext {
                record,
                column,
                value,
                condition,
            };
            if !custom(&ctx) {
                return false;
            }
            continue;
        }
        if !operator_matches(column, value, condition) {
            return false;
        }
    }
    true
}

fn operator_matches(
    column: &ColumnDescriptor,
    value: Option<&Value>,
    condition: &FilterCondition,
) -> bool {
    match condition.operator {
        FilterOperator::IsEmpty => is_empty(value),
        FilterOperator::IsNotEmpty => !is_empty(value),
        FilterOperator::Selected => value.and_then(Value::as_bool).unwrap_or(false),
        FilterOperator::NotSelected => !value.and_then(Value::as_bool).unwrap_or(false),
        FilterOperator::Equals => match numeric_pair(column, value, &condition.value) {
            Some((a, b)) => a == b,
            None => text_of(value) == text_of(Some(&condition.value)),
        },
        FilterOperator::Contains => {
            text_of(value).contains(&text_of(Some(&condition.value)))
        }
        FilterOperator::DoesNotContain => {
            !text_of(value).contains(&text_of(Some(&condition.value)))
        }
        FilterOperator::StartsWith => {
            text_of(value).starts_with(&text_of(Some(&condition.value)))
        }
        FilterOperator::EndsWith => text_of(value).ends_with(&text_of(Some(&condition.value))),
        // Numeric family: both sides must parse; fail closed otherwise.
        FilterOperator::GreaterThan => {
            matches!(numeric_pair(column, value, &condition.value), Some((a, b)) if a > b)
        }
        FilterOperator::LessThan => {
            matches!(numeric_pair(column, value, &condition.value), Some((a, b)) if a < b)
        }
        FilterOperator::GreaterEquals => {
            matches!(numeric_pair(column, value, &condition.value), Some((a, b)) if a >= b)
        }
        FilterOperator::LessEquals => {
            matches!(numeric_pair(column, value, &condition.value), Some((a, b)) if a <= b)
        }
        FilterOperator::InRange => in_range(column, value, &condition.value),
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}

/// Case-normalized text rendering used by the string operators.
fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Both sides as comparable numbers. Date columns compare parsed
/// timestamps; everything else goes through numeric coercion.
fn numeric_pair(
    column: &ColumnDescriptor,
    value: Option<&Value>,
    operand: &Value,
) -> Option<(f64, f64)> {
    let value = value?;
    if column.data_type == DataType::Date {
        let a = coerce_date(value)?.and_utc().timestamp();
        let b = coerce_date(operand)?.and_utc().timestamp();
        return Some((a as f64, b as f64));
    }
    if column.data_type == DataType::Text {
        return None;
    }
    Some((coerce_number(value)?, coerce_number(operand)?))
}

fn in_range(column: &ColumnDescriptor, value: Option<&Value>, operand: &Value) -> bool {
    let Some(bounds) = operand.as_array() else {
        return false;
    };
    let (Some(lo), Some(hi)) = (bounds.first(), bounds.get(1)) else {
        return false;
    };
    let lo = numeric_pair(column, value, lo);
    let hi = numeric_pair(column, value, hi);
    matches!((lo, hi), (Some((v, lo)), Some((_, hi))) if v >= lo && v <= hi)
}
