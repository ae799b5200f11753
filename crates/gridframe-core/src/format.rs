use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Shared custom formatter: raw value to display string.
pub type FormatFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Pure mapping from a raw cell value to its display string.
///
/// Each kind also carries the default column width used when a column
/// declares [`crate::column::WidthPolicy::Auto`].
#[derive(Clone)]
pub enum FormatterKind {
    Text,
    Number { precision: Option<u8> },
    Date { format: String },
    Checkbox,
    Progress,
    Custom(FormatFn),
}

impl fmt::Debug for FormatterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterKind::Text => f.write_str("Text"),
            FormatterKind::Number { precision } => {
                f.debug_struct("Number").field("precision", precision).finish()
            }
            FormatterKind::Date { format } => {
                f.debug_struct("Date").field("format", format).finish()
            }
            FormatterKind::Checkbox => f.write_str("Checkbox"),
            FormatterKind::Progress => f.write_str("Progress"),
            FormatterKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FormatterKind {
    pub fn date(format: impl Into<String>) -> Self {
        FormatterKind::Date {
            format: format.into(),
        }
    }

    /// Default pixel width for columns of this kind.
    pub fn default_width(&self) -> u32 {
        match self {
            FormatterKind::Text => 120,
            FormatterKind::Number { .. } => 80,
            FormatterKind::Date { .. } => 140,
            FormatterKind::Checkbox => 60,
            FormatterKind::Progress => 100,
            FormatterKind::Custom(_) => 120,
        }
    }

    /// Formats a raw value for display. Missing or null values format as
    /// the empty string; shape mismatches degrade to a plain rendering,
    /// never an error.
    pub fn format(&self, value: Option<&Value>) -> String {
        let Some(value) = value else {
            return String::new();
        };
        if value.is_null() {
            return String::new();
        }
        match self {
            FormatterKind::Text => plain_text(value),
            FormatterKind::Number { precision } => match coerce_number(value) {
                Some(n) => match precision {
                    Some(p) => format!("{n:.prec$}", prec = *p as usize),
                    None => trim_float(n),
                },
                None => plain_text(value),
            },
            FormatterKind::Date { format } => match coerce_date(value) {
                Some(dt) => dt.format(format).to_string(),
                None => plain_text(value),
            },
            FormatterKind::Checkbox => {
                if value.as_bool().unwrap_or(false) {
                    "☑".to_string()
                } else {
                    "☐".to_string()
                }
            }
            FormatterKind::Progress => match coerce_number(value) {
                Some(n) => format!("{:.0}%", n.clamp(0.0, 100.0)),
                None => plain_text(value),
            },
            FormatterKind::Custom(f) => f(value),
        }
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn trim_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Numeric coercion shared by formatting, filtering, and sorting:
/// numbers pass through, numeric strings parse, everything else is
/// `None` (callers fail closed).
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Date coercion: RFC 3339 / `YYYY-MM-DD[ HH:MM:SS]` strings and unix
/// timestamps (seconds) are accepted.
pub fn coerce_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_utc());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        Value::Number(n) => chrono::DateTime::from_timestamp(n.as_i64()?, 0).map(|dt| dt.naive_utc()),
        _ => None,
    }
}

/// Which editor a column opens for in-place editing.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorKind {
    TextInput,
    NumberInput,
    Checkbox,
    DatePicker,
    /// Fixed option list known at open time. An empty list combined with
    /// a deferred edit gate models server-fetched options.
    Select { options: Vec<Value> },
    /// Host-defined editor, matched by id.
    Custom(String),
}

/// Editor open/close contract for a column.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorDescriptor {
    pub kind: EditorKind,
    /// When true the editor opens with the cell content pre-selected.
    pub select_all_on_open: bool,
}

impl EditorDescriptor {
    pub fn new(kind: EditorKind) -> Self {
        Self {
            kind,
            select_all_on_open: false,
        }
    }

    pub fn text() -> Self {
        Self::new(EditorKind::TextInput)
    }

    pub fn number() -> Self {
        Self::new(EditorKind::NumberInput)
    }

    pub fn select(options: Vec<Value>) -> Self {
        Self::new(EditorKind::Select { options })
    }
}

type CheckFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A named check over a pending edit value. All validators on a column
/// run on every change; failures surface together.
#[derive(Clone)]
pub struct Validator {
    pub name: String,
    check: CheckFn,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish()
    }
}

impl Validator {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Non-empty value check.
    pub fn required() -> Self {
        Self::new("required", |v| match v {
            Value::Null => Err("a value is required".to_string()),
            Value::String(s) if s.trim().is_empty() => Err("a value is required".to_string()),
            _ => Ok(()),
        })
    }

    /// Numeric value check.
    pub fn numeric() -> Self {
        Self::new("numeric", |v| {
            coerce_number(v)
                .map(|_| ())
                .ok_or_else(|| "must be a number".to_string())
        })
    }

    pub fn run(&self, value: &Value) -> Result<(), String> {
        (self.check)(value)
    }
}

/// One validator failure attached to an edit session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub validator: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.validator, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_formatting_respects_precision() {
        let f = FormatterKind::Number { precision: Some(2) };
        assert_eq!(f.format(Some(&json!(3.14159))), "3.14");
        let f = FormatterKind::Number { precision: None };
        assert_eq!(f.format(Some(&json!(14))), "14");
        assert_eq!(f.format(Some(&json!("not a number"))), "not a number");
    }

    #[test]
    fn missing_and_null_values_format_empty() {
        assert_eq!(FormatterKind::Text.format(None), "");
        assert_eq!(FormatterKind::Text.format(Some(&Value::Null)), "");
    }

    #[test]
    fn date_formatting_parses_common_shapes() {
        let f = FormatterKind::date("%Y/%m/%d");
        assert_eq!(f.format(Some(&json!("2024-03-05"))), "2024/03/05");
        assert_eq!(f.format(Some(&json!("2024-03-05 10:30:00"))), "2024/03/05");
        assert_eq!(f.format(Some(&json!("garbage"))), "garbage");
    }

    #[test]
    fn checkbox_renders_boolean_state() {
        assert_eq!(FormatterKind::Checkbox.format(Some(&json!(true))), "☑");
        assert_eq!(FormatterKind::Checkbox.format(Some(&json!(false))), "☐");
    }

    #[test]
    fn custom_formatter_wins() {
        let f = FormatterKind::Custom(Arc::new(|v| format!("<{v}>")));
        assert_eq!(f.format(Some(&json!(1))), "<1>");
    }

    #[test]
    fn validators_report_named_failures() {
        let v = Validator::required();
        assert!(v.run(&json!("x")).is_ok());
        assert!(v.run(&json!("")).is_err());
        assert!(Validator::numeric().run(&json!("12.5")).is_ok());
        assert!(Validator::numeric().run(&json!("abc")).is_err());
    }
}
