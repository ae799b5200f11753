use crate::format::EditorDescriptor;
use crate::format::FormatterKind;
use crate::format::Validator;
use crate::row::RowRecord;
use crate::row::resolve_path;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Resize requests below this many pixels are ignored outright — not
/// clamped up to the column minimum.
pub const MIN_RESIZE_PX: u32 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrozenSide {
    None,
    Left,
    Right,
}

/// Declared data type of a column; drives sort/filter coercion.
/// `Auto` infers from the value at hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataType {
    #[default]
    Auto,
    Text,
    Number,
    Date,
    Bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WidthPolicy {
    /// Fixed pixel width.
    Fixed(u32),
    /// Percentage of the grid width.
    Percent(u16),
    /// `(min, max)` pixel pair; the render layer distributes within it.
    MinMax(u32, u32),
    /// Width decided by the formatter's default for the column kind.
    Auto,
}

/// Per-row readonly decision for a cell.
pub type ReadonlyPredicate = Arc<dyn Fn(&RowRecord, &ColumnDescriptor) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub enum ReadonlyRule {
    #[default]
    Never,
    Always,
    Predicate(ReadonlyPredicate),
}

impl fmt::Debug for ReadonlyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadonlyRule::Never => f.write_str("Never"),
            ReadonlyRule::Always => f.write_str("Always"),
            ReadonlyRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Custom per-column filter override; when present it replaces the
/// built-in operator table for that column.
pub type FilterPredicate =
    Arc<dyn Fn(&crate::filter::FilterContext<'_>) -> bool + Send + Sync>;

/// Configuration for one vertical slice of the grid.
#[derive(Clone)]
pub struct ColumnDescriptor {
    pub id: String,
    /// Dot-path into the row record, e.g. `detail.assignee.name`.
    /// Defaults to the column id when unset.
    pub field: Option<String>,
    /// Header label; multiple segments render as a multi-line header.
    pub label: Vec<String>,
    pub width: WidthPolicy,
    pub min_width: u32,
    pub max_width: Option<u32>,
    pub visible: bool,
    pub frozen: FrozenSide,
    pub sortable: bool,
    pub resizable: bool,
    pub reorderable: bool,
    pub hideable: bool,
    pub data_type: DataType,
    pub formatter: FormatterKind,
    pub editor: Option<EditorDescriptor>,
    pub validators: Vec<Validator>,
    pub readonly: ReadonlyRule,
    pub filter_override: Option<FilterPredicate>,
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("id", &self.id)
            .field("field", &self.field)
            .field("width", &self.width)
            .field("visible", &self.visible)
            .field("frozen", &self.frozen)
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

impl ColumnDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: vec![id.clone()],
            id,
            field: None,
            width: WidthPolicy::Auto,
            min_width: 20,
            max_width: None,
            visible: true,
            frozen: FrozenSide::None,
            sortable: true,
            resizable: true,
            reorderable: true,
            hideable: true,
            data_type: DataType::Auto,
            formatter: FormatterKind::Text,
            editor: None,
            validators: Vec::new(),
            readonly: ReadonlyRule::Never,
            filter_override: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = vec![label.into()];
        self
    }

    pub fn with_width(mut self, width: WidthPolicy) -> Self {
        self.width = width;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_formatter(mut self, formatter: FormatterKind) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_editor(mut self, editor: EditorDescriptor) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn with_frozen(mut self, side: FrozenSide) -> Self {
        self.frozen = side;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_readonly(mut self, rule: ReadonlyRule) -> Self {
        self.readonly = rule;
        self
    }

    /// The effective field path: declared `field`, or the column id.
    pub fn field_path(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.id)
    }

    pub fn is_readonly(&self, row: &RowRecord) -> bool {
        match &self.readonly {
            ReadonlyRule::Never => false,
            ReadonlyRule::Always => true,
            ReadonlyRule::Predicate(p) => p(row, self),
        }
    }
}

/// Normalized, ordered set of column descriptors.
///
/// Invariants after [`ColumnModel::set_columns`]:
/// - ids are unique (duplicates are dropped and logged)
/// - left-frozen columns form one contiguous run at the left edge,
///   right-frozen one contiguous run at the right edge
#[derive(Debug, Default)]
pub struct ColumnModel {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_columns(&mut self, descriptors: Vec<ColumnDescriptor>) {
        let mut seen: Vec<String> = Vec::new();
        let mut columns: Vec<ColumnDescriptor> = Vec::new();
        for mut column in descriptors {
            if seen.iter().any(|id| *id == column.id) {
                log::warn!("set_columns: dropping duplicate column id `{}`", column.id);
                continue;
            }
            if column.width == WidthPolicy::Auto {
                column.width = WidthPolicy::Fixed(column.formatter.default_width());
            }
            seen.push(column.id.clone());
            columns.push(column);
        }
        normalize_frozen_runs(&mut columns);
        self.columns = columns;
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn get(&self, id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ColumnDescriptor> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.visible)
    }

    pub fn frozen_columns(&self, side: FrozenSide) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(move |c| c.visible && c.frozen == side)
    }

    /// Resolved field value for `row` in `column`, or `None` for missing
    /// path segments. Never panics on row shape.
    pub fn resolve_field<'a>(
        &self,
        row: &'a RowRecord,
        column: &ColumnDescriptor,
    ) -> Option<&'a Value> {
        resolve_path(&row.data, column.field_path())
    }

    /// Ordered width-policy sequence of the visible columns, as consumed
    /// by the render layer.
    pub fn column_width_template(&self) -> Vec<WidthPolicy> {
        self.visible_columns().map(|c| c.width).collect()
    }

    /// Resizes a column. Requests below [`MIN_RESIZE_PX`] are ignored;
    /// otherwise the width clamps into `[min_width, max_width]`.
    pub fn set_column_width(&mut self, id: &str, px: u32) -> bool {
        if px < MIN_RESIZE_PX {
            log::debug!("set_column_width: ignoring sub-threshold request {px}px for `{id}`");
            return false;
        }
        let Some(column) = self.columns.iter_mut().find(|c| c.id == id) else {
            log::warn!("set_column_width: unknown column `{id}`");
            return false;
        };
        if !column.resizable {
            return false;
        }
        let mut px = px.max(column.min_width);
        if let Some(max) = column.max_width {
            px = px.min(max);
        }
        column.width = WidthPolicy::Fixed(px);
        true
    }

    pub fn set_column_visible(&mut self, id: &str, visible: bool) -> bool {
        let Some(column) = self.columns.iter_mut().find(|c| c.id == id) else {
            log::warn!("set_column_visible: unknown column `{id}`");
            return false;
        };
        if !visible && !column.hideable {
            return false;
        }
        let changed = column.visible != visible;
        column.visible = visible;
        changed
    }

    /// Moves a column to a new position. Frozen runs are re-normalized
    /// afterwards so the edge invariants hold.
    pub fn move_column(&mut self, id: &str, to: usize) -> bool {
        let Some(from) = self.columns.iter().position(|c| c.id == id) else {
            log::warn!("move_column: unknown column `{id}`");
            return false;
        };
        if !self.columns[from].reorderable {
            return false;
        }
        let to = to.min(self.columns.len().saturating_sub(1));
        if from == to {
            return false;
        }
        let column = self.columns.remove(from);
        self.columns.insert(to, column);
        normalize_frozen_runs(&mut self.columns);
        true
    }
}

/// Clears frozen flags that would break the contiguous-from-the-edge
/// invariant: one left run, one right run.
fn normalize_frozen_runs(columns: &mut [ColumnDescriptor]) {
    let mut in_left_run = true;
    for column in columns.iter_mut() {
        match column.frozen {
            FrozenSide::Left if !in_left_run => {
                log::warn!(
                    "column `{}`: left-frozen outside the left run, clearing",
                    column.id
                );
                column.frozen = FrozenSide::None;
            }
            FrozenSide::Left => {}
            _ => in_left_run = false,
        }
    }
    let mut in_right_run = true;
    for column in columns.iter_mut().rev() {
        match column.frozen {
            FrozenSide::Right if !in_right_run => {
                log::warn!(
                    "column `{}`: right-frozen outside the right run, clearing",
                    column.id
                );
                column.frozen = FrozenSide::None;
            }
            FrozenSide::Right => {}
            _ => in_right_run = false,
        }
    }
}
