use crate::column::ColumnDescriptor;
use crate::column::ColumnModel;
use crate::column::WidthPolicy;
use crate::edit::EditController;
use crate::edit::EditGate;
use crate::edit::EditSession;
use crate::edit::EditTicket;
use crate::edit::GateResolution;
use crate::error::GridError;
use crate::events::EventQueue;
use crate::events::FilterChange;
use crate::events::GridEvent;
use crate::filter::FilterCondition;
use crate::filter::row_matches;
use crate::format::ValidationError;
use crate::group::DisplayRow;
use crate::group::Grouping;
use crate::page::PaginationMode;
use crate::page::Paginator;
use crate::row::RowArena;
use crate::row::RowId;
use crate::row::RowRecord;
use crate::select::SelectionChange;
use crate::select::SelectionMode;
use crate::select::SelectionState;
use crate::settings::ColumnSettings;
use crate::settings::GridSettings;
use crate::sort::SortColumn;
use crate::sort::sort_ids;
use crate::window::EdgeEvent;
use crate::window::RowHeightTier;
use crate::window::VirtualWindow;
use serde_json::Value;
use std::ops::Range;

/// Pipeline stages in dependency order. Invalidating a stage dirties
/// everything downstream of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Filter,
    Sort,
    Group,
    Page,
}

/// One cell of the materialized view, display string pre-resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewCell {
    pub column_id: String,
    pub display: String,
    /// True while this cell has the live edit session.
    pub editing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewRowKind {
    Data,
    GroupHeader {
        key: String,
        count: usize,
        expanded: bool,
    },
}

/// One row of the materialized view window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewRow {
    /// Stable identity; `None` for synthesized group headers.
    pub id: Option<RowId>,
    /// Position in the current paged view, not the identity.
    pub display_index: usize,
    pub kind: ViewRowKind,
    pub cells: Vec<ViewCell>,
    pub selected: bool,
    pub activated: bool,
    pub disabled: bool,
}

/// Outcome of `start_cell_edit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditStart {
    Started,
    /// Held open by a deferred gate; resolve with
    /// [`DataGrid::resolve_edit_gate`].
    Deferred(EditTicket),
    Rejected(EditReject),
}

/// Why an edit did not start. All of these are normal control flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditReject {
    UnknownRow,
    UnknownColumn,
    MissingEditor,
    Readonly,
    Disabled,
    Vetoed,
}

/// Pre-check hook for row selection; returning `false` vetoes the
/// transition without any downstream notification.
pub type BeforeSelectHook = Box<dyn FnMut(RowId) -> bool + Send>;

/// Everything the `before_edit` hook gets to inspect.
pub struct EditRequest<'a> {
    pub row: RowId,
    pub column: &'a ColumnDescriptor,
    pub value: Option<&'a Value>,
    pub record: &'a RowRecord,
}

pub type BeforeEditHook = Box<dyn FnMut(&EditRequest<'_>) -> EditGate + Send>;

/// The grid orchestrator: owns the row arena, the column model, and the
/// staged pipeline raw → filter → sort → group → paginate → window.
///
/// All recomputation is synchronous and runs to completion before control
/// returns to the caller; the only suspension points are the explicit
/// deferred-gate tickets. Each stage is cached and recomputed only when
/// an input upstream of it changed.
pub struct DataGrid {
    arena: RowArena,
    columns: ColumnModel,
    conditions: Vec<FilterCondition>,
    sort: Option<SortColumn>,
    grouping: Grouping,
    paginator: Paginator,
    window: VirtualWindow,
    selection: SelectionState,
    editor: EditController,
    events: EventQueue,

    filtered: Vec<RowId>,
    sorted: Vec<RowId>,
    grouped: Vec<DisplayRow>,
    paged: Vec<DisplayRow>,
    dirty: Option<Stage>,

    before_select: Option<BeforeSelectHook>,
    before_edit: Option<BeforeEditHook>,

    active_cell: Option<(RowId, String)>,
    /// Re-sort after commit when the edited column is the active sort
    /// column (host opt-in).
    pub resort_on_commit: bool,
    pub filterable: bool,
    pub groupable: bool,
    pub virtual_scroll: bool,
}

impl Default for DataGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl DataGrid {
    pub fn new() -> Self {
        Self {
            arena: RowArena::new(),
            columns: ColumnModel::new(),
            conditions: Vec::new(),
            sort: None,
            grouping: Grouping::new(),
            paginator: Paginator::new(),
            window: VirtualWindow::new(),
            selection: SelectionState::new(SelectionMode::Single),
            editor: EditController::new(),
            events: EventQueue::default(),
            filtered: Vec::new(),
            sorted: Vec::new(),
            grouped: Vec::new(),
            paged: Vec::new(),
            dirty: Some(Stage::Filter),
            before_select: None,
            before_edit: None,
            active_cell: None,
            resort_on_commit: false,
            filterable: true,
            groupable: true,
            virtual_scroll: true,
        }
    }

    // ---- configuration -------------------------------------------------

    pub fn set_columns(&mut self, descriptors: Vec<ColumnDescriptor>) {
        self.columns.set_columns(descriptors);
        self.invalidate(Stage::Filter);
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn set_row_selection(&mut self, mode: SelectionMode) {
        let change = self.selection.set_mode(mode);
        self.emit_selection(change);
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection.mode()
    }

    pub fn set_before_select_hook(&mut self, hook: BeforeSelectHook) {
        self.before_select = Some(hook);
    }

    pub fn set_before_edit_hook(&mut self, hook: BeforeEditHook) {
        self.before_edit = Some(hook);
    }

    /// Drains the pending lifecycle notifications, oldest first.
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        self.events.drain()
    }

    // ---- data ----------------------------------------------------------

    /// Replaces the whole dataset and resets derived state: selection,
    /// activation, edit session, scroll position, and page.
    pub fn set_data(&mut self, data: Vec<Value>) {
        if let Some(session) = self.editor.cancel() {
            self.events.push(GridEvent::CancelCellEdit {
                row: session.row,
                column_id: session.column_id,
            });
        }
        self.arena.assign(data);
        self.selection.clear();
        self.active_cell = None;
        self.window.set_scroll_offset(0);
        self.paginator.set_page(1);
        self.invalidate(Stage::Filter);
    }

    /// Incrementally appends rows (infinite scroll). Returns the slice of
    /// newly materializable display indices inside the current window, so
    /// the host renders only the delta.
    pub fn append_data(&mut self, rows: Vec<Value>) -> Option<Range<usize>> {
        self.refresh();
        let before = self.paged.len();
        self.arena.append(rows);
        self.invalidate(Stage::Filter);
        self.refresh();
        self.window.delta_since(before)
    }

    pub fn add_row(&mut self, row: Value) {
        self.append_data(vec![row]);
    }

    /// Removes the row with identity `id`; `guard` is the optional
    /// partial-match key of the public API.
    pub fn remove_row(&mut self, id: RowId, guard: Option<(&str, &Value)>) -> bool {
        if !self.arena.remove(id, guard) {
            return false;
        }
        if self.editor.session().map(|s| s.row) == Some(id) {
            if let Some(session) = self.editor.cancel() {
                self.events.push(GridEvent::CancelCellEdit {
                    row: session.row,
                    column_id: session.column_id,
                });
            }
        }
        let change = self.selection.retain(|kept| kept != id);
        self.emit_selection(change);
        if self.active_cell.as_ref().map(|(r, _)| *r) == Some(id) {
            self.active_cell = None;
        }
        self.invalidate(Stage::Filter);
        true
    }

    /// Clears the row's cell values without removing the row.
    pub fn clear_row(&mut self, id: RowId, guard: Option<(&str, &Value)>) -> bool {
        if !self.arena.clear(id, guard) {
            return false;
        }
        self.invalidate(Stage::Filter);
        true
    }

    pub fn row(&self, id: RowId) -> Option<&RowRecord> {
        self.arena.get(id)
    }

    pub fn row_count(&self) -> usize {
        self.arena.len()
    }

    // ---- filter --------------------------------------------------------

    /// Applies the AND-combined condition set; an empty set clears all
    /// filtering. Emits `Filtered` exactly once per call, even when the
    /// resulting set is identical to the previous one.
    pub fn apply_filter(&mut self, conditions: Vec<FilterCondition>) {
        if !self.filterable && !conditions.is_empty() {
            log::warn!("apply_filter: grid is not filterable");
            return;
        }
        for condition in &conditions {
            if self.columns.get(&condition.column_id).is_none() {
                log::warn!("apply_filter: unknown column `{}`", condition.column_id);
            }
        }
        let change = if conditions.is_empty() {
            FilterChange::Clear
        } else {
            FilterChange::Apply
        };
        self.conditions = conditions;
        self.invalidate(Stage::Filter);
        self.events.push(GridEvent::Filtered {
            change,
            conditions: self.conditions.clone(),
        });
    }

    pub fn filter_conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    // ---- sort ----------------------------------------------------------

    /// Sets the single active sort column. Unknown or unsortable columns
    /// are logged no-ops.
    pub fn set_sort_column(&mut self, id: &str, ascending: bool) {
        let Some(column) = self.columns.get(id) else {
            log::warn!("set_sort_column: unknown column `{id}`");
            return;
        };
        if !column.sortable {
            log::warn!("set_sort_column: column `{id}` is not sortable");
            return;
        }
        self.sort = Some(SortColumn::new(id, ascending));
        self.invalidate(Stage::Sort);
        self.events.push(GridEvent::Sorted {
            sort: self.sort.clone(),
        });
    }

    pub fn clear_sort(&mut self) {
        if self.sort.take().is_some() {
            self.invalidate(Stage::Sort);
            self.events.push(GridEvent::Sorted { sort: None });
        }
    }

    pub fn sort_column(&self) -> Option<&SortColumn> {
        self.sort.as_ref()
    }

    // ---- grouping ------------------------------------------------------

    pub fn set_grouping(&mut self, fields: Vec<String>) {
        if !self.groupable && !fields.is_empty() {
            log::warn!("set_grouping: grid is not groupable");
            return;
        }
        self.grouping.set_fields(fields);
        self.invalidate(Stage::Group);
    }

    pub fn toggle_group(&mut self, key: &str) {
        self.refresh();
        let keys = self.grouping.keys(&self.arena, &self.sorted);
        match self.grouping.toggle(key, &keys) {
            Some(true) => self.events.push(GridEvent::RowExpanded {
                group: key.to_string(),
            }),
            Some(false) => self.events.push(GridEvent::RowCollapsed {
                group: key.to_string(),
            }),
            None => return,
        }
        self.invalidate(Stage::Group);
    }

    pub fn expand_all(&mut self) {
        self.refresh();
        let keys = self.grouping.keys(&self.arena, &self.sorted);
        for key in keys {
            if self.grouping.is_collapsed(&key) {
                self.events.push(GridEvent::RowExpanded { group: key });
            }
        }
        self.grouping.expand_all();
        self.invalidate(Stage::Group);
    }

    pub fn collapse_all(&mut self) {
        self.refresh();
        let keys = self.grouping.keys(&self.arena, &self.sorted);
        for key in &keys {
            if !self.grouping.is_collapsed(key) {
                self.events.push(GridEvent::RowCollapsed { group: key.clone() });
            }
        }
        self.grouping.collapse_all(&keys);
        self.invalidate(Stage::Group);
    }

    // ---- pagination ----------------------------------------------------

    pub fn set_pagination_mode(&mut self, mode: PaginationMode) {
        self.paginator.set_mode(mode);
        self.invalidate(Stage::Page);
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn set_page(&mut self, page: usize) {
        self.refresh();
        if self.paginator.set_page(page) {
            self.emit_page_changed();
        }
    }

    pub fn next_page(&mut self) {
        self.refresh();
        if self.paginator.next_page() {
            self.emit_page_changed();
        }
    }

    pub fn prev_page(&mut self) {
        self.refresh();
        if self.paginator.prev_page() {
            self.emit_page_changed();
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.refresh();
        if self.paginator.set_page_size(page_size) {
            self.emit_page_changed();
            self.events.push(GridEvent::SettingsChanged);
        }
    }

    fn emit_page_changed(&mut self) {
        self.events.push(GridEvent::PageChanged {
            page: self.paginator.page(),
            page_size: self.paginator.page_size(),
        });
        // Standalone mode: the event is informational only; the visible
        // rows do not change.
        if self.paginator.mode() == PaginationMode::Client {
            self.invalidate(Stage::Page);
        }
    }

    // ---- columns -------------------------------------------------------

    pub fn set_column_width(&mut self, id: &str, px: u32) {
        if self.columns.set_column_width(id, px) {
            self.events.push(GridEvent::SettingsChanged);
        }
    }

    pub fn set_column_visible(&mut self, id: &str, visible: bool) {
        if self.columns.set_column_visible(id, visible) {
            self.events.push(GridEvent::SettingsChanged);
            self.invalidate(Stage::Page);
        }
    }

    pub fn move_column(&mut self, id: &str, to: usize) {
        if self.columns.move_column(id, to) {
            self.events.push(GridEvent::SettingsChanged);
            self.invalidate(Stage::Page);
        }
    }

    // ---- selection / activation ---------------------------------------

    pub fn select_row(&mut self, id: RowId) {
        if !self.arena.contains(id) {
            log::warn!("select_row: unknown row {id:?}");
            return;
        }
        if self.arena.get(id).is_some_and(|r| r.disabled) {
            return;
        }
        if let Some(hook) = &mut self.before_select {
            if !hook(id) {
                return;
            }
        }
        let change = self.selection.select(id);
        self.emit_selection(change);
    }

    pub fn deselect_row(&mut self, id: RowId) {
        let change = self.selection.deselect(id);
        self.emit_selection(change);
    }

    pub fn activate_row(&mut self, id: RowId) {
        if !self.arena.contains(id) {
            log::warn!("activate_row: unknown row {id:?}");
            return;
        }
        let change = self.selection.activate(id);
        self.emit_selection(change);
    }

    pub fn deactivate_row(&mut self, id: RowId) {
        let change = self.selection.deactivate(id);
        self.emit_selection(change);
    }

    pub fn selected_rows(&self) -> Vec<RowId> {
        self.selection.selected().iter().copied().collect()
    }

    pub fn activated_row(&self) -> Option<RowId> {
        self.selection.activated()
    }

    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    pub fn set_active_cell(&mut self, column_id: &str, row: RowId) {
        if self.columns.get(column_id).is_none() || !self.arena.contains(row) {
            log::warn!("set_active_cell: unknown target {column_id}/{row:?}");
            return;
        }
        self.active_cell = Some((row, column_id.to_string()));
    }

    pub fn active_cell(&self) -> Option<(RowId, &str)> {
        self.active_cell.as_ref().map(|(r, c)| (*r, c.as_str()))
    }

    fn emit_selection(&mut self, change: SelectionChange) {
        let set_changed = !change.selected.is_empty() || !change.deselected.is_empty();
        for id in change.deselected {
            self.events.push(GridEvent::RowDeselected(id));
        }
        for id in change.selected {
            self.events.push(GridEvent::RowSelected(id));
        }
        if let Some(id) = change.deactivated {
            self.events.push(GridEvent::RowDeactivated(id));
        }
        if let Some(id) = change.activated {
            self.events.push(GridEvent::RowActivated(id));
        }
        if set_changed {
            self.events.push(GridEvent::SelectionChanged);
        }
    }

    // ---- editing -------------------------------------------------------

    /// Opens an in-place edit session on one cell. Requires an editor on
    /// the column and a non-readonly, non-disabled cell; the
    /// `before_edit` hook may veto or defer the transition.
    pub fn start_cell_edit(&mut self, row: RowId, column_id: &str) -> EditStart {
        let Some(record) = self.arena.get(row) else {
            log::warn!("start_cell_edit: unknown row {row:?}");
            return EditStart::Rejected(EditReject::UnknownRow);
        };
        let Some(column) = self.columns.get(column_id) else {
            log::warn!("start_cell_edit: unknown column `{column_id}`");
            return EditStart::Rejected(EditReject::UnknownColumn);
        };
        if record.disabled {
            return EditStart::Rejected(EditReject::Disabled);
        }
        if column.editor.is_none() {
            return EditStart::Rejected(EditReject::MissingEditor);
        }
        if column.is_readonly(record) {
            return EditStart::Rejected(EditReject::Readonly);
        }
        let value = self.columns.resolve_field(record, column);
        let gate = match &mut self.before_edit {
            Some(hook) => hook(&EditRequest {
                row,
                column,
                value,
                record,
            }),
            None => EditGate::Allow,
        };
        let original = value.cloned().unwrap_or(Value::Null);
        match gate {
            EditGate::Veto => EditStart::Rejected(EditReject::Vetoed),
            EditGate::Allow => {
                let cancelled = self.editor.begin(row, column_id, original);
                self.emit_cancelled(cancelled);
                self.events.push(GridEvent::CellEdit {
                    row,
                    column_id: column_id.to_string(),
                });
                EditStart::Started
            }
            EditGate::Defer => {
                let (ticket, cancelled) = self.editor.begin_deferred(row, column_id, original);
                self.emit_cancelled(cancelled);
                EditStart::Deferred(ticket)
            }
        }
    }

    /// Completes a deferred edit gate. Stale tickets are discarded; gate
    /// failure reverts the cell and surfaces `EditFailed`.
    pub fn resolve_edit_gate(
        &mut self,
        ticket: EditTicket,
        outcome: Result<Option<Vec<Value>>, String>,
    ) -> GateResolution {
        let pending = self.editor.session().map(|s| (s.row, s.column_id.clone()));
        let resolution = self.editor.resolve_gate(ticket, outcome);
        match &resolution {
            GateResolution::Opened => {
                if let Some(session) = self.editor.session() {
                    self.events.push(GridEvent::CellEdit {
                        row: session.row,
                        column_id: session.column_id.clone(),
                    });
                }
            }
            GateResolution::Failed(message) => {
                if let Some((row, column_id)) = pending {
                    self.events.push(GridEvent::EditFailed {
                        row,
                        column_id,
                        message: message.clone(),
                    });
                }
            }
            GateResolution::Stale => {}
        }
        resolution
    }

    /// Updates the live session's pending value, re-running the column's
    /// validators. Returns the current failure set.
    pub fn set_pending_value(&mut self, value: Value) -> Vec<ValidationError> {
        let Some(column_id) = self.editor.session().map(|s| s.column_id.clone()) else {
            return Vec::new();
        };
        let validators = self
            .columns
            .get(&column_id)
            .map(|c| c.validators.clone())
            .unwrap_or_default();
        self.editor.set_pending(value, &validators).to_vec()
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.editor.session()
    }

    /// Commits the live session: writes the pending value through the
    /// column's field path and ends the session.
    pub fn end_cell_edit(&mut self) -> Result<(), GridError> {
        let session = self.editor.commit()?;
        let path = self
            .columns
            .get(&session.column_id)
            .map(|c| c.field_path().to_string())
            .unwrap_or_else(|| session.column_id.clone());
        self.arena
            .write_field(session.row, &path, session.pending.clone());
        self.events.push(GridEvent::EndCellEdit {
            row: session.row,
            column_id: session.column_id.clone(),
            value: session.pending.clone(),
        });
        // Dependent stages re-derive after the current operation, never
        // interleaved with it.
        if self.resort_on_commit
            && self.sort.as_ref().map(|s| s.id.as_str()) == Some(session.column_id.as_str())
        {
            self.invalidate(Stage::Sort);
        }
        Ok(())
    }

    pub fn cancel_cell_edit(&mut self) {
        let cancelled = self.editor.cancel();
        self.emit_cancelled(cancelled);
    }

    fn emit_cancelled(&mut self, session: Option<EditSession>) {
        if let Some(session) = session {
            self.events.push(GridEvent::CancelCellEdit {
                row: session.row,
                column_id: session.column_id,
            });
        }
    }

    // ---- window / scrolling -------------------------------------------

    pub fn set_row_height(&mut self, tier: RowHeightTier) {
        if self.window.tier() != tier {
            self.window.set_tier(tier);
            self.events.push(GridEvent::SettingsChanged);
        }
    }

    pub fn row_height(&self) -> RowHeightTier {
        self.window.tier()
    }

    pub fn set_viewport_height(&mut self, px: u32) {
        self.window.set_viewport_height(px);
    }

    pub fn set_scroll_offset(&mut self, px: u64) {
        self.refresh();
        for edge in self.window.set_scroll_offset(px) {
            self.events.push(match edge {
                EdgeEvent::ScrollStart => GridEvent::ScrollStart,
                EdgeEvent::ScrollEnd => GridEvent::ScrollEnd,
            });
        }
    }

    pub fn scroll_by(&mut self, delta_px: i64) {
        self.refresh();
        for edge in self.window.scroll_by(delta_px) {
            self.events.push(match edge {
                EdgeEvent::ScrollStart => GridEvent::ScrollStart,
                EdgeEvent::ScrollEnd => GridEvent::ScrollEnd,
            });
        }
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    // ---- settings ------------------------------------------------------

    /// Captures the persisted-settings bundle.
    pub fn snapshot_settings(&mut self) -> GridSettings {
        self.refresh();
        GridSettings {
            active_page: self.paginator.page(),
            page_size: self.paginator.page_size(),
            row_height: self.window.tier(),
            sort_order: self.sort.clone(),
            filter: self.conditions.clone(),
            columns: self
                .columns
                .columns()
                .iter()
                .map(|c| ColumnSettings {
                    id: c.id.clone(),
                    width: match c.width {
                        WidthPolicy::Fixed(px) => Some(px),
                        _ => None,
                    },
                    visible: c.visible,
                })
                .collect(),
        }
    }

    /// Restores a previously captured bundle and re-runs the pipeline.
    /// Unknown column ids inside the bundle are logged and skipped.
    pub fn restore_settings(&mut self, settings: GridSettings) {
        for column in &settings.columns {
            if self.columns.get(&column.id).is_none() {
                log::warn!("restore_settings: unknown column `{}`", column.id);
                continue;
            }
            if let Some(px) = column.width {
                self.columns.set_column_width(&column.id, px);
            }
            self.columns.set_column_visible(&column.id, column.visible);
        }
        self.window.set_tier(settings.row_height);
        self.apply_filter(settings.filter);
        match settings.sort_order {
            Some(sort) => self.set_sort_column(&sort.id, sort.ascending),
            None => self.clear_sort(),
        }
        self.refresh();
        self.paginator.set_page_size(settings.page_size.max(1));
        self.paginator.set_page(settings.active_page.max(1));
        self.invalidate(Stage::Page);
        self.events.push(GridEvent::SettingsChanged);
    }

    // ---- pipeline ------------------------------------------------------

    fn invalidate(&mut self, stage: Stage) {
        self.dirty = Some(match self.dirty {
            Some(current) => current.min(stage),
            None => stage,
        });
    }

    /// Recomputes the dirty stages, upstream to downstream, synchronously
    /// to completion.
    fn refresh(&mut self) {
        let Some(from) = self.dirty.take() else {
            return;
        };
        if from <= Stage::Filter {
            self.filtered = self
                .arena
                .iter()
                .filter(|r| !r.hidden)
                .filter(|r| row_matches(&self.columns, r, &self.conditions))
                .map(|r| r.id)
                .collect();
        }
        if from <= Stage::Sort {
            self.sorted = self.filtered.clone();
            sort_ids(&self.arena, &self.columns, &mut self.sorted, self.sort.as_ref());
        }
        if from <= Stage::Group {
            self.grouped = self.grouping.build(&self.arena, &self.sorted);
        }
        // Paging always re-derives when anything upstream moved.
        let data_total = self
            .grouped
            .iter()
            .filter(|r| matches!(r, DisplayRow::Data(_)))
            .count();
        self.paginator.set_total(data_total);
        self.paged = page_slice(&self.grouped, self.paginator.slice(data_total));
        self.window.set_count(self.paged.len());
    }

    /// Number of rows (headers included) in the current paged view.
    pub fn view_len(&mut self) -> usize {
        self.refresh();
        self.paged.len()
    }

    /// Ids of the data rows in the current paged view, in display order.
    pub fn display_ids(&mut self) -> Vec<RowId> {
        self.refresh();
        self.paged
            .iter()
            .filter_map(|r| match r {
                DisplayRow::Data(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Materializes the current window of the paged view: ordered visible
    /// rows × visible columns with pre-resolved display strings.
    pub fn view_rows(&mut self) -> Vec<ViewRow> {
        self.refresh();
        let range = if self.virtual_scroll {
            self.window.range()
        } else {
            0..self.paged.len()
        };
        let editing = self
            .editor
            .session()
            .filter(|_| self.editor.is_editing())
            .map(|s| (s.row, s.column_id.clone()));
        let mut out = Vec::with_capacity(range.len());
        for display_index in range {
            let Some(row) = self.paged.get(display_index) else {
                break;
            };
            match row {
                DisplayRow::GroupHeader {
                    key,
                    count,
                    expanded,
                } => out.push(ViewRow {
                    id: None,
                    display_index,
                    kind: ViewRowKind::GroupHeader {
                        key: key.clone(),
                        count: *count,
                        expanded: *expanded,
                    },
                    cells: Vec::new(),
                    selected: false,
                    activated: false,
                    disabled: false,
                }),
                DisplayRow::Data(id) => {
                    let Some(record) = self.arena.get(*id) else {
                        continue;
                    };
                    let cells = self
                        .columns
                        .visible_columns()
                        .map(|column| ViewCell {
                            column_id: column.id.clone(),
                            display: column
                                .formatter
                                .format(self.columns.resolve_field(record, column)),
                            editing: editing
                                .as_ref()
                                .is_some_and(|(r, c)| *r == *id && *c == column.id),
                        })
                        .collect();
                    out.push(ViewRow {
                        id: Some(*id),
                        display_index,
                        kind: ViewRowKind::Data,
                        cells,
                        selected: self.selection.is_selected(*id),
                        activated: self.selection.activated() == Some(*id),
                        disabled: record.disabled,
                    });
                }
            }
        }
        out
    }
}

/// Slices the grouped collection to one page of data rows, carrying each
/// retained run's group header along. Headers never consume page slots.
fn page_slice(grouped: &[DisplayRow], range: Range<usize>) -> Vec<DisplayRow> {
    let data_len = grouped
        .iter()
        .filter(|r| matches!(r, DisplayRow::Data(_)))
        .count();
    let mut out = Vec::new();
    let mut data_idx = 0usize;
    let mut pending_header: Option<DisplayRow> = None;
    for row in grouped {
        match row {
            DisplayRow::GroupHeader { expanded, .. } => {
                if !expanded {
                    // Collapsed group: no members, so the header rides on
                    // the page holding its data position. Headers sitting
                    // past the final data row belong to the last page.
                    if range.contains(&data_idx)
                        || (data_idx == range.end && range.end == data_len)
                    {
                        out.push(row.clone());
                    }
                    pending_header = None;
                } else {
                    pending_header = Some(row.clone());
                }
            }
            DisplayRow::Data(_) => {
                if range.contains(&data_idx) {
                    if let Some(header) = pending_header.take() {
                        out.push(header);
                    }
                    out.push(row.clone());
                }
                data_idx += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DataType;
    use crate::column::ReadonlyRule;
    use crate::filter::FilterOperator;
    use crate::format::EditorDescriptor;
    use crate::format::Validator;
    use serde_json::json;

    fn sample_rows() -> Vec<Value> {
        let integers = [10, 18, 3, 22, 7, 14, 5, 9, 11];
        let teams = [
            "red", "blue", "red", "blue", "red", "blue", "red", "blue", "red",
        ];
        integers
            .iter()
            .zip(teams)
            .enumerate()
            .map(|(i, (n, team))| {
                json!({
                    "name": format!("item-{i}"),
                    "description": format!("10{}", i + 1),
                    "integer": n,
                    "team": team,
                })
            })
            .collect()
    }

    fn grid() -> DataGrid {
        let mut g = DataGrid::new();
        g.virtual_scroll = false;
        g.set_columns(vec![
            ColumnDescriptor::new("name")
                .with_editor(EditorDescriptor::text())
                .with_validator(Validator::required()),
            ColumnDescriptor::new("description"),
            ColumnDescriptor::new("integer")
                .with_data_type(DataType::Number)
                .with_editor(EditorDescriptor::number()),
            ColumnDescriptor::new("team"),
        ]);
        g.set_data(sample_rows());
        g.drain_events();
        g
    }

    #[test]
    fn contains_filter_narrows_and_clear_restores() {
        let mut g = grid();
        g.apply_filter(vec![FilterCondition::new(
            "description",
            FilterOperator::Contains,
            json!("105"),
        )]);
        assert_eq!(g.display_ids(), vec![RowId(4)]);
        g.apply_filter(Vec::new());
        assert_eq!(g.display_ids().len(), 9);
        let events = g.drain_events();
        assert!(matches!(
            events[0],
            GridEvent::Filtered {
                change: FilterChange::Apply,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            GridEvent::Filtered {
                change: FilterChange::Clear,
                ..
            }
        ));
    }

    #[test]
    fn filtered_fires_even_when_result_is_unchanged() {
        let mut g = grid();
        let conditions = vec![FilterCondition::new(
            "integer",
            FilterOperator::GreaterEquals,
            json!(14),
        )];
        g.apply_filter(conditions.clone());
        g.drain_events();
        g.apply_filter(conditions);
        let filtered = g
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GridEvent::Filtered { .. }))
            .count();
        assert_eq!(filtered, 1);
    }

    #[test]
    fn numeric_filter_then_sort() {
        let mut g = grid();
        g.apply_filter(vec![FilterCondition::new(
            "integer",
            FilterOperator::GreaterEquals,
            json!(14),
        )]);
        g.set_sort_column("integer", true);
        assert_eq!(g.display_ids(), vec![RowId(5), RowId(1), RowId(3)]);
    }

    #[test]
    fn selection_keys_on_identity_across_sort() {
        let mut g = grid();
        let second = g.display_ids()[1];
        g.select_row(second);
        g.set_sort_column("integer", true);
        let ids = g.display_ids();
        assert_eq!(ids.iter().position(|&id| id == second), Some(7));
        let rows = g.view_rows();
        assert!(rows[7].selected);
        assert_eq!(rows.iter().filter(|r| r.selected).count(), 1);
    }

    #[test]
    fn client_pagination_clamps_and_pages() {
        let mut g = grid();
        g.set_pagination_mode(PaginationMode::Client);
        g.set_page_size(2);
        assert_eq!(g.paginator().page_count(), 5);
        g.set_page(5);
        assert_eq!(g.display_ids().len(), 1);
        g.drain_events();
        g.next_page();
        assert!(g.drain_events().is_empty());
        assert_eq!(g.paginator().page(), 5);
        g.set_page(99);
        assert_eq!(g.paginator().page(), 5);
    }

    #[test]
    fn unknown_sort_target_is_a_logged_noop() {
        let mut g = grid();
        let before = g.display_ids();
        g.set_sort_column("nope", true);
        assert!(g.drain_events().is_empty());
        assert_eq!(g.display_ids(), before);
    }

    #[test]
    fn edit_round_trip_writes_through() {
        let mut g = grid();
        let id = g.display_ids()[0];
        assert_eq!(g.start_cell_edit(id, "name"), EditStart::Started);
        assert!(g.set_pending_value(json!("renamed")).is_empty());
        g.end_cell_edit().unwrap();
        assert_eq!(g.row(id).unwrap().data["name"], json!("renamed"));
        let events = g.drain_events();
        assert!(matches!(events[0], GridEvent::CellEdit { .. }));
        assert!(
            matches!(&events[1], GridEvent::EndCellEdit { value, .. } if *value == json!("renamed"))
        );
    }

    #[test]
    fn validation_blocks_commit() {
        let mut g = grid();
        let id = g.display_ids()[0];
        g.start_cell_edit(id, "name");
        assert_eq!(g.set_pending_value(json!("")).len(), 1);
        assert!(matches!(
            g.end_cell_edit(),
            Err(GridError::ValidationFailed(_))
        ));
        assert!(g.set_pending_value(json!("ok")).is_empty());
        assert!(g.end_cell_edit().is_ok());
    }

    #[test]
    fn missing_editor_and_unknown_column_reject() {
        let mut g = grid();
        let id = g.display_ids()[0];
        assert_eq!(
            g.start_cell_edit(id, "description"),
            EditStart::Rejected(EditReject::MissingEditor)
        );
        assert_eq!(
            g.start_cell_edit(id, "nope"),
            EditStart::Rejected(EditReject::UnknownColumn)
        );
        assert!(g.drain_events().is_empty());
    }

    #[test]
    fn readonly_cell_rejects_edit() {
        let mut g = DataGrid::new();
        g.set_columns(vec![
            ColumnDescriptor::new("name")
                .with_editor(EditorDescriptor::text())
                .with_readonly(ReadonlyRule::Always),
        ]);
        g.set_data(vec![json!({"name": "a"})]);
        assert_eq!(
            g.start_cell_edit(RowId(0), "name"),
            EditStart::Rejected(EditReject::Readonly)
        );
    }

    #[test]
    fn deferred_gate_opens_then_goes_stale() {
        let mut g = grid();
        g.set_before_edit_hook(Box::new(|_| EditGate::Defer));
        let id = g.display_ids()[0];
        let EditStart::Deferred(ticket) = g.start_cell_edit(id, "name") else {
            panic!("expected a deferred gate");
        };
        assert!(g.drain_events().is_empty());
        assert_eq!(g.resolve_edit_gate(ticket, Ok(None)), GateResolution::Opened);
        assert!(matches!(g.drain_events()[0], GridEvent::CellEdit { .. }));
        g.cancel_cell_edit();
        g.drain_events();
        assert_eq!(g.resolve_edit_gate(ticket, Ok(None)), GateResolution::Stale);
        assert!(g.drain_events().is_empty());
    }

    #[test]
    fn failed_gate_surfaces_edit_failed() {
        let mut g = grid();
        g.set_before_edit_hook(Box::new(|_| EditGate::Defer));
        let id = g.display_ids()[0];
        let EditStart::Deferred(ticket) = g.start_cell_edit(id, "name") else {
            panic!("expected a deferred gate");
        };
        g.resolve_edit_gate(ticket, Err("fetch failed".to_string()));
        assert!(g.edit_session().is_none());
        assert!(matches!(
            &g.drain_events()[0],
            GridEvent::EditFailed { message, .. } if message == "fetch failed"
        ));
    }

    #[test]
    fn select_hook_can_veto() {
        let mut g = grid();
        g.set_before_select_hook(Box::new(|id| id != RowId(0)));
        g.select_row(RowId(0));
        assert!(g.selected_rows().is_empty());
        assert!(g.drain_events().is_empty());
        g.select_row(RowId(1));
        assert_eq!(g.selected_rows(), vec![RowId(1)]);
        assert_eq!(
            g.drain_events(),
            vec![
                GridEvent::RowSelected(RowId(1)),
                GridEvent::SelectionChanged
            ]
        );
    }

    #[test]
    fn vetoed_edit_leaves_no_trace() {
        let mut g = grid();
        g.set_before_edit_hook(Box::new(|_| EditGate::Veto));
        let id = g.display_ids()[0];
        assert_eq!(
            g.start_cell_edit(id, "name"),
            EditStart::Rejected(EditReject::Vetoed)
        );
        assert!(g.edit_session().is_none());
        assert!(g.drain_events().is_empty());
    }

    #[test]
    fn grouping_headers_and_collapse() {
        let mut g = grid();
        g.set_grouping(vec!["team".to_string()]);
        assert_eq!(g.view_len(), 11);
        g.toggle_group("red");
        assert!(matches!(
            g.drain_events()[0],
            GridEvent::RowCollapsed { .. }
        ));
        assert_eq!(g.view_len(), 6);
        let rows = g.view_rows();
        assert!(matches!(
            &rows[0].kind,
            ViewRowKind::GroupHeader { key, count: 5, expanded: false } if key == "red"
        ));
    }

    fn header_keys(g: &mut DataGrid) -> Vec<String> {
        g.view_rows()
            .iter()
            .filter_map(|r| match &r.kind {
                ViewRowKind::GroupHeader { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn collapsing_the_tail_group_keeps_its_header() {
        let mut g = grid();
        g.set_grouping(vec!["team".to_string()]);
        g.toggle_group("blue");
        // 5 red data rows remain; the memberless blue header must still
        // show after them.
        assert_eq!(header_keys(&mut g), vec!["red", "blue"]);
        assert_eq!(g.view_len(), 7);
    }

    #[test]
    fn collapse_all_shows_every_header() {
        let mut g = grid();
        g.set_grouping(vec!["team".to_string()]);
        g.collapse_all();
        assert_eq!(g.view_len(), 2);
        let rows = g.view_rows();
        assert!(rows.iter().all(|r| matches!(
            r.kind,
            ViewRowKind::GroupHeader { expanded: false, .. }
        )));
    }

    #[test]
    fn collapsed_header_past_the_data_rides_the_last_page() {
        let mut g = grid();
        g.set_grouping(vec!["team".to_string()]);
        g.toggle_group("blue");
        g.set_pagination_mode(PaginationMode::Client);
        g.set_page_size(2);
        g.drain_events();
        // 5 red data rows at size 2 make 3 pages; the collapsed blue
        // header sits past the last data row, so only page 3 carries it.
        assert_eq!(header_keys(&mut g), vec!["red"]);
        g.set_page(3);
        assert_eq!(header_keys(&mut g), vec!["red", "blue"]);
    }

    #[test]
    fn scroll_edges_fire_once() {
        let mut g = grid();
        g.virtual_scroll = true;
        g.set_viewport_height(96);
        g.view_rows();
        let max = (9 * 32 - 96) as u64;
        g.set_scroll_offset(max);
        assert_eq!(g.drain_events(), vec![GridEvent::ScrollEnd]);
        g.set_scroll_offset(max);
        assert!(g.drain_events().is_empty());
        g.set_scroll_offset(0);
        assert_eq!(g.drain_events(), vec![GridEvent::ScrollStart]);
    }

    #[test]
    fn virtual_window_limits_materialization() {
        let mut g = grid();
        g.virtual_scroll = true;
        g.set_viewport_height(96);
        let rows = g.view_rows();
        // 3 visible rows plus the overscan margin.
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].display_index, 0);
    }

    #[test]
    fn append_reports_only_the_visible_delta() {
        let mut g = grid();
        g.virtual_scroll = true;
        g.set_viewport_height(320);
        g.view_rows();
        let delta = g.append_data(vec![json!({"name": "x", "integer": 1})]);
        assert_eq!(delta, Some(9..10));
        let delta = g.append_data((0..20).map(|i| json!({ "integer": i })).collect());
        assert_eq!(delta, Some(10..12));
    }

    #[test]
    fn remove_row_prunes_selection_and_edit() {
        let mut g = grid();
        g.select_row(RowId(2));
        g.start_cell_edit(RowId(2), "name");
        g.drain_events();
        assert!(g.remove_row(RowId(2), None));
        assert!(g.selected_rows().is_empty());
        assert!(g.edit_session().is_none());
        let events = g.drain_events();
        assert!(events.contains(&GridEvent::RowDeselected(RowId(2))));
        assert!(events.iter().any(|e| matches!(e, GridEvent::CancelCellEdit { .. })));
        assert_eq!(g.display_ids().len(), 8);
    }

    #[test]
    fn settings_snapshot_restore_round_trip() {
        let mut g = grid();
        g.set_pagination_mode(PaginationMode::Client);
        g.set_page_size(2);
        g.set_sort_column("integer", false);
        g.apply_filter(vec![FilterCondition::new(
            "integer",
            FilterOperator::GreaterEquals,
            json!(10),
        )]);
        g.set_column_width("name", 160);
        g.set_row_height(RowHeightTier::Compact);
        let bundle = g.snapshot_settings().to_json().unwrap();

        let mut fresh = grid();
        fresh.set_pagination_mode(PaginationMode::Client);
        fresh.restore_settings(GridSettings::from_json(&bundle).unwrap());
        assert_eq!(fresh.sort_column(), Some(&SortColumn::new("integer", false)));
        assert_eq!(fresh.filter_conditions().len(), 1);
        assert_eq!(fresh.paginator().page_size(), 2);
        assert_eq!(fresh.row_height(), RowHeightTier::Compact);
        assert_eq!(
            fresh.columns().get("name").unwrap().width,
            WidthPolicy::Fixed(160)
        );
        assert_eq!(fresh.display_ids(), g.display_ids());
    }
}
