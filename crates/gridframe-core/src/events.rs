use crate::filter::FilterCondition;
use crate::row::RowId;
use crate::sort::SortColumn;
use serde_json::Value;
use std::collections::VecDeque;

/// Whether a `Filtered` notification came from applying conditions or
/// clearing them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterChange {
    Apply,
    Clear,
}

/// Fire-and-forget lifecycle notifications. The grid queues them; the
/// host drains with [`crate::grid::DataGrid::drain_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum GridEvent {
    Sorted {
        sort: Option<SortColumn>,
    },
    /// Emitted exactly once per `apply_filter` call, even when the new
    /// result set is identical to the old one.
    Filtered {
        change: FilterChange,
        conditions: Vec<FilterCondition>,
    },
    RowSelected(RowId),
    RowDeselected(RowId),
    /// Follows any batch of select/deselect transitions that changed the
    /// set.
    SelectionChanged,
    RowActivated(RowId),
    RowDeactivated(RowId),
    RowExpanded {
        group: String,
    },
    RowCollapsed {
        group: String,
    },
    /// An edit session opened on a cell.
    CellEdit {
        row: RowId,
        column_id: String,
    },
    /// A session committed; `value` is what was written through.
    EndCellEdit {
        row: RowId,
        column_id: String,
        value: Value,
    },
    CancelCellEdit {
        row: RowId,
        column_id: String,
    },
    /// A deferred edit gate failed; the cell reverted to idle.
    EditFailed {
        row: RowId,
        column_id: String,
        message: String,
    },
    ScrollStart,
    ScrollEnd,
    PageChanged {
        page: usize,
        page_size: usize,
    },
    SettingsChanged,
}

/// FIFO queue of pending notifications.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<GridEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: GridEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<GridEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
