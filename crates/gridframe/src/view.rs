use crate::input::InputEvent;
use crate::input::KeyCode;
use crate::input::KeyEvent;
use crate::input::MouseEventKind;
use crate::render;
use crate::theme::Theme;
use gridframe_core::grid::DataGrid;
use gridframe_core::grid::EditStart;
use gridframe_core::grid::ViewRow;
use gridframe_core::grid::ViewRowKind;
use gridframe_core::row::RowId;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use serde_json::Value;

/// What a handled input did; the caller decides whether to redraw or to
/// follow up (e.g. open an editor overlay for `EditRequested`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridViewAction {
    None,
    Redraw,
    Activated(RowId),
    SelectionChanged,
    EditRequested { row: RowId, column_id: String },
}

#[derive(Clone, Debug)]
pub struct GridViewOptions {
    pub show_header: bool,
    pub show_scrollbar: bool,
    pub col_gap: u16,
}

impl Default for GridViewOptions {
    fn default() -> Self {
        Self {
            show_header: true,
            show_scrollbar: true,
            col_gap: 1,
        }
    }
}

/// Terminal front end for [`DataGrid`]: renders the engine's materialized
/// window and maps keyboard/mouse input onto engine operations.
///
/// The view owns only presentation state (cursor position, active column);
/// all data state lives in the engine, which the caller passes into
/// `handle_event` and `render`.
pub struct GridView {
    options: GridViewOptions,
    cursor: usize,
    active_col: usize,
}

impl Default for GridView {
    fn default() -> Self {
        Self {
            options: GridViewOptions::default(),
            cursor: 0,
            active_col: 0,
        }
    }
}

impl GridView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GridViewOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &GridViewOptions {
        &self.options
    }

    /// Cursor position as a display index into the current paged view.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn handle_event(&mut self, event: InputEvent, grid: &mut DataGrid) -> GridViewAction {
        match event {
            InputEvent::Mouse(m) => {
                let step = 3 * grid.row_height().px() as i64;
                match m.kind {
                    MouseEventKind::ScrollDown => {
                        grid.scroll_by(step);
                        GridViewAction::Redraw
                    }
                    MouseEventKind::ScrollUp => {
                        grid.scroll_by(-step);
                        GridViewAction::Redraw
                    }
                    _ => GridViewAction::None,
                }
            }
            InputEvent::Key(key) => self.handle_key(key, grid),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, grid: &mut DataGrid) -> GridViewAction {
        let len = grid.view_len();
        if len == 0 {
            self.cursor = 0;
            return GridViewAction::None;
        }
        self.cursor = self.cursor.min(len - 1);

        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, grid),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, grid),
            KeyCode::Left | KeyCode::Char('h') => {
                if self.active_col > 0 {
                    self.active_col -= 1;
                    GridViewAction::Redraw
                } else {
                    GridViewAction::None
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let cols = grid.columns().visible_columns().count();
                if self.active_col + 1 < cols {
                    self.active_col += 1;
                    GridViewAction::Redraw
                } else {
                    GridViewAction::None
                }
            }
            KeyCode::PageDown => {
                let page = grid.window().viewport_height() as i64;
                grid.scroll_by(page);
                self.cursor_from_scroll(grid);
                GridViewAction::Redraw
            }
            KeyCode::PageUp => {
                let page = grid.window().viewport_height() as i64;
                grid.scroll_by(-page);
                self.cursor_from_scroll(grid);
                GridViewAction::Redraw
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.cursor = 0;
                grid.set_scroll_offset(0);
                GridViewAction::Redraw
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.cursor = len - 1;
                grid.set_scroll_offset(u64::MAX);
                GridViewAction::Redraw
            }
            KeyCode::Char(' ') => {
                let Some(ViewRow { id: Some(id), .. }) = self.row_at(grid, self.cursor) else {
                    return GridViewAction::None;
                };
                let before = grid.selected_rows();
                grid.select_row(id);
                if grid.selected_rows() != before {
                    GridViewAction::SelectionChanged
                } else {
                    GridViewAction::None
                }
            }
            KeyCode::Enter => match self.row_at(grid, self.cursor) {
                Some(ViewRow {
                    kind: ViewRowKind::GroupHeader { key, .. },
                    ..
                }) => {
                    grid.toggle_group(&key);
                    GridViewAction::Redraw
                }
                Some(ViewRow { id: Some(id), .. }) => {
                    grid.activate_row(id);
                    GridViewAction::Activated(id)
                }
                _ => GridViewAction::None,
            },
            KeyCode::Char('e') => {
                let Some(ViewRow { id: Some(id), .. }) = self.row_at(grid, self.cursor) else {
                    return GridViewAction::None;
                };
                let Some(column_id) = self.active_column_id(grid) else {
                    return GridViewAction::None;
                };
                match grid.start_cell_edit(id, &column_id) {
                    EditStart::Started | EditStart::Deferred(_) => {
                        GridViewAction::EditRequested { row: id, column_id }
                    }
                    EditStart::Rejected(_) => GridViewAction::None,
                }
            }
            KeyCode::Esc => {
                grid.cancel_cell_edit();
                GridViewAction::Redraw
            }
            KeyCode::Char('n') => {
                grid.next_page();
                self.cursor = 0;
                GridViewAction::Redraw
            }
            KeyCode::Char('p') => {
                grid.prev_page();
                self.cursor = 0;
                GridViewAction::Redraw
            }
            _ => GridViewAction::None,
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme, grid: &mut DataGrid) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let (content, scrollbar_x) = if self.options.show_scrollbar && area.width >= 2 {
            (
                Rect::new(area.x, area.y, area.width - 1, area.height),
                Some(area.x + area.width - 1),
            )
        } else {
            (area, None)
        };
        let header_h: u16 = if self.options.show_header { 1 } else { 0 };
        let body_h = content.height.saturating_sub(header_h);
        grid.set_viewport_height(body_h as u32 * grid.row_height().px());

        let widths = render::column_layout(content.width, &grid.columns().column_width_template());
        let sort = grid
            .sort_column()
            .map(|s| (s.id.clone(), s.ascending));
        let headers: Vec<String> = grid
            .columns()
            .visible_columns()
            .map(|c| {
                let label = c.label.last().cloned().unwrap_or_else(|| c.id.clone());
                match &sort {
                    Some((id, true)) if *id == c.id => format!("{label} ▲"),
                    Some((id, false)) if *id == c.id => format!("{label} ▼"),
                    _ => label,
                }
            })
            .collect();
        let editing_display = grid
            .edit_session()
            .map(|s| display_value(&s.pending));

        buf.set_style(content, theme.text_primary);
        if self.options.show_header {
            let mut x = content.x;
            for (label, &w) in headers.iter().zip(&widths) {
                render::render_str_clipped(x, content.y, w, buf, label, theme.header);
                x = x.saturating_add(w + self.options.col_gap);
                if x >= content.x + content.width {
                    break;
                }
            }
        }

        let rows = grid.view_rows();
        let row_h = grid.row_height().px() as u64;
        let first_row = (grid.window().scroll_offset() / row_h) as usize;
        for row in rows {
            let Some(rel) = row.display_index.checked_sub(first_row) else {
                continue;
            };
            if rel >= body_h as usize {
                continue;
            }
            let y = content.y + header_h + rel as u16;
            match &row.kind {
                ViewRowKind::GroupHeader {
                    key,
                    count,
                    expanded,
                } => {
                    let marker = if *expanded { "▾" } else { "▸" };
                    let line = format!("{marker} {key} ({count})");
                    render::render_str_clipped(
                        content.x,
                        y,
                        content.width,
                        buf,
                        &line,
                        theme.group_header,
                    );
                }
                ViewRowKind::Data => {
                    let row_style = if row.display_index == self.cursor {
                        theme.cursor
                    } else if row.selected {
                        theme.selected
                    } else if row.activated {
                        theme.activated
                    } else if row.disabled {
                        theme.text_muted
                    } else {
                        theme.text_primary
                    };
                    let mut x = content.x;
                    for (cell, &w) in row.cells.iter().zip(&widths) {
                        let (text, style) = if cell.editing {
                            (
                                editing_display.as_deref().unwrap_or(&cell.display),
                                theme.editing,
                            )
                        } else {
                            (cell.display.as_str(), row_style)
                        };
                        render::render_str_clipped(x, y, w, buf, text, style);
                        x = x.saturating_add(w + self.options.col_gap);
                        if x >= content.x + content.width {
                            break;
                        }
                    }
                }
            }
        }

        if let Some(sb_x) = scrollbar_x {
            render::render_scrollbar(
                Rect::new(sb_x, content.y + header_h, 1, body_h),
                buf,
                grid.window(),
                theme.scrollbar,
            );
        }
    }

    fn move_cursor(&mut self, delta: i64, grid: &mut DataGrid) -> GridViewAction {
        let len = grid.view_len();
        let next = (self.cursor as i64 + delta).clamp(0, len.saturating_sub(1) as i64) as usize;
        if next == self.cursor {
            return GridViewAction::None;
        }
        self.cursor = next;
        self.ensure_cursor_visible(grid);
        GridViewAction::Redraw
    }

    fn ensure_cursor_visible(&self, grid: &mut DataGrid) {
        let row_h = grid.row_height().px() as u64;
        let top = self.cursor as u64 * row_h;
        let bottom = top + row_h;
        let scroll = grid.window().scroll_offset();
        let viewport = grid.window().viewport_height() as u64;
        if top < scroll {
            grid.set_scroll_offset(top);
        } else if bottom > scroll + viewport {
            grid.set_scroll_offset(bottom.saturating_sub(viewport));
        }
    }

    fn cursor_from_scroll(&mut self, grid: &mut DataGrid) {
        let row_h = grid.row_height().px() as u64;
        let len = grid.view_len();
        self.cursor = ((grid.window().scroll_offset() / row_h) as usize)
            .min(len.saturating_sub(1));
    }

    fn row_at(&self, grid: &mut DataGrid, index: usize) -> Option<ViewRow> {
        grid.view_rows()
            .into_iter()
            .find(|r| r.display_index == index)
    }

    fn active_column_id(&self, grid: &DataGrid) -> Option<String> {
        grid.columns()
            .visible_columns()
            .nth(self.active_col)
            .map(|c| c.id.clone())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridframe_core::column::ColumnDescriptor;
    use gridframe_core::column::DataType;
    use gridframe_core::column::WidthPolicy;
    use gridframe_core::format::EditorDescriptor;
    use serde_json::json;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::new(code))
    }

    fn sample_grid() -> DataGrid {
        let mut g = DataGrid::new();
        g.set_columns(vec![
            ColumnDescriptor::new("name")
                .with_width(WidthPolicy::Fixed(80))
                .with_editor(EditorDescriptor::text()),
            ColumnDescriptor::new("n")
                .with_width(WidthPolicy::Fixed(48))
                .with_data_type(DataType::Number),
        ]);
        g.set_data(
            (0..20)
                .map(|i| json!({"name": format!("row-{i}"), "n": i}))
                .collect(),
        );
        g.drain_events();
        g
    }

    fn row_string(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .filter_map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()))
            .collect()
    }

    #[test]
    fn cursor_moves_and_scrolls_the_engine() {
        let mut grid = sample_grid();
        let mut view = GridView::new();
        grid.set_viewport_height(3 * 32);
        assert_eq!(view.handle_event(key(KeyCode::Down), &mut grid), GridViewAction::Redraw);
        assert_eq!(view.cursor(), 1);
        for _ in 0..5 {
            view.handle_event(key(KeyCode::Down), &mut grid);
        }
        assert_eq!(view.cursor(), 6);
        // Rows 4..7 visible: cursor row 6 must sit at the bottom edge.
        assert_eq!(grid.window().scroll_offset(), (7 * 32 - 96) as u64);
    }

    #[test]
    fn space_selects_the_cursor_row() {
        let mut grid = sample_grid();
        grid.set_viewport_height(10 * 32);
        let mut view = GridView::new();
        view.handle_event(key(KeyCode::Down), &mut grid);
        assert_eq!(
            view.handle_event(key(KeyCode::Char(' ')), &mut grid),
            GridViewAction::SelectionChanged
        );
        assert_eq!(grid.selected_rows(), vec![RowId(1)]);
    }

    #[test]
    fn enter_activates_data_rows_and_toggles_headers() {
        let mut grid = sample_grid();
        grid.set_viewport_height(30 * 32);
        let mut view = GridView::new();
        assert_eq!(
            view.handle_event(key(KeyCode::Enter), &mut grid),
            GridViewAction::Activated(RowId(0))
        );

        grid.set_grouping(vec!["name".to_string()]);
        grid.drain_events();
        // Display index 0 is now the first group header.
        assert_eq!(
            view.handle_event(key(KeyCode::Enter), &mut grid),
            GridViewAction::Redraw
        );
        assert!(grid
            .drain_events()
            .iter()
            .any(|e| matches!(e, gridframe_core::events::GridEvent::RowCollapsed { .. })));
    }

    #[test]
    fn edit_key_opens_a_session_on_the_active_column() {
        let mut grid = sample_grid();
        grid.set_viewport_height(10 * 32);
        let mut view = GridView::new();
        assert_eq!(
            view.handle_event(key(KeyCode::Char('e')), &mut grid),
            GridViewAction::EditRequested {
                row: RowId(0),
                column_id: "name".to_string()
            }
        );
        assert!(grid.edit_session().is_some());
        view.handle_event(key(KeyCode::Esc), &mut grid);
        assert!(grid.edit_session().is_none());
    }

    #[test]
    fn render_draws_header_and_rows() {
        let mut grid = sample_grid();
        let mut view = GridView::new();
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf, &Theme::default(), &mut grid);
        assert!(row_string(&buf, 0, 30).contains("name"));
        assert!(row_string(&buf, 1, 30).contains("row-0"));
        assert!(row_string(&buf, 4, 30).contains("row-3"));
    }

    #[test]
    fn render_marks_the_active_sort_column() {
        let mut grid = sample_grid();
        grid.set_sort_column("n", false);
        let mut view = GridView::new();
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf, &Theme::default(), &mut grid);
        assert!(row_string(&buf, 0, 30).contains("n ▼"));
    }
}
