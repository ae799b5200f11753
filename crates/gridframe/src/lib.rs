//! `gridframe` is a virtualized data grid widget for ratatui, backed by
//! the [`gridframe_core`] data engine.
//!
//! The engine owns all data state: filtering, sorting, grouping,
//! pagination, the virtual window, selection, and cell editing. This
//! crate adds the terminal front end: a [`view::GridView`] that renders
//! the engine's materialized rows and maps keyboard/mouse input onto
//! engine operations.
//!
//! ## Getting started
//!
//! ```no_run
//! use gridframe::view::GridView;
//! use gridframe::theme::Theme;
//! use gridframe_core::column::ColumnDescriptor;
//! use gridframe_core::grid::DataGrid;
//!
//! let mut grid = DataGrid::new();
//! grid.set_columns(vec![ColumnDescriptor::new("name")]);
//! grid.set_data(vec![serde_json::json!({"name": "ada"})]);
//! let mut view = GridView::new();
//! let theme = Theme::default();
//! // in your draw loop:
//! // view.render(area, buf, &theme, &mut grid);
//! // and for input:
//! // let action = view.handle_event(event, &mut grid);
//! ```
//!
//! Enable the `crossterm` feature for [`crossterm_input`] conversions
//! from crossterm events to this crate's input types.
pub mod input;
pub mod render;
pub mod theme;
pub mod view;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;

pub use gridframe_core as core;

pub use gridframe_core::column::ColumnDescriptor;
pub use gridframe_core::grid::DataGrid;
pub use gridframe_core::grid::ViewRow;
pub use gridframe_core::row::RowId;
pub use view::GridView;
pub use view::GridViewAction;
pub use view::GridViewOptions;
