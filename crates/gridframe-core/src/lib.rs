//! `gridframe-core` is the data and virtualization engine behind the grid
//! widgets: it owns the pipeline raw rows → filter → sort → group →
//! paginate → virtual window, plus the selection and cell-editing state
//! machines. It renders nothing; hosts consume the materialized view rows
//! and draw them however they like.
//!
//! ## Design goals
//!
//! - No async runtime: everything recomputes synchronously on the calling
//!   thread. The only suspension points are explicit deferred-edit
//!   tickets ([`edit::EditTicket`]) the host resolves later.
//! - Identity-first: every derived view is a list of stable
//!   [`row::RowId`]s over one row arena, so selection and edit state
//!   survive re-sorting, re-filtering, and re-grouping untouched.
//! - Staged recomputation: each pipeline stage is cached and re-runs only
//!   when an input upstream of it changed.
//!
//! ## Getting started
//!
//! Most users should depend on the facade crate `gridframe`, which adds a
//! ratatui front end. Use this crate directly when you bring your own
//! rendering.
//!
//! Useful entry points:
//! - [`grid::DataGrid`]: the orchestrator with the full imperative API.
//! - [`column::ColumnDescriptor`]: per-column configuration.
//! - [`grid::DataGrid::view_rows`]: the materialized window to render.
//! - [`grid::DataGrid::drain_events`]: lifecycle notifications.
pub mod column;
pub mod edit;
pub mod error;
pub mod events;
pub mod filter;
pub mod format;
pub mod grid;
pub mod group;
pub mod page;
pub mod row;
pub mod select;
pub mod settings;
pub mod sort;
pub mod window;

pub use column::ColumnDescriptor;
pub use column::ColumnModel;
pub use column::DataType;
pub use column::FrozenSide;
pub use column::WidthPolicy;
pub use edit::EditGate;
pub use edit::EditTicket;
pub use edit::GateResolution;
pub use error::GridError;
pub use events::GridEvent;
pub use filter::FilterCondition;
pub use filter::FilterOperator;
pub use format::EditorDescriptor;
pub use format::FormatterKind;
pub use format::Validator;
pub use grid::DataGrid;
pub use grid::EditReject;
pub use grid::EditStart;
pub use grid::ViewCell;
pub use grid::ViewRow;
pub use grid::ViewRowKind;
pub use group::DisplayRow;
pub use page::PaginationMode;
pub use row::RowId;
pub use select::SelectionMode;
pub use settings::GridSettings;
pub use sort::SortColumn;
pub use window::RowHeightTier;
