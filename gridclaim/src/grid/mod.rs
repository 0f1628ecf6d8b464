//! Cell grid geometry and rendering.
//!
//! - [`CellGrid`] derives which fixed-size cell a coordinate belongs to and
//!   the outline of any cell, with no network calls.
//! - [`ViewportState`] describes the visible map area.
//! - [`GridRenderer`] keeps grid lines and highlighted cells drawn on a
//!   [`MapSurface`](crate::map::MapSurface), debouncing viewport changes.

mod geometry;
mod renderer;
mod viewport;

pub use geometry::{
    CellBoundary, CellGrid, GridCell, GridError, DEFAULT_CELL_SIZE_M, MAX_CELL_SIZE_M,
    MIN_CELL_SIZE_M,
};
pub use renderer::{
    GridRenderer, GridRendererConfig, RenderStats, DEFAULT_MAX_CELLS, DEFAULT_SETTLE_DELAY,
};
pub use viewport::{MapEvent, ViewportState};
