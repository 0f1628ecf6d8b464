//! Viewport-aligned grid rendering.
//!
//! The renderer keeps the map surface in sync with two things:
//!
//! - **Grid lines** for every cell visible in the settled viewport
//! - **Highlights** for cells named by the selection (current, claiming,
//!   claimed), plus the "you are here" marker
//!
//! # Debouncing
//!
//! Viewport events arrive in rapid bursts while the user pans or zooms.
//! Only settled viewports are rendered, and settled events that arrive within
//! `settle_delay` of each other collapse into a single redraw of the last one:
//!
//! ```text
//!  MoveStart   Settled(v1)  Settled(v2)          deadline
//!      │            │           │<── settle_delay ──>│
//!      ▼            ▼           ▼                    ▼
//!  hide overlays  pending=v1  pending=v2        render(v2), show overlays
//! ```
//!
//! Timing is passed in explicitly (`now`), so the renderer has no clock of
//! its own and is driven by the session loop.
//!
//! # Idempotence
//!
//! Rendering diffs the visible cell set against what is already drawn. A
//! second render of the same viewport draws and removes nothing.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::geometry::{CellBoundary, CellGrid, GridCell};
use super::viewport::ViewportState;
use crate::coord::Coordinate;
use crate::map::{HighlightRole, LayerKey, MapSurface, MarkerKind, MarkerStyle, PolygonStyle};
use crate::resolver::CellId;

/// Default quiet time after a settled event before the grid is redrawn.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(120);

/// Default maximum number of grid cells drawn at once.
///
/// Beyond this the viewport is zoomed too far out for individual cells to
/// be legible, and the grid is hidden instead.
pub const DEFAULT_MAX_CELLS: u64 = 2_500;

/// Configuration for the grid renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRendererConfig {
    /// Quiet time after the last settled event before redrawing.
    pub settle_delay: Duration,
    /// Maximum number of grid cells to draw.
    pub max_cells: u64,
}

impl Default for GridRendererConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

/// Outcome of one grid render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Cells visible in the viewport.
    pub visible: usize,
    /// Polygons newly drawn.
    pub drawn: usize,
    /// Polygons removed because they left the viewport.
    pub removed: usize,
    /// Polygons left untouched.
    pub retained: usize,
    /// The grid was hidden because the viewport holds too many cells.
    pub suppressed: bool,
}

/// Keeps grid lines and highlighted cells on a [`MapSurface`].
#[derive(Debug)]
pub struct GridRenderer {
    grid: CellGrid,
    config: GridRendererConfig,

    /// Last rendered viewport.
    viewport: Option<ViewportState>,

    /// Settled viewport waiting for the debounce deadline.
    pending: Option<ViewportState>,

    /// When the pending viewport may be rendered.
    deadline: Option<Instant>,

    /// Set between a move start and the next completed render.
    stale: bool,

    /// Grid cells currently drawn.
    drawn: HashSet<GridCell>,

    /// Known outlines of highlighted cells.
    boundaries: HashMap<CellId, CellBoundary>,

    /// Highlights currently drawn.
    highlights: HashMap<CellId, HighlightRole>,

    /// Position of the "you are here" marker, if drawn.
    marker: Option<Coordinate>,
}

impl GridRenderer {
    /// Create a renderer for the given grid.
    pub fn new(grid: CellGrid, config: GridRendererConfig) -> Self {
        Self {
            grid,
            config,
            viewport: None,
            pending: None,
            deadline: None,
            stale: false,
            drawn: HashSet::new(),
            boundaries: HashMap::new(),
            highlights: HashMap::new(),
            marker: None,
        }
    }

    /// The grid geometry.
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Last rendered viewport.
    pub fn viewport(&self) -> Option<&ViewportState> {
        self.viewport.as_ref()
    }

    /// Whether the viewport moved since the last render.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of grid polygons currently drawn.
    pub fn drawn_count(&self) -> usize {
        self.drawn.len()
    }

    /// Handle the start of a pan or zoom.
    ///
    /// Overlays positioned in screen space are hidden until the viewport
    /// settles and the grid is redrawn.
    pub fn on_move_start(&mut self, surface: &mut dyn MapSurface) {
        if !self.stale {
            trace!("Viewport moving, hiding overlays");
        }
        self.stale = true;
        surface.set_overlays_visible(false);
    }

    /// Record a settled viewport and (re)arm the redraw deadline.
    ///
    /// # Returns
    ///
    /// The instant at which the redraw becomes due.
    pub fn on_settled(&mut self, viewport: ViewportState, now: Instant) -> Instant {
        if self.pending.is_some() {
            trace!("Collapsing settled viewport into pending redraw");
        }
        let deadline = now + self.config.settle_delay;
        self.pending = Some(viewport);
        self.deadline = Some(deadline);
        deadline
    }

    /// Request a redraw of the current viewport, due immediately.
    ///
    /// Returns false if nothing has been rendered or scheduled yet.
    pub fn invalidate(&mut self, now: Instant) -> bool {
        match self.pending.or(self.viewport) {
            Some(viewport) => {
                self.pending = Some(viewport);
                self.deadline = Some(now);
                true
            }
            None => false,
        }
    }

    /// When the pending redraw becomes due, if one is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the pending viewport if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<ViewportState> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Draw the grid for `viewport`, removing polygons that left it.
    pub fn render(&mut self, viewport: &ViewportState, surface: &mut dyn MapSurface) -> RenderStats {
        let bounds = viewport.bounds();
        let mut stats = RenderStats::default();

        match self.grid.cells_in(&bounds, self.config.max_cells) {
            Ok(cells) => {
                let visible: HashSet<GridCell> = cells.iter().copied().collect();

                let orphans: Vec<GridCell> = self.drawn.difference(&visible).copied().collect();
                for cell in orphans {
                    surface.remove_layer(&LayerKey::Grid(cell));
                    self.drawn.remove(&cell);
                    stats.removed += 1;
                }

                for cell in cells {
                    if self.drawn.insert(cell) {
                        surface.draw_polygon(
                            LayerKey::Grid(cell),
                            &self.grid.boundary(&cell),
                            PolygonStyle::GRID,
                        );
                        stats.drawn += 1;
                    } else {
                        stats.retained += 1;
                    }
                }
                stats.visible = visible.len();
            }
            Err(err) => {
                debug!(zoom = viewport.zoom, "Grid hidden: {}", err);
                stats.removed = self.clear_grid(surface);
                stats.suppressed = true;
            }
        }

        self.viewport = Some(*viewport);
        self.stale = false;
        surface.set_overlays_visible(true);

        debug!(
            visible = stats.visible,
            drawn = stats.drawn,
            removed = stats.removed,
            retained = stats.retained,
            "Grid rendered"
        );
        stats
    }

    fn clear_grid(&mut self, surface: &mut dyn MapSurface) -> usize {
        let count = self.drawn.len();
        for cell in self.drawn.drain() {
            surface.remove_layer(&LayerKey::Grid(cell));
        }
        count
    }

    /// Remove everything this renderer has drawn.
    ///
    /// Known cell outlines and the last viewport are kept, so an
    /// [`invalidate`](Self::invalidate) restores the grid.
    pub fn clear(&mut self, surface: &mut dyn MapSurface) {
        self.clear_grid(surface);
        for (cell_id, _) in self.highlights.drain() {
            surface.remove_layer(&LayerKey::Highlight(cell_id));
        }
        if self.marker.take().is_some() {
            surface.remove_layer(&LayerKey::Marker(MarkerKind::YouAreHere));
        }
    }

    /// Store the outline of a cell from its centre coordinate.
    pub fn register_boundary(&mut self, cell_id: CellId, centroid: Coordinate) {
        let cell = self.grid.cell_of(&centroid);
        self.boundaries.insert(cell_id, self.grid.boundary(&cell));
    }

    /// Whether the outline of a cell is known.
    pub fn has_boundary(&self, cell_id: &CellId) -> bool {
        self.boundaries.contains_key(cell_id)
    }

    /// Centre of a highlighted cell, if its outline is known.
    pub fn centroid(&self, cell_id: &CellId) -> Option<Coordinate> {
        self.boundaries.get(cell_id).map(CellBoundary::center)
    }

    /// Make the drawn highlights match `wanted`.
    ///
    /// Highlights not in `wanted` are removed; new ones or ones whose role
    /// changed are drawn. Cells whose outline is not yet known are skipped
    /// and returned so the caller can look up their centre.
    pub fn set_highlights(
        &mut self,
        wanted: &[(CellId, HighlightRole)],
        surface: &mut dyn MapSurface,
    ) -> Vec<CellId> {
        let keep: HashSet<&CellId> = wanted.iter().map(|(id, _)| id).collect();
        let gone: Vec<CellId> = self
            .highlights
            .keys()
            .filter(|id| !keep.contains(id))
            .cloned()
            .collect();
        for cell_id in gone {
            self.highlights.remove(&cell_id);
            surface.remove_layer(&LayerKey::Highlight(cell_id));
        }

        let mut missing = Vec::new();
        for (cell_id, role) in wanted {
            if self.highlights.get(cell_id) == Some(role) {
                continue;
            }
            match self.boundaries.get(cell_id) {
                Some(boundary) => {
                    surface.draw_polygon(
                        LayerKey::Highlight(cell_id.clone()),
                        boundary,
                        PolygonStyle::highlight(*role),
                    );
                    self.highlights.insert(cell_id.clone(), *role);
                }
                None => missing.push(cell_id.clone()),
            }
        }
        missing
    }

    /// Show the "you are here" marker at `at`, or remove it.
    pub fn set_marker(&mut self, at: Option<Coordinate>, surface: &mut dyn MapSurface) {
        if self.marker == at {
            return;
        }
        let key = LayerKey::Marker(MarkerKind::YouAreHere);
        match at {
            Some(position) => surface.draw_marker(key, position, MarkerStyle::YOU_ARE_HERE),
            None => surface.remove_layer(&key),
        }
        self.marker = at;
    }
}
