//! Synchronous session state machine.
//!
//! The controller performs no I/O. Each [`SessionEvent`] is applied in
//! full before the next one, and any asynchronous work it needs (address
//! resolution) is returned as [`SessionCommand`]s for the driver to run.
//! Results come back later as events, so all state mutation happens here.
//!
//! # Highlight roles
//!
//! | State                | Cells                | Role       |
//! |----------------------|----------------------|------------|
//! | Idle                 | current cell         | `Current`  |
//! | Active               | live selection       | `Claiming` |
//! | after finish         | last claim           | `Claimed`  |
//!
//! While the location is acquiring or unavailable nothing is drawn.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use super::types::{LocationStatus, SessionCommand, SessionConfig, SessionError, SessionEvent, SessionSnapshot};
use crate::coord::Coordinate;
use crate::grid::{CellGrid, GridRenderer, MapEvent, RenderStats};
use crate::map::{HighlightRole, MapSurface};
use crate::position::{LocationError, PositionReconciler, Reconciled};
use crate::resolver::{CellId, ResolutionError};
use crate::selection::{ClaimingMode, SelectionChange, SelectionTracker};

/// Coordinates selection, position reconciliation and rendering.
pub struct SessionController {
    tracker: SelectionTracker,
    reconciler: PositionReconciler,
    renderer: GridRenderer,
    surface: Box<dyn MapSurface>,
    current_cell: Option<CellId>,
    status: LocationStatus,
    centroids_requested: HashSet<CellId>,
}

impl SessionController {
    /// Create a controller drawing on `surface`.
    pub fn new(config: &SessionConfig, surface: Box<dyn MapSurface>) -> Result<Self, SessionError> {
        let grid = CellGrid::new(config.cell_size_m)?;
        Ok(Self {
            tracker: SelectionTracker::new(),
            reconciler: PositionReconciler::new(config.reconciler),
            renderer: GridRenderer::new(grid, config.renderer.clone()),
            surface,
            current_cell: None,
            status: LocationStatus::Acquiring,
            centroids_requested: HashSet::new(),
        })
    }

    pub fn mode(&self) -> ClaimingMode {
        self.tracker.mode()
    }

    pub fn selection(&self) -> &[CellId] {
        self.tracker.selection()
    }

    pub fn current_cell(&self) -> Option<&CellId> {
        self.current_cell.as_ref()
    }

    pub fn location_status(&self) -> LocationStatus {
        self.status
    }

    pub fn renderer(&self) -> &GridRenderer {
        &self.renderer
    }

    /// Capture the presentation-facing state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.tracker.mode(),
            selection: self.tracker.selection().to_vec(),
            current_cell: self.current_cell.clone(),
            location_status: self.status,
            last_claim: self.tracker.last_claim().cloned(),
            overlays_visible: self.status.map_visible() && !self.renderer.is_stale(),
            you_are_here: self.you_are_here(),
            stale_discarded: self.reconciler.stale_dropped(),
        }
    }

    /// Apply one event.
    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Vec<SessionCommand> {
        match event {
            SessionEvent::Position(Ok(coordinate)) => self.on_fix(coordinate, now),
            SessionEvent::Position(Err(e)) => {
                self.on_location_error(e);
                Vec::new()
            }
            SessionEvent::CellResolved { seq, result } => self.on_cell_resolved(seq, result),
            SessionEvent::CentroidResolved { cell_id, result } => {
                self.on_centroid_resolved(cell_id, result)
            }
            SessionEvent::Map(map_event) => {
                self.on_map_event(map_event, now);
                Vec::new()
            }
            SessionEvent::StartTracking => {
                let change = self.tracker.start_claiming(now);
                self.on_selection_change(change)
            }
            SessionEvent::FinishTracking => {
                let change = self.tracker.finish_claiming(now);
                if change.is_some() {
                    // Idle tracking starts over from the next fix.
                    self.reconciler.reset_anchor();
                }
                self.on_selection_change(change)
            }
        }
    }

    /// When the next debounced redraw is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.status.map_visible() {
            return None;
        }
        self.renderer.next_deadline()
    }

    /// Run a due redraw, if any.
    pub fn on_tick(&mut self, now: Instant) -> Option<RenderStats> {
        if !self.status.map_visible() {
            return None;
        }
        let viewport = self.renderer.poll(now)?;
        Some(self.renderer.render(&viewport, self.surface.as_mut()))
    }

    /// Drop every in-flight resolution and stop issuing new ones.
    pub fn cancel(&mut self) {
        self.reconciler.cancel();
        self.centroids_requested.clear();
        info!("Session cancelled");
    }

    fn on_fix(&mut self, coordinate: Coordinate, now: Instant) -> Vec<SessionCommand> {
        if !self.status.map_visible() {
            info!(%coordinate, previous = %self.status, "Position fix acquired");
            self.status = LocationStatus::Available;
            // Restore whatever was suppressed while the location was missing.
            self.renderer.invalidate(now);
        }

        let mut commands = self.refresh_overlays();
        if let Some(ticket) = self.reconciler.on_position(coordinate) {
            trace!(seq = ticket.seq, %coordinate, "Resolving position");
            commands.push(SessionCommand::ResolveCell {
                seq: ticket.seq,
                coordinate: ticket.coordinate,
            });
        }
        commands
    }

    fn on_location_error(&mut self, error: LocationError) {
        warn!(%error, "Location unavailable");
        self.status = LocationStatus::Unavailable;
        // A lookup started before the loss must not touch the selection.
        self.reconciler.abandon();
        self.renderer.clear(self.surface.as_mut());
    }

    fn on_cell_resolved(&mut self, seq: u64, result: Result<CellId, ResolutionError>) -> Vec<SessionCommand> {
        match self.reconciler.accept(seq, result) {
            Reconciled::Resolved(cell_id) => {
                if self.status == LocationStatus::Unresolved {
                    self.status = LocationStatus::Available;
                }
                let moved = self.current_cell.as_ref() != Some(&cell_id);
                self.current_cell = Some(cell_id.clone());
                let change = self.tracker.observe(cell_id);
                if change.is_none() && !moved {
                    return Vec::new();
                }
                self.on_selection_change(change)
            }
            Reconciled::Failed(_) => {
                if self.status == LocationStatus::Available {
                    self.status = LocationStatus::Unresolved;
                }
                Vec::new()
            }
            Reconciled::Stale => Vec::new(),
        }
    }

    fn on_centroid_resolved(
        &mut self,
        cell_id: CellId,
        result: Result<Coordinate, ResolutionError>,
    ) -> Vec<SessionCommand> {
        if !self.centroids_requested.remove(&cell_id) {
            debug!(%cell_id, "Ignoring unrequested centroid");
            return Vec::new();
        }
        match result {
            Ok(centroid) => {
                self.renderer.register_boundary(cell_id, centroid);
                self.refresh_overlays()
            }
            Err(e) => {
                warn!(%cell_id, error = %e, "Centroid lookup failed");
                Vec::new()
            }
        }
    }

    fn on_map_event(&mut self, event: MapEvent, now: Instant) {
        match event {
            MapEvent::MoveStart => self.renderer.on_move_start(self.surface.as_mut()),
            MapEvent::Moving(viewport) => trace!(zoom = viewport.zoom, "Viewport moving"),
            MapEvent::Settled(viewport) => {
                self.renderer.on_settled(viewport, now);
            }
            MapEvent::Invalidate => {
                if !self.renderer.invalidate(now) {
                    debug!("Invalidate ignored: no viewport yet");
                }
            }
        }
    }

    fn on_selection_change(&mut self, change: Option<SelectionChange>) -> Vec<SessionCommand> {
        match change {
            Some(change) => {
                debug!(mode = %change.mode, cells = change.cells.len(), "Selection changed");
                self.refresh_overlays()
            }
            None => Vec::new(),
        }
    }

    fn you_are_here(&self) -> Option<Coordinate> {
        if self.tracker.mode() == ClaimingMode::Active {
            return None;
        }
        self.current_cell
            .as_ref()
            .and_then(|id| self.renderer.centroid(id))
    }

    /// Cells to highlight; later entries override the role of earlier ones.
    fn wanted_highlights(&self) -> Vec<(CellId, HighlightRole)> {
        let mut wanted: Vec<(CellId, HighlightRole)> = Vec::new();
        let mut put = |id: &CellId, role: HighlightRole| {
            match wanted.iter_mut().find(|(existing, _)| existing == id) {
                Some(entry) => entry.1 = role,
                None => wanted.push((id.clone(), role)),
            }
        };

        if let Some(claim) = self.tracker.last_claim() {
            for id in claim.cells() {
                put(id, HighlightRole::Claimed);
            }
        }
        let live_role = match self.tracker.mode() {
            ClaimingMode::Idle => HighlightRole::Current,
            ClaimingMode::Active => HighlightRole::Claiming,
        };
        for id in self.tracker.selection() {
            put(id, live_role);
        }
        wanted
    }

    /// Bring highlights and the marker in line with the selection.
    fn refresh_overlays(&mut self) -> Vec<SessionCommand> {
        if !self.status.map_visible() {
            return Vec::new();
        }

        let wanted = self.wanted_highlights();
        let mut missing = self.renderer.set_highlights(&wanted, self.surface.as_mut());
        if let Some(current) = &self.current_cell {
            if !self.renderer.has_boundary(current) && !missing.contains(current) {
                missing.push(current.clone());
            }
        }
        let marker = self.you_are_here();
        self.renderer.set_marker(marker, self.surface.as_mut());

        missing
            .into_iter()
            .filter(|id| self.centroids_requested.insert(id.clone()))
            .map(|cell_id| SessionCommand::ResolveCentroid { cell_id })
            .collect()
    }
}
