//! In-memory map surface.
//!
//! `RecordingSurface` keeps the layer set a real map widget would display,
//! plus call counters. The CLI renders from it and tests assert against it.
//! Clones share the same state, so one clone can be handed to the session
//! while another is kept for inspection.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::surface::{HighlightRole, LayerKey, MapSurface, MarkerKind, MarkerStyle, PolygonStyle};
use crate::coord::Coordinate;
use crate::grid::CellBoundary;
use crate::resolver::CellId;

/// A layer currently on the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceLayer {
    /// Filled or outlined polygon.
    Polygon {
        boundary: CellBoundary,
        style: PolygonStyle,
    },
    /// Point marker.
    Marker { at: Coordinate, style: MarkerStyle },
}

/// Counters of calls received by the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    /// `draw_polygon` calls.
    pub polygons_drawn: u64,
    /// `remove_layer` calls that removed something.
    pub layers_removed: u64,
    /// `draw_marker` calls.
    pub markers_drawn: u64,
}

#[derive(Debug)]
struct SurfaceState {
    layers: BTreeMap<LayerKey, SurfaceLayer>,
    overlays_visible: bool,
    stats: SurfaceStats,
}

/// Shared in-memory [`MapSurface`].
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    /// Create an empty surface with overlays visible.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState {
                layers: BTreeMap::new(),
                overlays_visible: true,
                stats: SurfaceStats::default(),
            })),
        }
    }

    /// All layers, ordered by key.
    pub fn layers(&self) -> Vec<(LayerKey, SurfaceLayer)> {
        self.state
            .lock()
            .layers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of grid polygons currently drawn.
    pub fn grid_count(&self) -> usize {
        self.state
            .lock()
            .layers
            .keys()
            .filter(|k| matches!(k, LayerKey::Grid(_)))
            .count()
    }

    /// Highlighted cells currently drawn, ordered by id.
    pub fn highlights(&self) -> Vec<CellId> {
        self.state
            .lock()
            .layers
            .keys()
            .filter_map(|k| match k {
                LayerKey::Highlight(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Style of a highlighted cell, if drawn.
    pub fn highlight_style(&self, cell_id: &CellId) -> Option<PolygonStyle> {
        match self
            .state
            .lock()
            .layers
            .get(&LayerKey::Highlight(cell_id.clone()))
        {
            Some(SurfaceLayer::Polygon { style, .. }) => Some(*style),
            _ => None,
        }
    }

    /// Returns true if a cell is highlighted with the given role's style.
    pub fn is_highlighted_as(&self, cell_id: &CellId, role: HighlightRole) -> bool {
        self.highlight_style(cell_id) == Some(PolygonStyle::highlight(role))
    }

    /// Position of a marker, if drawn.
    pub fn marker(&self, kind: MarkerKind) -> Option<Coordinate> {
        match self.state.lock().layers.get(&LayerKey::Marker(kind)) {
            Some(SurfaceLayer::Marker { at, .. }) => Some(*at),
            _ => None,
        }
    }

    /// Whether screen-anchored overlays are visible.
    pub fn overlays_visible(&self) -> bool {
        self.state.lock().overlays_visible
    }

    /// Call counters.
    pub fn stats(&self) -> SurfaceStats {
        self.state.lock().stats
    }
}

impl MapSurface for RecordingSurface {
    fn draw_polygon(&mut self, key: LayerKey, boundary: &CellBoundary, style: PolygonStyle) {
        let mut state = self.state.lock();
        state.stats.polygons_drawn += 1;
        state.layers.insert(
            key,
            SurfaceLayer::Polygon {
                boundary: boundary.clone(),
                style,
            },
        );
    }

    fn remove_layer(&mut self, key: &LayerKey) {
        let mut state = self.state.lock();
        if state.layers.remove(key).is_some() {
            state.stats.layers_removed += 1;
        }
    }

    fn draw_marker(&mut self, key: LayerKey, at: Coordinate, style: MarkerStyle) {
        let mut state = self.state.lock();
        state.stats.markers_drawn += 1;
        state.layers.insert(key, SurfaceLayer::Marker { at, style });
    }

    fn set_overlays_visible(&mut self, visible: bool) {
        self.state.lock().overlays_visible = visible;
    }
}
