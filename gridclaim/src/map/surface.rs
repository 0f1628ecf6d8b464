//! Map drawing capability.

use std::fmt;

use serde::Serialize;

use crate::coord::Coordinate;
use crate::grid::{CellBoundary, GridCell};
use crate::resolver::CellId;

/// Identity of one drawn layer.
///
/// Drawing a layer under a key that is already present replaces it, so a
/// key never appears on the surface twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKey {
    /// Grid line polygon for one cell.
    Grid(GridCell),
    /// Highlighted (current or claimed) cell.
    Highlight(CellId),
    /// Point marker.
    Marker(MarkerKind),
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKey::Grid(cell) => write!(f, "grid:{}", cell),
            LayerKey::Highlight(id) => write!(f, "highlight:{}", id),
            LayerKey::Marker(kind) => write!(f, "marker:{:?}", kind),
        }
    }
}

/// Kinds of point markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MarkerKind {
    /// "You are here" indicator on the current cell.
    YouAreHere,
}

/// Why a cell is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HighlightRole {
    /// The cell the user is standing in (Idle mode).
    Current,
    /// A cell visited during the active claiming session.
    Claiming,
    /// A cell in the most recently finished claim.
    Claimed,
}

/// Polygon drawing style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolygonStyle {
    /// Outline colour (CSS hex).
    pub stroke: &'static str,
    /// Outline width in pixels.
    pub weight: f32,
    /// Fill colour, if filled.
    pub fill: Option<&'static str>,
    /// Fill opacity (0.0 - 1.0).
    pub fill_opacity: f32,
}

impl PolygonStyle {
    /// Thin unfilled grid lines.
    pub const GRID: PolygonStyle = PolygonStyle {
        stroke: "#9e9e9e",
        weight: 0.5,
        fill: None,
        fill_opacity: 0.0,
    };

    /// Style for a highlighted cell.
    pub fn highlight(role: HighlightRole) -> PolygonStyle {
        let colour = match role {
            HighlightRole::Current => "#00b050",
            HighlightRole::Claiming => "#ff9800",
            HighlightRole::Claimed => "#e53935",
        };
        PolygonStyle {
            stroke: colour,
            weight: 2.0,
            fill: Some(colour),
            fill_opacity: 0.35,
        }
    }
}

/// Marker drawing style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerStyle {
    /// Marker colour (CSS hex).
    pub colour: &'static str,
    /// Text label shown next to the marker.
    pub label: &'static str,
}

impl MarkerStyle {
    /// "You are here" label.
    pub const YOU_ARE_HERE: MarkerStyle = MarkerStyle {
        colour: "#00b050",
        label: "You are here",
    };
}

/// A map widget that can draw polygons and markers.
///
/// The engine owns the surface exclusively; implementations only need to
/// apply the calls they receive.
pub trait MapSurface: Send {
    /// Draw (or replace) a polygon layer.
    fn draw_polygon(&mut self, key: LayerKey, boundary: &CellBoundary, style: PolygonStyle);

    /// Remove a layer. Removing an absent key is a no-op.
    fn remove_layer(&mut self, key: &LayerKey);

    /// Draw (or move) a point marker.
    fn draw_marker(&mut self, key: LayerKey, at: Coordinate, style: MarkerStyle);

    /// Show or hide overlays positioned in screen coordinates.
    ///
    /// Hidden while the viewport moves, shown again once it has settled.
    fn set_overlays_visible(&mut self, visible: bool);
}

impl<S: MapSurface + ?Sized> MapSurface for Box<S> {
    fn draw_polygon(&mut self, key: LayerKey, boundary: &CellBoundary, style: PolygonStyle) {
        (**self).draw_polygon(key, boundary, style)
    }

    fn remove_layer(&mut self, key: &LayerKey) {
        (**self).remove_layer(key)
    }

    fn draw_marker(&mut self, key: LayerKey, at: Coordinate, style: MarkerStyle) {
        (**self).draw_marker(key, at, style)
    }

    fn set_overlays_visible(&mut self, visible: bool) {
        (**self).set_overlays_visible(visible)
    }
}
