//! Map viewport state and viewport events.

use serde::{Deserialize, Serialize};

use crate::coord::{self, BoundingBox, CoordError, Coordinate, MAX_ZOOM, MIN_ZOOM};

/// The visible part of the map.
///
/// Bounds are derived from centre, zoom and pixel size through Web Mercator,
/// so two identical viewport states always describe the same box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    /// Map centre.
    pub center: Coordinate,
    /// Fractional zoom level.
    pub zoom: f64,
    /// Visible width in pixels.
    pub width_px: u32,
    /// Visible height in pixels.
    pub height_px: u32,
}

impl ViewportState {
    /// Create a validated viewport.
    pub fn new(
        center: Coordinate,
        zoom: f64,
        width_px: u32,
        height_px: u32,
    ) -> Result<Self, CoordError> {
        if !zoom.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            return Err(CoordError::InvalidZoom(zoom));
        }
        Ok(Self {
            center,
            zoom,
            width_px,
            height_px,
        })
    }

    /// Geographic box covered by the viewport.
    pub fn bounds(&self) -> BoundingBox {
        let (cx, cy) = match coord::project(&self.center, self.zoom) {
            Ok(px) => px,
            Err(_) => return BoundingBox::from_corners(self.center, self.center),
        };
        let half_w = self.width_px as f64 / 2.0;
        let half_h = self.height_px as f64 / 2.0;

        let north_west = coord::unproject(cx - half_w, cy - half_h, self.zoom);
        let south_east = coord::unproject(cx + half_w, cy + half_h, self.zoom);
        BoundingBox::from_corners(north_west, south_east)
    }
}

/// Viewport notifications from the map widget.
///
/// These replace the widget's callbacks: the session routes them to the
/// grid renderer as plain messages.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The user started panning or zooming.
    MoveStart,
    /// Intermediate viewport while a pan or zoom is in progress.
    Moving(ViewportState),
    /// The viewport settled (pan end or zoom end).
    Settled(ViewportState),
    /// Redraw the current viewport without waiting for a map event.
    Invalidate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::distance_m;

    fn westminster() -> Coordinate {
        Coordinate::new(51.5007, -0.1246).unwrap()
    }

    #[test]
    fn test_invalid_zoom_rejected() {
        assert!(ViewportState::new(westminster(), 25.0, 800, 600).is_err());
        assert!(ViewportState::new(westminster(), f64::NAN, 800, 600).is_err());
    }

    #[test]
    fn test_bounds_contain_center() {
        let viewport = ViewportState::new(westminster(), 19.0, 800, 600).unwrap();
        let bounds = viewport.bounds();
        assert!(bounds.contains(&westminster()));
        assert!((bounds.center().latitude - 51.5007).abs() < 1e-4);
        assert!((bounds.center().longitude - (-0.1246)).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_width_matches_pixel_scale() {
        // At ZL19 one pixel is ~0.186 m at 51.5°N, so 800 px is ~149 m
        let viewport = ViewportState::new(westminster(), 19.0, 800, 600).unwrap();
        let b = viewport.bounds();
        let mid = (b.south + b.north) / 2.0;
        let width = distance_m(
            &Coordinate::new(mid, b.west).unwrap(),
            &Coordinate::new(mid, b.east).unwrap(),
        );
        assert!((width - 149.0).abs() < 3.0, "Got width {}", width);
    }

    #[test]
    fn test_zoom_in_shrinks_bounds() {
        let wide = ViewportState::new(westminster(), 18.0, 800, 600).unwrap();
        let narrow = ViewportState::new(westminster(), 20.0, 800, 600).unwrap();
        let (w, n) = (wide.bounds(), narrow.bounds());
        assert!(n.north - n.south < w.north - w.south);
        assert!(n.east - n.west < w.east - w.west);
    }
}
