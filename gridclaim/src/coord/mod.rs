//! Coordinate conversion module
//!
//! Provides geographic coordinate types and the conversions between
//! latitude/longitude and Web Mercator world pixels used by slippy maps.
//! Viewport bounds are derived from these projections.

mod types;

pub use types::{
    BoundingBox, CoordError, Coordinate, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Edge length of a map tile in pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Length of one degree of latitude in metres (on the mean sphere).
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * PI / 180.0;

/// Size of the Web Mercator world in pixels at the given (fractional) zoom.
#[inline]
pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * 2.0_f64.powf(zoom)
}

/// Projects a coordinate to Web Mercator world pixel coordinates.
///
/// Latitudes beyond the Mercator limit are clamped to it.
///
/// # Arguments
///
/// * `coord` - Position to project
/// * `zoom` - Zoom level (0 to 22, fractional allowed)
///
/// # Returns
///
/// `(x, y)` pixel coordinates, origin at the north-west corner of the world.
#[inline]
pub fn project(coord: &Coordinate, zoom: f64) -> Result<(f64, f64), CoordError> {
    if !zoom.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = world_size_px(zoom);
    let lat = coord.latitude.clamp(MIN_LAT, MAX_LAT);

    let x = (coord.longitude + 180.0) / 360.0 * n;
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    Ok((x, y))
}

/// Converts Web Mercator world pixels back to a coordinate.
///
/// Pixels outside the world are clamped to its edges.
#[inline]
pub fn unproject(x: f64, y: f64, zoom: f64) -> Coordinate {
    let n = world_size_px(zoom);
    let x = x.clamp(0.0, n);
    let y = y.clamp(0.0, n);

    let longitude = x / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();

    Coordinate {
        latitude: (lat_rad * 180.0 / PI).clamp(MIN_LAT, MAX_LAT),
        longitude,
    }
}

/// Great-circle distance between two coordinates in metres (haversine).
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
