//! Core coordinate types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;

/// Minimum map zoom level.
pub const MIN_ZOOM: f64 = 0.0;

/// Maximum map zoom level (street-level interactive maps stop around 21-22).
pub const MAX_ZOOM: f64 = 22.0;

/// Errors produced when building or converting coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not finite.
    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// Zoom level outside the supported range.
    #[error("Invalid zoom level: {0}")]
    InvalidZoom(f64),
}

/// A geographic position in WGS84 degrees.
///
/// Coordinates are immutable values. Equality is strict component equality,
/// which is what the position reconciler relies on to skip repeated fixes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a validated coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Returns true if both components are identical to `other`.
    ///
    /// Bitwise-equal floats only; no tolerance is applied.
    pub fn same_as(&self, other: &Coordinate) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge latitude.
    pub south: f64,
    /// Western edge longitude.
    pub west: f64,
    /// Northern edge latitude.
    pub north: f64,
    /// Eastern edge longitude.
    pub east: f64,
}

impl BoundingBox {
    /// Create a bounding box from its edges.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Create the smallest box containing both corners, in any order.
    pub fn from_corners(a: Coordinate, b: Coordinate) -> Self {
        Self {
            south: a.latitude.min(b.latitude),
            west: a.longitude.min(b.longitude),
            north: a.latitude.max(b.latitude),
            east: a.longitude.max(b.longitude),
        }
    }

    /// Check whether a coordinate lies inside the box (edges inclusive).
    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.south..=self.north).contains(&coord.latitude)
            && (self.west..=self.east).contains(&coord.longitude)
    }

    /// Check whether two boxes overlap.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.south <= other.north
            && other.south <= self.north
            && self.west <= other.east
            && other.west <= self.east
    }

    /// Centre point of the box.
    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.south + self.north) / 2.0,
            longitude: (self.west + self.east) / 2.0,
        }
    }

    /// Clamp the box to valid geographic ranges.
    pub fn clamped(&self) -> Self {
        Self {
            south: self.south.max(-90.0),
            west: self.west.max(MIN_LON),
            north: self.north.min(90.0),
            east: self.east.min(MAX_LON),
        }
    }
}
