//! Fixed-size cell geometry.
//!
//! The globe is cut into rows of constant angular height, and each row into
//! equal-width columns so that every cell measures `cell_size_m` on each
//! side. Rows near the poles hold fewer columns than rows at the equator.
//!
//! ```text
//!   north ┌────┬────┬────┐        row r+1: fewer, wider columns
//!         ├──┬─┴┬───┴┬───┴┬──┐
//!         │  │  │    │    │  │    row r: cols_in_row(r) columns
//!   south └──┴──┴────┴────┴──┘
//! ```
//!
//! Geometry is purely derived data: it never consults the address resolver
//! and never influences selection.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{BoundingBox, Coordinate, EARTH_RADIUS_M, METERS_PER_DEGREE};

/// Default cell edge length in metres.
pub const DEFAULT_CELL_SIZE_M: f64 = 3.0;

/// Smallest supported cell edge length in metres.
pub const MIN_CELL_SIZE_M: f64 = 1.0;

/// Largest supported cell edge length in metres.
pub const MAX_CELL_SIZE_M: f64 = 10_000.0;

/// Errors from grid geometry operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Cell size outside the supported range.
    #[error("Invalid cell size: {0} m")]
    InvalidCellSize(f64),

    /// A box holds more cells than the caller allows.
    #[error("Too many cells in view: {count} (limit: {limit})")]
    TooManyCells { count: u64, limit: u64 },
}

/// A cell position in the grid.
///
/// Rows count northward from the south pole, columns eastward from the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    /// Row index (0 = southernmost row).
    pub row: u32,
    /// Column index within the row (0 = westernmost column).
    pub col: u32,
}

impl GridCell {
    /// Create a new grid cell.
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}c{}", self.row, self.col)
    }
}

/// Polygon outline of one cell.
///
/// Corners are ordered south-west, south-east, north-east, north-west.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellBoundary {
    vertices: [Coordinate; 4],
}

impl CellBoundary {
    /// Build a boundary from a cell's bounding box.
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            vertices: [
                Coordinate {
                    latitude: bbox.south,
                    longitude: bbox.west,
                },
                Coordinate {
                    latitude: bbox.south,
                    longitude: bbox.east,
                },
                Coordinate {
                    latitude: bbox.north,
                    longitude: bbox.east,
                },
                Coordinate {
                    latitude: bbox.north,
                    longitude: bbox.west,
                },
            ],
        }
    }

    /// Polygon corners in drawing order.
    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    /// Bounding box of the outline.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_corners(self.vertices[0], self.vertices[2])
    }

    /// Centre of the cell.
    pub fn center(&self) -> Coordinate {
        self.bbox().center()
    }
}

/// Fixed-size cell grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    cell_size_m: f64,
    row_height_deg: f64,
    rows: u32,
    max_cols: u32,
}

impl Default for CellGrid {
    fn default() -> Self {
        Self::build(DEFAULT_CELL_SIZE_M)
    }
}

impl CellGrid {
    /// Create a grid whose cells measure `cell_size_m` on each side.
    pub fn new(cell_size_m: f64) -> Result<Self, GridError> {
        if !cell_size_m.is_finite() || !(MIN_CELL_SIZE_M..=MAX_CELL_SIZE_M).contains(&cell_size_m)
        {
            return Err(GridError::InvalidCellSize(cell_size_m));
        }
        Ok(Self::build(cell_size_m))
    }

    fn build(cell_size_m: f64) -> Self {
        let row_height_deg = cell_size_m / METERS_PER_DEGREE;
        let rows = (180.0 / row_height_deg).ceil() as u32;
        let equator = 2.0 * std::f64::consts::PI * EARTH_RADIUS_M;
        let max_cols = ((equator / cell_size_m).floor() as u32).max(1);
        Self {
            cell_size_m,
            row_height_deg,
            rows,
            max_cols,
        }
    }

    /// Cell edge length in metres.
    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    /// Number of rows from pole to pole.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the widest (equatorial) row.
    pub fn max_cols(&self) -> u32 {
        self.max_cols
    }

    /// Row containing the given latitude.
    pub fn row_of(&self, latitude: f64) -> u32 {
        let row = ((latitude.clamp(-90.0, 90.0) + 90.0) / self.row_height_deg).floor() as u32;
        row.min(self.rows - 1)
    }

    /// Number of columns in a row.
    pub fn cols_in_row(&self, row: u32) -> u32 {
        let center_lat = self.row_south(row) + self.row_height_deg / 2.0;
        let circumference =
            2.0 * std::f64::consts::PI * EARTH_RADIUS_M * center_lat.to_radians().cos();
        ((circumference / self.cell_size_m).floor() as u32).clamp(1, self.max_cols)
    }

    /// Column containing `longitude` within `row`.
    fn col_of(&self, row: u32, longitude: f64) -> u32 {
        let cols = self.cols_in_row(row);
        let col = ((longitude.clamp(-180.0, 180.0) + 180.0) / 360.0 * cols as f64).floor() as u32;
        col.min(cols - 1)
    }

    fn row_south(&self, row: u32) -> f64 {
        -90.0 + row as f64 * self.row_height_deg
    }

    /// Cell containing a coordinate.
    ///
    /// Two coordinates yield the same cell iff they fall inside the same
    /// fixed-size square.
    pub fn cell_of(&self, coord: &Coordinate) -> GridCell {
        let row = self.row_of(coord.latitude);
        GridCell {
            row,
            col: self.col_of(row, coord.longitude),
        }
    }

    /// Returns true if the cell exists in this grid.
    pub fn contains_cell(&self, cell: &GridCell) -> bool {
        cell.row < self.rows && cell.col < self.cols_in_row(cell.row)
    }

    /// Bounding box of a cell.
    pub fn cell_bbox(&self, cell: &GridCell) -> BoundingBox {
        let south = self.row_south(cell.row);
        let north = (south + self.row_height_deg).min(90.0);
        let width = 360.0 / self.cols_in_row(cell.row) as f64;
        let west = -180.0 + cell.col as f64 * width;
        BoundingBox::new(south, west, north, (west + width).min(180.0))
    }

    /// Polygon outline of a cell.
    pub fn boundary(&self, cell: &GridCell) -> CellBoundary {
        CellBoundary::from_bbox(&self.cell_bbox(cell))
    }

    /// Centre of a cell.
    pub fn center(&self, cell: &GridCell) -> Coordinate {
        self.cell_bbox(cell).center()
    }

    /// Count the cells fully or partially inside `bbox`.
    pub fn count_in(&self, bbox: &BoundingBox) -> u64 {
        self.count_capped(bbox, u64::MAX)
    }

    /// Count cells, stopping as soon as the running total exceeds `cap`.
    fn count_capped(&self, bbox: &BoundingBox, cap: u64) -> u64 {
        let bbox = bbox.clamped();
        if is_inverted(&bbox) {
            return 0;
        }
        let mut count = 0u64;
        for row in self.row_of(bbox.south)..=self.row_of(bbox.north) {
            let (west, east) = (self.col_of(row, bbox.west), self.col_of(row, bbox.east));
            count += (east - west) as u64 + 1;
            if count > cap {
                break;
            }
        }
        count
    }

    /// Enumerate every cell fully or partially inside `bbox`.
    ///
    /// Cells are returned row by row from the south-west corner. Fails with
    /// [`GridError::TooManyCells`] when the box holds more than `limit`
    /// cells, before allocating anything. The reported count is a lower
    /// bound once the limit is exceeded.
    pub fn cells_in(&self, bbox: &BoundingBox, limit: u64) -> Result<Vec<GridCell>, GridError> {
        let count = self.count_capped(bbox, limit);
        if count > limit {
            return Err(GridError::TooManyCells { count, limit });
        }

        let bbox = bbox.clamped();
        if is_inverted(&bbox) {
            return Ok(Vec::new());
        }
        let mut cells = Vec::with_capacity(count as usize);
        for row in self.row_of(bbox.south)..=self.row_of(bbox.north) {
            let (west, east) = (self.col_of(row, bbox.west), self.col_of(row, bbox.east));
            cells.extend((west..=east).map(|col| GridCell { row, col }));
        }
        Ok(cells)
    }
}

/// Boxes with west past east (antimeridian crossings) or south past north
/// hold no cells.
fn is_inverted(bbox: &BoundingBox) -> bool {
    bbox.west > bbox.east || bbox.south > bbox.north
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::distance_m;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_invalid_cell_size() {
        assert!(matches!(
            CellGrid::new(0.5),
            Err(GridError::InvalidCellSize(_))
        ));
        assert!(matches!(
            CellGrid::new(f64::INFINITY),
            Err(GridError::InvalidCellSize(_))
        ));
        assert!(CellGrid::new(3.0).is_ok());
    }

    #[test]
    fn test_same_cell_for_nearby_points() {
        let grid = CellGrid::default();
        let cell = grid.cell_of(&coord(51.5007, -0.1246));
        let bbox = grid.cell_bbox(&cell);

        // Any point strictly inside the box maps back to the same cell
        let inner = coord(
            bbox.south + (bbox.north - bbox.south) * 0.25,
            bbox.west + (bbox.east - bbox.west) * 0.75,
        );
        assert_eq!(grid.cell_of(&inner), cell);
    }

    #[test]
    fn test_cell_edges_are_fixed_size_in_metres() {
        let grid = CellGrid::default();
        for lat in [0.0, 45.0, 51.5, 70.0] {
            let cell = grid.cell_of(&coord(lat, 10.0));
            let bbox = grid.cell_bbox(&cell);
            let height = distance_m(
                &coord(bbox.south, bbox.west),
                &coord(bbox.north, bbox.west),
            );
            let mid = (bbox.south + bbox.north) / 2.0;
            let width = distance_m(&coord(mid, bbox.west), &coord(mid, bbox.east));

            assert!((height - 3.0).abs() < 0.01, "lat {}: height {}", lat, height);
            assert!((width - 3.0).abs() < 0.01, "lat {}: width {}", lat, width);
        }
    }

    #[test]
    fn test_fewer_columns_towards_poles() {
        let grid = CellGrid::default();
        let equator = grid.cols_in_row(grid.row_of(0.0));
        let north = grid.cols_in_row(grid.row_of(60.0));
        assert!(north < equator);
        // cos(60°) = 0.5
        assert!((north as f64 / equator as f64 - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_poles_are_valid_cells() {
        let grid = CellGrid::default();
        let top = grid.cell_of(&coord(90.0, 180.0));
        let bottom = grid.cell_of(&coord(-90.0, -180.0));
        assert!(grid.contains_cell(&top));
        assert!(grid.contains_cell(&bottom));
        assert_eq!(bottom, GridCell::new(0, 0));
    }

    #[test]
    fn test_cells_in_covers_partial_cells() {
        let grid = CellGrid::new(100.0).unwrap();
        let center = coord(51.5, -0.12);
        let cell = grid.cell_of(&center);
        let bbox = grid.cell_bbox(&cell);

        // A box slightly larger than one cell spills into the neighbouring
        // rows and columns
        let pad_lat = (bbox.north - bbox.south) * 0.1;
        let pad_lon = (bbox.east - bbox.west) * 0.1;
        let view = BoundingBox::new(
            bbox.south - pad_lat,
            bbox.west - pad_lon,
            bbox.north + pad_lat,
            bbox.east + pad_lon,
        );

        let cells = grid.cells_in(&view, 100).unwrap();
        assert!(cells.contains(&cell));
        // Three in the centre row, at least two in each neighbouring row
        assert!(cells.len() >= 7, "Expected at least 7 cells, got {}", cells.len());
        assert_eq!(cells.len() as u64, grid.count_in(&view));
    }

    #[test]
    fn test_cells_in_respects_limit() {
        let grid = CellGrid::default();
        let view = BoundingBox::new(51.0, -1.0, 52.0, 1.0);
        let result = grid.cells_in(&view, 1000);
        assert!(matches!(result, Err(GridError::TooManyCells { limit: 1000, .. })));
    }

    #[test]
    fn test_cells_in_inverted_box_is_empty() {
        let grid = CellGrid::default();
        // Crosses the antimeridian: west edge lies east of the east edge.
        let across = BoundingBox::new(10.0, 179.99995, 10.00005, -179.99995);
        assert_eq!(grid.cells_in(&across, 10_000).unwrap(), Vec::new());

        let upside_down = BoundingBox::new(51.5003, -0.1250, 51.5000, -0.1245);
        assert!(grid.cells_in(&upside_down, 10_000).unwrap().is_empty());
    }

    #[test]
    fn test_cells_in_has_no_duplicates() {
        let grid = CellGrid::default();
        let view = BoundingBox::new(51.5000, -0.1250, 51.5003, -0.1245);
        let cells = grid.cells_in(&view, 10_000).unwrap();
        let unique: std::collections::HashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), cells.len());
    }

    #[test]
    fn test_boundary_corner_order() {
        let grid = CellGrid::default();
        let cell = grid.cell_of(&coord(10.0, 10.0));
        let boundary = grid.boundary(&cell);
        let v = boundary.vertices();

        assert_eq!(v.len(), 4);
        assert_eq!(v[0].latitude, v[1].latitude);
        assert!(v[1].longitude > v[0].longitude);
        assert!(v[2].latitude > v[1].latitude);
        assert_eq!(grid.cell_of(&boundary.center()), cell);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_point_lies_in_its_cell(
                lat in -89.0..89.0_f64,
                lon in -179.9..179.9_f64
            ) {
                let grid = CellGrid::default();
                let point = Coordinate { latitude: lat, longitude: lon };
                let cell = grid.cell_of(&point);
                prop_assert!(grid.contains_cell(&cell));

                let bbox = grid.cell_bbox(&cell);
                let eps = 1e-9;
                prop_assert!(bbox.south - eps <= lat && lat <= bbox.north + eps);
                prop_assert!(bbox.west - eps <= lon && lon <= bbox.east + eps);
            }

            #[test]
            fn test_center_maps_back_to_cell(
                lat in -89.0..89.0_f64,
                lon in -179.9..179.9_f64,
                size in 1.0..500.0_f64
            ) {
                let grid = CellGrid::new(size).unwrap();
                let cell = grid.cell_of(&Coordinate { latitude: lat, longitude: lon });
                prop_assert_eq!(grid.cell_of(&grid.center(&cell)), cell);
            }
        }
    }
}
