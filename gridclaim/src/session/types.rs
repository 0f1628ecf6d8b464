//! Session messages, status and configuration.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::coord::Coordinate;
use crate::grid::{GridError, GridRendererConfig, MapEvent, DEFAULT_CELL_SIZE_M};
use crate::position::{PositionUpdate, ReconcilerConfig, WatchOptions};
use crate::resolver::{CellId, ResolutionError};
use crate::selection::{ClaimRecord, ClaimingMode};

/// Input to the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A fix or failure from the position stream.
    Position(PositionUpdate),
    /// Outcome of a [`SessionCommand::ResolveCell`].
    CellResolved {
        seq: u64,
        result: Result<CellId, ResolutionError>,
    },
    /// Outcome of a [`SessionCommand::ResolveCentroid`].
    CentroidResolved {
        cell_id: CellId,
        result: Result<Coordinate, ResolutionError>,
    },
    /// Viewport activity from the map.
    Map(MapEvent),
    StartTracking,
    FinishTracking,
}

/// Work the controller asks its driver to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Resolve the cell containing `coordinate`; reply with
    /// [`SessionEvent::CellResolved`] carrying the same `seq`.
    ResolveCell { seq: u64, coordinate: Coordinate },
    /// Look up a cell's centre for highlighting; reply with
    /// [`SessionEvent::CentroidResolved`].
    ResolveCentroid { cell_id: CellId },
}

/// Availability of the device position as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationStatus {
    /// Waiting for the first fix.
    #[default]
    Acquiring,
    /// Position known and resolved.
    Available,
    /// Position known but the last resolution failed.
    Unresolved,
    /// Permission denied or signal lost.
    Unavailable,
}

impl LocationStatus {
    /// Whether the map, grid and selection should be shown.
    pub fn map_visible(self) -> bool {
        matches!(self, LocationStatus::Available | LocationStatus::Unresolved)
    }

    /// Coarse available/unavailable view. A failed resolution counts as
    /// unavailable even though the map stays up.
    pub fn is_available(self) -> bool {
        self == LocationStatus::Available
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationStatus::Acquiring => "acquiring",
            LocationStatus::Available => "available",
            LocationStatus::Unresolved => "unresolved",
            LocationStatus::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Everything the presentation layer reads, captured between events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub mode: ClaimingMode,
    /// Live selection in visiting order.
    pub selection: Vec<CellId>,
    /// Most recently resolved cell.
    pub current_cell: Option<CellId>,
    pub location_status: LocationStatus,
    pub last_claim: Option<ClaimRecord>,
    /// False while the viewport moves.
    pub overlays_visible: bool,
    /// Where the "you are here" label belongs; `None` while claiming.
    pub you_are_here: Option<Coordinate>,
    /// Resolutions dropped because a newer one was issued.
    pub stale_discarded: u64,
}

/// Session tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub cell_size_m: f64,
    pub renderer: GridRendererConfig,
    pub reconciler: ReconcilerConfig,
    pub watch: WatchOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cell_size_m: DEFAULT_CELL_SIZE_M,
            renderer: GridRendererConfig::default(),
            reconciler: ReconcilerConfig::default(),
            watch: WatchOptions {
                high_accuracy: true,
            },
        }
    }
}

/// Session failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("session has shut down")]
    Closed,
}
