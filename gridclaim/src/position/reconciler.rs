//! Position-to-cell reconciliation.
//!
//! Sits between the noisy position stream and the selection tracker:
//!
//! 1. [`PositionReconciler::on_position`] skips positions that have not
//!    moved from the anchor (the last coordinate sent for resolution) and
//!    otherwise issues a sequence-tagged [`ResolveTicket`].
//! 2. The caller resolves the ticket asynchronously and hands the outcome
//!    to [`PositionReconciler::accept`].
//! 3. Only the most recently issued ticket is accepted; anything older, or
//!    anything completing after [`PositionReconciler::cancel`], is stale.
//!
//! # Movement threshold
//!
//! With `movement_threshold_m == 0.0` a position counts as unchanged only
//! when latitude and longitude are both exactly equal, so sub-metre float
//! drift still triggers a resolution. A positive threshold skips positions
//! closer than that many metres to the anchor.

use tracing::{debug, warn};

use crate::coord::{distance_m, Coordinate};
use crate::resolver::{CellId, ResolutionError};

/// Reconciler tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReconcilerConfig {
    /// Minimum movement in metres before re-resolving. `0.0` means strict
    /// equality.
    pub movement_threshold_m: f64,
}

impl ReconcilerConfig {
    pub fn with_movement_threshold(movement_threshold_m: f64) -> Self {
        Self {
            movement_threshold_m: movement_threshold_m.max(0.0),
        }
    }
}

/// A resolution request the caller must execute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveTicket {
    pub seq: u64,
    pub coordinate: Coordinate,
}

/// Outcome of handing a resolution result back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Latest request succeeded; forward the cell to the tracker.
    Resolved(CellId),
    /// Latest request failed; selection must stay untouched.
    Failed(ResolutionError),
    /// Superseded or cancelled; drop silently.
    Stale,
}

/// Decides which positions to resolve and which results to keep.
#[derive(Debug, Default)]
pub struct PositionReconciler {
    config: ReconcilerConfig,
    anchor: Option<Coordinate>,
    next_seq: u64,
    awaiting: Option<u64>,
    cancelled: bool,
    stale_dropped: u64,
}

impl PositionReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Last coordinate sent for resolution.
    pub fn anchor(&self) -> Option<Coordinate> {
        self.anchor
    }

    /// Sequence number of the request whose result is still wanted.
    pub fn awaiting(&self) -> Option<u64> {
        self.awaiting
    }

    /// Results discarded as stale so far.
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn unchanged(&self, coordinate: &Coordinate) -> bool {
        let Some(anchor) = self.anchor else {
            return false;
        };
        if self.config.movement_threshold_m > 0.0 {
            distance_m(&anchor, coordinate) < self.config.movement_threshold_m
        } else {
            anchor.same_as(coordinate)
        }
    }

    /// Handle a new position fix.
    pub fn on_position(&mut self, coordinate: Coordinate) -> Option<ResolveTicket> {
        if self.cancelled {
            debug!(%coordinate, "Position ignored: reconciler cancelled");
            return None;
        }
        if self.unchanged(&coordinate) {
            debug!(%coordinate, "Position unchanged, skipping resolution");
            return None;
        }
        self.next_seq += 1;
        self.anchor = Some(coordinate);
        self.awaiting = Some(self.next_seq);
        Some(ResolveTicket {
            seq: self.next_seq,
            coordinate,
        })
    }

    /// Hand back the outcome of ticket `seq`.
    pub fn accept(&mut self, seq: u64, result: Result<CellId, ResolutionError>) -> Reconciled {
        if self.awaiting != Some(seq) {
            self.stale_dropped += 1;
            debug!(seq, awaiting = ?self.awaiting, "Discarding stale resolution");
            return Reconciled::Stale;
        }
        self.awaiting = None;
        match result {
            Ok(cell_id) => Reconciled::Resolved(cell_id),
            Err(e) => {
                warn!(seq, error = %e, "Cell resolution failed");
                // Retry on the next update even if it repeats the coordinate.
                self.anchor = None;
                Reconciled::Failed(e)
            }
        }
    }

    /// Forget the anchor so the next position is resolved unconditionally.
    pub fn reset_anchor(&mut self) {
        self.anchor = None;
    }

    /// Drop the outstanding ticket and the anchor, but keep issuing tickets
    /// for later positions.
    pub fn abandon(&mut self) {
        if let Some(seq) = self.awaiting.take() {
            debug!(seq, "Abandoning in-flight resolution");
        }
        self.anchor = None;
    }

    /// Discard every in-flight result and stop issuing tickets.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.awaiting = None;
        self.anchor = None;
    }

    /// Issue tickets again after [`cancel`](Self::cancel).
    pub fn resume(&mut self) {
        self.cancelled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn id(s: &str) -> CellId {
        CellId::new(s)
    }

    #[test]
    fn test_identical_position_skipped() {
        let mut r = PositionReconciler::default();
        assert!(r.on_position(at(51.5007, -0.1246)).is_some());
        assert!(r.on_position(at(51.5007, -0.1246)).is_none());
    }

    #[test]
    fn test_float_drift_triggers_resolution() {
        let mut r = PositionReconciler::default();
        r.on_position(at(51.5007, -0.1246));
        assert!(r.on_position(at(51.5007, -0.124_600_000_1)).is_some());
    }

    #[test]
    fn test_threshold_suppresses_jitter() {
        let mut r = PositionReconciler::new(ReconcilerConfig::with_movement_threshold(2.0));
        r.on_position(at(51.5007, -0.1246));
        // ~1.1 m north
        assert!(r.on_position(at(51.50071, -0.1246)).is_none());
        // ~11 m north
        assert!(r.on_position(at(51.5008, -0.1246)).is_some());
    }

    #[test]
    fn test_latest_issued_wins() {
        let mut r = PositionReconciler::default();
        let r1 = r.on_position(at(51.5007, -0.1246)).unwrap();
        let r2 = r.on_position(at(51.5008, -0.1246)).unwrap();

        assert_eq!(r.accept(r2.seq, Ok(id("count.filled.soap"))), Reconciled::Resolved(id("count.filled.soap")));
        assert_eq!(r.accept(r1.seq, Ok(id("filled.count.soap"))), Reconciled::Stale);
        assert_eq!(r.stale_dropped(), 1);
    }

    #[test]
    fn test_older_completing_first_is_stale() {
        let mut r = PositionReconciler::default();
        let r1 = r.on_position(at(51.5007, -0.1246)).unwrap();
        let r2 = r.on_position(at(51.5008, -0.1246)).unwrap();

        assert_eq!(r.accept(r1.seq, Ok(id("filled.count.soap"))), Reconciled::Stale);
        assert!(matches!(r.accept(r2.seq, Ok(id("count.filled.soap"))), Reconciled::Resolved(_)));
    }

    #[test]
    fn test_failure_clears_anchor() {
        let mut r = PositionReconciler::default();
        let t = r.on_position(at(51.5007, -0.1246)).unwrap();
        let outcome = r.accept(t.seq, Err(ResolutionError::Http("timeout".into())));

        assert!(matches!(outcome, Reconciled::Failed(_)));
        assert!(r.anchor().is_none());
        assert!(r.on_position(at(51.5007, -0.1246)).is_some());
    }

    #[test]
    fn test_cancel_discards_in_flight() {
        let mut r = PositionReconciler::default();
        let t = r.on_position(at(51.5007, -0.1246)).unwrap();
        r.cancel();

        assert_eq!(r.accept(t.seq, Ok(id("filled.count.soap"))), Reconciled::Stale);
        assert!(r.on_position(at(51.5008, -0.1246)).is_none());

        r.resume();
        assert!(r.on_position(at(51.5008, -0.1246)).is_some());
    }

    #[test]
    fn test_abandon_drops_in_flight_but_keeps_issuing() {
        let mut r = PositionReconciler::default();
        let t = r.on_position(at(51.5007, -0.1246)).unwrap();
        r.abandon();

        assert_eq!(r.accept(t.seq, Ok(id("filled.count.soap"))), Reconciled::Stale);
        assert!(!r.is_cancelled());
        // Anchor is gone, so the same coordinate resolves again.
        let retry = r.on_position(at(51.5007, -0.1246)).unwrap();
        assert!(retry.seq > t.seq);
        assert!(matches!(r.accept(retry.seq, Ok(id("filled.count.soap"))), Reconciled::Resolved(_)));
    }

    #[test]
    fn test_duplicate_result_is_stale() {
        let mut r = PositionReconciler::default();
        let t = r.on_position(at(51.5007, -0.1246)).unwrap();
        assert!(matches!(r.accept(t.seq, Ok(id("a.b.c"))), Reconciled::Resolved(_)));
        assert_eq!(r.accept(t.seq, Ok(id("a.b.c"))), Reconciled::Stale);
    }
}
