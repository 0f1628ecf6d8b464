//! Claiming state machine.
//!
//! ```text
//!            start_claiming
//!   ┌──────┐ ─────────────► ┌────────┐
//!   │ Idle │                │ Active │
//!   └──────┘ ◄───────────── └────────┘
//!            finish_claiming
//!            (freezes ClaimRecord)
//! ```
//!
//! While Idle the live set holds at most the user's current cell, replaced
//! as they move. While Active it accumulates every distinct cell visited,
//! starting with the cell current when claiming began.
//!
//! Every call that changes state returns exactly one [`SelectionChange`];
//! no-op calls return `None` so callers never redraw for nothing.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::set::SelectionSet;
use crate::resolver::CellId;

/// Whether a claiming session is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimingMode {
    #[default]
    Idle,
    Active,
}

impl std::fmt::Display for ClaimingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimingMode::Idle => write!(f, "idle"),
            ClaimingMode::Active => write!(f, "active"),
        }
    }
}

/// Cells claimed by a completed claiming session. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRecord {
    cells: Vec<CellId>,
    started_at: Instant,
    finished_at: Instant,
}

impl ClaimRecord {
    /// Claimed cells in visiting order.
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn finished_at(&self) -> Instant {
        self.finished_at
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Render request emitted after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    /// Mode after the change.
    pub mode: ClaimingMode,
    /// Live selection after the change.
    pub cells: Vec<CellId>,
}

/// Owner of the live selection and claiming mode.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    mode: ClaimingMode,
    live: SelectionSet,
    started_at: Option<Instant>,
    last_claim: Option<ClaimRecord>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ClaimingMode {
        self.mode
    }

    /// Live selection in visiting order.
    pub fn selection(&self) -> &[CellId] {
        self.live.as_slice()
    }

    /// Most recently frozen claim, kept until the next one replaces it.
    pub fn last_claim(&self) -> Option<&ClaimRecord> {
        self.last_claim.as_ref()
    }

    /// Idle → Active. The current Idle cell becomes the first claimed cell.
    pub fn start_claiming(&mut self, now: Instant) -> Option<SelectionChange> {
        if self.mode == ClaimingMode::Active {
            debug!("start_claiming ignored: already active");
            return None;
        }
        self.mode = ClaimingMode::Active;
        self.started_at = Some(now);
        info!(initial = ?self.live.first(), "Claiming started");
        Some(self.change())
    }

    /// Active → Idle. Freezes the live set into a [`ClaimRecord`] and
    /// empties it; Idle tracking resumes from the next observed cell.
    pub fn finish_claiming(&mut self, now: Instant) -> Option<SelectionChange> {
        if self.mode == ClaimingMode::Idle {
            debug!("finish_claiming ignored: already idle");
            return None;
        }
        let record = ClaimRecord {
            cells: self.live.to_vec(),
            started_at: self.started_at.take().unwrap_or(now),
            finished_at: now,
        };
        info!(cells = record.len(), "Claiming finished");
        self.last_claim = Some(record);
        self.live.clear();
        self.mode = ClaimingMode::Idle;
        Some(self.change())
    }

    /// Feed the cell the user is in.
    pub fn observe(&mut self, cell_id: CellId) -> Option<SelectionChange> {
        match self.mode {
            ClaimingMode::Idle => {
                if self.live.len() == 1 && self.live.contains(&cell_id) {
                    return None;
                }
                self.live.clear();
                self.live.insert(cell_id);
            }
            ClaimingMode::Active => {
                if !self.live.insert(cell_id) {
                    return None;
                }
            }
        }
        Some(self.change())
    }

    fn change(&self) -> SelectionChange {
        SelectionChange {
            mode: self.mode,
            cells: self.live.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CellId {
        CellId::new(s)
    }

    #[test]
    fn test_idle_replaces_current_cell() {
        let mut tracker = SelectionTracker::new();
        assert!(tracker.observe(id("a.a.a")).is_some());
        assert!(tracker.observe(id("b.b.b")).is_some());
        assert_eq!(tracker.selection(), &[id("b.b.b")]);
    }

    #[test]
    fn test_repeated_observe_is_noop() {
        let mut tracker = SelectionTracker::new();
        assert!(tracker.observe(id("a.a.a")).is_some());
        assert!(tracker.observe(id("a.a.a")).is_none());

        tracker.start_claiming(Instant::now());
        tracker.observe(id("b.b.b"));
        assert!(tracker.observe(id("b.b.b")).is_none());
        assert!(tracker.observe(id("a.a.a")).is_none());
    }

    #[test]
    fn test_start_keeps_idle_cell_first() {
        let mut tracker = SelectionTracker::new();
        tracker.observe(id("filled.count.soap"));
        let change = tracker.start_claiming(Instant::now()).unwrap();

        assert_eq!(change.mode, ClaimingMode::Active);
        assert_eq!(change.cells, vec![id("filled.count.soap")]);
    }

    #[test]
    fn test_duplicate_transitions_are_noops() {
        let mut tracker = SelectionTracker::new();
        assert!(tracker.finish_claiming(Instant::now()).is_none());
        assert!(tracker.start_claiming(Instant::now()).is_some());
        assert!(tracker.start_claiming(Instant::now()).is_none());
        assert!(tracker.last_claim().is_none());
    }

    #[test]
    fn test_finish_freezes_claim() {
        let start = Instant::now();
        let mut tracker = SelectionTracker::new();
        tracker.observe(id("filled.count.soap"));
        tracker.start_claiming(start);
        tracker.observe(id("count.filled.soap"));

        let end = start + std::time::Duration::from_secs(30);
        let change = tracker.finish_claiming(end).unwrap();
        assert_eq!(change.mode, ClaimingMode::Idle);
        assert!(change.cells.is_empty());

        let claim = tracker.last_claim().unwrap();
        assert_eq!(claim.cells(), &[id("filled.count.soap"), id("count.filled.soap")]);
        assert_eq!(claim.started_at(), start);
        assert_eq!(claim.finished_at(), end);

        // Idle tracking resumes independently of the record.
        tracker.observe(id("soap.count.filled"));
        assert_eq!(tracker.selection(), &[id("soap.count.filled")]);
        assert_eq!(tracker.last_claim().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_claim_when_nothing_resolved() {
        let mut tracker = SelectionTracker::new();
        tracker.start_claiming(Instant::now());
        tracker.finish_claiming(Instant::now());
        assert!(tracker.last_claim().unwrap().is_empty());
    }

    #[test]
    fn test_next_claim_replaces_previous() {
        let mut tracker = SelectionTracker::new();
        tracker.observe(id("a.a.a"));
        tracker.start_claiming(Instant::now());
        tracker.finish_claiming(Instant::now());
        tracker.observe(id("b.b.b"));
        tracker.start_claiming(Instant::now());
        tracker.finish_claiming(Instant::now());
        assert_eq!(tracker.last_claim().unwrap().cells(), &[id("b.b.b")]);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn cells() -> impl Strategy<Value = Vec<CellId>> {
            prop::collection::vec(0u8..6, 0..40)
                .prop_map(|v| v.into_iter().map(|n| CellId::new(format!("cell.{}.x", n))).collect())
        }

        proptest! {
            #[test]
            fn test_idle_tracks_last_cell(seq in cells()) {
                let mut tracker = SelectionTracker::new();
                for c in &seq {
                    tracker.observe(c.clone());
                }
                let expected: Vec<CellId> = seq.last().cloned().into_iter().collect();
                prop_assert_eq!(tracker.selection(), expected.as_slice());
            }

            #[test]
            fn test_active_keeps_first_occurrences(seq in cells()) {
                let mut tracker = SelectionTracker::new();
                tracker.start_claiming(Instant::now());
                for c in &seq {
                    tracker.observe(c.clone());
                }
                let mut expected: Vec<CellId> = Vec::new();
                for c in &seq {
                    if !expected.contains(c) {
                        expected.push(c.clone());
                    }
                }
                prop_assert_eq!(tracker.selection(), expected.as_slice());
            }

            #[test]
            fn test_one_change_per_effective_observe(seq in cells()) {
                let mut tracker = SelectionTracker::new();
                tracker.start_claiming(Instant::now());
                let changes = seq.iter().filter(|c| tracker.observe((*c).clone()).is_some()).count();
                prop_assert_eq!(changes, tracker.selection().len());
            }

            #[test]
            fn test_start_finish_claims_current_cell(seq in cells()) {
                let mut tracker = SelectionTracker::new();
                for c in &seq {
                    tracker.observe(c.clone());
                }
                tracker.start_claiming(Instant::now());
                tracker.finish_claiming(Instant::now());
                let expected: Vec<CellId> = seq.last().cloned().into_iter().collect();
                prop_assert_eq!(tracker.last_claim().unwrap().cells(), expected.as_slice());
            }
        }
    }
}
