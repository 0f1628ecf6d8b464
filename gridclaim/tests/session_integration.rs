//! Integration tests for a full claiming session.
//!
//! These tests drive a real `SessionService` through its public handle:
//! - position feed → reconciler → selection → map surface
//! - claiming start/finish with the frozen claim record
//! - stale and duplicate resolution suppression
//! - shutdown discarding in-flight resolutions
//!
//! Run with: `cargo test --test session_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use gridclaim::coord::Coordinate;
use gridclaim::grid::{MapEvent, ViewportState};
use gridclaim::map::{HighlightRole, MarkerKind, RecordingSurface};
use gridclaim::position::{ChannelPositionSource, LocationError, PositionFeed};
use gridclaim::resolver::{
    BoxFuture, CachedResolver, CellAddressResolver, CellId, LocalResolver, ResolutionError,
};
use gridclaim::selection::ClaimingMode;
use gridclaim::session::{
    LocationStatus, SessionConfig, SessionError, SessionHandle, SessionService, SessionSnapshot,
};

// ============================================================================
// Helper Functions
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

fn at(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

fn id(s: &str) -> CellId {
    CellId::new(s)
}

/// Westminster, resolving to "filled.count.soap".
fn westminster() -> Coordinate {
    at(51.5007, -0.1246)
}

/// About 11 m north, resolving to "count.filled.soap".
fn north() -> Coordinate {
    at(51.5008, -0.1246)
}

/// About 11 m further north, resolving to "soap.count.filled".
fn further_north() -> Coordinate {
    at(51.5009, -0.1246)
}

/// Resolver answering from a fixed table, optionally holding answers back.
struct ScriptedResolver {
    table: Vec<(Coordinate, CellId)>,
    gates: Mutex<Vec<(Coordinate, Arc<Notify>)>>,
    cell_calls: AtomicUsize,
}

impl ScriptedResolver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            table: vec![
                (westminster(), id("filled.count.soap")),
                (north(), id("count.filled.soap")),
                (further_north(), id("soap.count.filled")),
            ],
            gates: Mutex::new(Vec::new()),
            cell_calls: AtomicUsize::new(0),
        })
    }

    /// Hold back the answer for `coordinate` until the returned gate opens.
    fn gate(&self, coordinate: Coordinate) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().push((coordinate, Arc::clone(&notify)));
        notify
    }

    fn cell_calls(&self) -> usize {
        self.cell_calls.load(Ordering::SeqCst)
    }
}

impl CellAddressResolver for ScriptedResolver {
    fn resolve_to_cell(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<CellId, ResolutionError>> {
        self.cell_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .gates
            .lock()
            .iter()
            .find(|(c, _)| c.same_as(&coordinate))
            .map(|(_, n)| Arc::clone(n));
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.table
                .iter()
                .find(|(c, _)| c.same_as(&coordinate))
                .map(|(_, cell)| cell.clone())
                .ok_or(ResolutionError::OutOfCoverage(coordinate))
        })
    }

    fn resolve_to_coordinate<'a>(
        &'a self,
        cell_id: &'a CellId,
    ) -> BoxFuture<'a, Result<Coordinate, ResolutionError>> {
        Box::pin(async move {
            self.table
                .iter()
                .find(|(_, cell)| cell == cell_id)
                .map(|(c, _)| *c)
                .ok_or_else(|| ResolutionError::UnknownCell(cell_id.to_string()))
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct Harness {
    handle: SessionHandle,
    feed: PositionFeed,
    surface: RecordingSurface,
}

fn start(resolver: Arc<dyn CellAddressResolver>) -> Harness {
    let source = ChannelPositionSource::default();
    let feed = source.feed();
    let surface = RecordingSurface::new();
    let handle = SessionService::start(
        SessionConfig::default(),
        resolver,
        &source,
        Box::new(surface.clone()),
    )
    .unwrap();
    Harness {
        handle,
        feed,
        surface,
    }
}

/// Wait until the published snapshot satisfies `predicate`.
async fn wait_for(
    handle: &SessionHandle,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("session stopped");
    snapshot.clone()
}

/// Poll `condition` until it holds.
async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Walk through two cells while claiming and check the frozen claim.
#[tokio::test]
async fn test_claiming_walkthrough() {
    let h = start(ScriptedResolver::new());

    h.feed.send(Ok(westminster())).await;
    let snapshot = wait_for(&h.handle, |s| s.current_cell.is_some()).await;
    assert_eq!(snapshot.selection, vec![id("filled.count.soap")]);
    assert_eq!(snapshot.mode, ClaimingMode::Idle);
    assert_eq!(snapshot.location_status, LocationStatus::Available);

    eventually(|| h.surface.marker(MarkerKind::YouAreHere).is_some()).await;

    let snapshot = h.handle.start_tracking().await.unwrap();
    assert_eq!(snapshot.mode, ClaimingMode::Active);
    assert_eq!(snapshot.selection, vec![id("filled.count.soap")]);
    assert!(snapshot.you_are_here.is_none());

    h.feed.send(Ok(north())).await;
    let snapshot = wait_for(&h.handle, |s| s.selection.len() == 2).await;
    assert_eq!(
        snapshot.selection,
        vec![id("filled.count.soap"), id("count.filled.soap")]
    );
    eventually(|| h.surface.is_highlighted_as(&id("count.filled.soap"), HighlightRole::Claiming)).await;

    let snapshot = h.handle.finish_tracking().await.unwrap();
    assert_eq!(snapshot.mode, ClaimingMode::Idle);
    assert!(snapshot.selection.is_empty());
    let claim = snapshot.last_claim.expect("claim recorded");
    assert_eq!(claim.cells(), &[id("filled.count.soap"), id("count.filled.soap")]);
    assert!(h.surface.is_highlighted_as(&id("filled.count.soap"), HighlightRole::Claimed));

    // Idle tracking starts fresh from the next fix.
    h.feed.send(Ok(further_north())).await;
    let snapshot = wait_for(&h.handle, |s| !s.selection.is_empty()).await;
    assert_eq!(snapshot.selection, vec![id("soap.count.filled")]);
    assert_eq!(snapshot.last_claim.unwrap().len(), 2);

    h.handle.shutdown().await;
}

/// Claiming with no movement claims exactly the current cell.
#[tokio::test]
async fn test_start_finish_claims_current_cell() {
    let h = start(ScriptedResolver::new());

    h.feed.send(Ok(westminster())).await;
    wait_for(&h.handle, |s| s.current_cell.is_some()).await;

    h.handle.start_tracking().await.unwrap();
    let snapshot = h.handle.finish_tracking().await.unwrap();
    assert_eq!(snapshot.last_claim.unwrap().cells(), &[id("filled.count.soap")]);

    h.handle.shutdown().await;
}

/// An older resolution finishing last must not overwrite a newer one.
#[tokio::test]
async fn test_stale_resolution_discarded() {
    let resolver = ScriptedResolver::new();
    let slow = resolver.gate(westminster());
    let h = start(resolver.clone());

    h.feed.send(Ok(westminster())).await;
    h.feed.send(Ok(north())).await;
    let snapshot = wait_for(&h.handle, |s| s.current_cell.is_some()).await;
    assert_eq!(snapshot.current_cell, Some(id("count.filled.soap")));

    slow.notify_one();
    let snapshot = wait_for(&h.handle, |s| s.stale_discarded == 1).await;
    assert_eq!(snapshot.current_cell, Some(id("count.filled.soap")));
    assert_eq!(snapshot.selection, vec![id("count.filled.soap")]);
    assert_eq!(resolver.cell_calls(), 2);

    h.handle.shutdown().await;
}

/// The same coordinate twice in a row is resolved once.
#[tokio::test]
async fn test_duplicate_coordinate_resolved_once() {
    let resolver = ScriptedResolver::new();
    let h = start(resolver.clone());

    h.feed.send(Ok(westminster())).await;
    h.feed.send(Ok(westminster())).await;
    h.feed.send(Ok(north())).await;
    wait_for(&h.handle, |s| s.current_cell == Some(id("count.filled.soap"))).await;

    assert_eq!(resolver.cell_calls(), 2);
    h.handle.shutdown().await;
}

/// Shutdown stops the stream and drops in-flight results.
#[tokio::test]
async fn test_shutdown_discards_in_flight() {
    let resolver = ScriptedResolver::new();
    let gate = resolver.gate(westminster());
    let h = start(resolver.clone());

    h.feed.send(Ok(westminster())).await;
    eventually(|| resolver.cell_calls() == 1).await;

    h.handle.shutdown().await;
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.handle.current_cell().is_none());
    assert!(h.handle.is_closed());
    assert_eq!(h.feed.subscriber_count(), 0);
    assert_eq!(h.feed.send(Ok(north())).await, 0);
    assert!(matches!(h.handle.start_tracking().await, Err(SessionError::Closed)));
    assert_eq!(resolver.cell_calls(), 1);
}

/// Losing the location hides the map; the next fix restores it.
#[tokio::test]
async fn test_location_loss_and_recovery() {
    let h = start(ScriptedResolver::new());

    h.feed.send(Ok(westminster())).await;
    wait_for(&h.handle, |s| s.current_cell.is_some()).await;
    eventually(|| !h.surface.highlights().is_empty()).await;

    h.feed.send(Err(LocationError::PositionUnavailable)).await;
    let snapshot = wait_for(&h.handle, |s| s.location_status == LocationStatus::Unavailable).await;
    assert_eq!(snapshot.selection, vec![id("filled.count.soap")]);
    assert!(h.surface.highlights().is_empty());

    h.feed.send(Ok(westminster())).await;
    wait_for(&h.handle, |s| s.location_status == LocationStatus::Available).await;
    eventually(|| h.surface.is_highlighted_as(&id("filled.count.soap"), HighlightRole::Current)).await;

    h.handle.shutdown().await;
}

/// Settled viewports are debounced into a single grid render.
#[tokio::test]
async fn test_viewport_settle_draws_grid() {
    let h = start(ScriptedResolver::new());
    h.feed.send(Ok(westminster())).await;
    wait_for(&h.handle, |s| s.current_cell.is_some()).await;

    let near = ViewportState::new(westminster(), 20.0, 200, 200).unwrap();
    let nearer = ViewportState::new(westminster(), 21.0, 200, 200).unwrap();
    let snapshot = h.handle.map_event(MapEvent::MoveStart).await.unwrap();
    assert!(!snapshot.overlays_visible);
    h.handle.map_event(MapEvent::Settled(near)).await.unwrap();
    h.handle.map_event(MapEvent::Settled(nearer)).await.unwrap();

    wait_for(&h.handle, |s| s.overlays_visible).await;
    assert!(h.surface.grid_count() > 0);
    assert!(h.surface.overlays_visible());
    // Only the last settled viewport was drawn.
    assert_eq!(h.surface.stats().layers_removed, 0);

    h.handle.shutdown().await;
}

/// Walking north with the offline resolver claims one cell per step.
#[tokio::test]
async fn test_offline_walk_claims_each_cell() {
    let local = LocalResolver::default();
    let resolver: Arc<dyn CellAddressResolver> =
        Arc::new(CachedResolver::new(Arc::new(local.clone()), 64));
    let h = start(resolver);

    let step_deg = 3.5 / gridclaim::coord::METERS_PER_DEGREE;
    let mut position = westminster();
    h.feed.send(Ok(position)).await;
    let first = local.cell_for(&position).unwrap();
    wait_for(&h.handle, |s| s.current_cell.as_ref() == Some(&first)).await;

    h.handle.start_tracking().await.unwrap();
    for _ in 0..5 {
        position = at(position.latitude + step_deg, position.longitude);
        let expected = local.cell_for(&position).unwrap();
        h.feed.send(Ok(position)).await;
        wait_for(&h.handle, |s| s.current_cell.as_ref() == Some(&expected)).await;
    }

    let snapshot = h.handle.finish_tracking().await.unwrap();
    let claim = snapshot.last_claim.unwrap();
    assert_eq!(claim.len(), 6);
    assert_eq!(claim.cells()[0], first);

    h.handle.shutdown().await;
}
