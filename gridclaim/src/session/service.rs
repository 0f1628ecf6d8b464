//! Async session driver.
//!
//! [`SessionService::start`] spawns one tokio task that owns the
//! [`SessionController`] and multiplexes its inputs:
//!
//! ```text
//!  PositionSubscription ──┐
//!  SessionHandle (ctrl) ──┼──► select! ──► controller.handle() ──► watch<SessionSnapshot>
//!  resolution results ────┤                    │
//!  redraw deadline ───────┘                    └──► spawned resolver calls
//! ```
//!
//! Resolver calls run as spawned tasks so a slow lookup never blocks
//! position processing; their results re-enter the loop as events and the
//! reconciler decides whether they are still wanted. Shutdown unsubscribes
//! the stream, aborts in-flight lookups and cancels the reconciler so no
//! late result can change state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant as TokioInstant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::controller::SessionController;
use super::types::{LocationStatus, SessionCommand, SessionConfig, SessionError, SessionEvent, SessionSnapshot};
use crate::grid::MapEvent;
use crate::map::MapSurface;
use crate::position::{PositionSource, PositionSubscription};
use crate::resolver::{CellAddressResolver, CellId};
use crate::selection::{ClaimRecord, ClaimingMode};

/// Queued control messages per session.
const CONTROL_CAPACITY: usize = 32;

/// Idle wake-up interval when no redraw is scheduled.
const IDLE_WAKE: Duration = Duration::from_secs(3600);

struct Control {
    event: SessionEvent,
    ack: oneshot::Sender<SessionSnapshot>,
}

/// Entry point for running a session.
pub struct SessionService;

impl SessionService {
    /// Subscribe to `source` and spawn the session loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: SessionConfig,
        resolver: Arc<dyn CellAddressResolver>,
        source: &dyn PositionSource,
        surface: Box<dyn MapSurface>,
    ) -> Result<SessionHandle, SessionError> {
        let controller = SessionController::new(&config, surface)?;
        let subscription = source.subscribe(config.watch);

        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        info!(resolver = resolver.name(), cell_size_m = config.cell_size_m, "Session starting");

        let session_loop = SessionLoop {
            controller,
            resolver,
            subscription,
            control_rx,
            results_tx,
            results_rx,
            snapshot_tx,
            shutdown: shutdown.clone(),
            lookups: JoinSet::new(),
        };
        let task = tokio::spawn(session_loop.run());

        Ok(SessionHandle {
            control: control_tx,
            snapshot: snapshot_rx,
            shutdown,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}

struct SessionLoop {
    controller: SessionController,
    resolver: Arc<dyn CellAddressResolver>,
    subscription: PositionSubscription,
    control_rx: mpsc::Receiver<Control>,
    results_tx: mpsc::UnboundedSender<SessionEvent>,
    results_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    shutdown: CancellationToken,
    lookups: JoinSet<()>,
}

impl SessionLoop {
    async fn run(mut self) {
        let mut stream_open = true;

        loop {
            let deadline = self.controller.next_deadline();
            let wake = match deadline {
                Some(at) => TokioInstant::from_std(at),
                None => TokioInstant::now() + IDLE_WAKE,
            };

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                control = self.control_rx.recv() => match control {
                    Some(Control { event, ack }) => {
                        self.apply(event);
                        let _ = ack.send(self.controller.snapshot());
                    }
                    None => {
                        debug!("All session handles dropped");
                        break;
                    }
                },

                Some(event) = self.results_rx.recv() => self.apply(event),

                update = self.subscription.next(), if stream_open => match update {
                    Some(update) => self.apply(SessionEvent::Position(update)),
                    None => {
                        debug!("Position stream ended");
                        stream_open = false;
                    }
                },

                _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                    if self.controller.on_tick(now()).is_some() {
                        self.publish();
                    }
                }

                Some(_) = self.lookups.join_next(), if !self.lookups.is_empty() => {}
            }
        }

        self.subscription.unsubscribe();
        self.lookups.abort_all();
        self.controller.cancel();
        self.publish();
        info!("Session stopped");
    }

    fn apply(&mut self, event: SessionEvent) {
        let commands = self.controller.handle(event, now());
        for command in commands {
            self.execute(command);
        }
        self.publish();
    }

    fn execute(&mut self, command: SessionCommand) {
        let resolver = Arc::clone(&self.resolver);
        let tx = self.results_tx.clone();
        match command {
            SessionCommand::ResolveCell { seq, coordinate } => {
                trace!(seq, %coordinate, "Spawning cell resolution");
                self.lookups.spawn(async move {
                    let result = resolver.resolve_to_cell(coordinate).await;
                    let _ = tx.send(SessionEvent::CellResolved { seq, result });
                });
            }
            SessionCommand::ResolveCentroid { cell_id } => {
                trace!(%cell_id, "Spawning centroid lookup");
                self.lookups.spawn(async move {
                    let result = resolver.resolve_to_coordinate(&cell_id).await;
                    let _ = tx.send(SessionEvent::CentroidResolved { cell_id, result });
                });
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.controller.snapshot());
    }
}

/// Current time on the tokio clock, as a std instant.
fn now() -> std::time::Instant {
    TokioInstant::now().into_std()
}

/// Presentation-facing handle to a running session.
///
/// Cloning is cheap; all clones talk to the same session.
#[derive(Clone)]
pub struct SessionHandle {
    control: mpsc::Sender<Control>,
    snapshot: watch::Receiver<SessionSnapshot>,
    shutdown: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn mode(&self) -> ClaimingMode {
        self.snapshot.borrow().mode
    }

    pub fn selection(&self) -> Vec<CellId> {
        self.snapshot.borrow().selection.clone()
    }

    pub fn current_cell(&self) -> Option<CellId> {
        self.snapshot.borrow().current_cell.clone()
    }

    pub fn location_status(&self) -> LocationStatus {
        self.snapshot.borrow().location_status
    }

    pub fn last_claim(&self) -> Option<ClaimRecord> {
        self.snapshot.borrow().last_claim.clone()
    }

    /// Receiver notified after every applied event.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Begin claiming. Resolves once the transition is applied.
    pub async fn start_tracking(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(SessionEvent::StartTracking).await
    }

    /// Finish claiming and freeze the claim.
    pub async fn finish_tracking(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(SessionEvent::FinishTracking).await
    }

    /// Forward a viewport event from the map.
    pub async fn map_event(&self, event: MapEvent) -> Result<SessionSnapshot, SessionError> {
        self.send(SessionEvent::Map(event)).await
    }

    async fn send(&self, event: SessionEvent) -> Result<SessionSnapshot, SessionError> {
        if self.shutdown.is_cancelled() {
            return Err(SessionError::Closed);
        }
        let (ack, done) = oneshot::channel();
        self.control
            .send(Control { event, ack })
            .await
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }

    /// Whether the session loop has stopped or is stopping.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.control.is_closed()
    }

    /// Stop the session and wait for the loop to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}
