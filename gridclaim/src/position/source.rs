//! Device position stream capability.
//!
//! A [`PositionSource`] hands out [`PositionSubscription`]s. Each
//! subscription owns the receiving end of a bounded `mpsc` channel and a
//! `CancellationToken`; once unsubscribed it yields nothing further, even
//! if the producer keeps sending.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coord::Coordinate;

/// Default buffered updates per subscription.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Why the device position is not available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable (signal lost)")]
    PositionUnavailable,

    #[error("timed out waiting for a position fix")]
    Timeout,
}

/// One item of the position stream.
pub type PositionUpdate = Result<Coordinate, LocationError>;

/// Options passed when subscribing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Request the most accurate fix the device can provide.
    pub high_accuracy: bool,
}

/// Live subscription to a position stream.
#[derive(Debug)]
pub struct PositionSubscription {
    rx: mpsc::Receiver<PositionUpdate>,
    cancel: CancellationToken,
}

impl PositionSubscription {
    /// Build a subscription around a receiver and its cancellation token.
    pub fn new(rx: mpsc::Receiver<PositionUpdate>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Next update, or `None` once unsubscribed or the source is gone.
    pub async fn next(&mut self) -> Option<PositionUpdate> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            update = self.rx.recv() => update,
        }
    }

    /// Stop receiving updates. Buffered updates are dropped.
    pub fn unsubscribe(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        debug!("Position subscription cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PositionSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A source of device positions.
pub trait PositionSource: Send + Sync {
    /// Start watching the device position.
    fn subscribe(&self, options: WatchOptions) -> PositionSubscription;
}

struct Subscriber {
    tx: mpsc::Sender<PositionUpdate>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct ChannelState {
    subscribers: Vec<Subscriber>,
    last_options: Option<WatchOptions>,
}

/// Position source fed programmatically through a [`PositionFeed`].
#[derive(Clone)]
pub struct ChannelPositionSource {
    state: Arc<Mutex<ChannelState>>,
    capacity: usize,
}

impl Default for ChannelPositionSource {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ChannelPositionSource {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState::default())),
            capacity: capacity.max(1),
        }
    }

    /// Producer handle delivering updates to every live subscription.
    pub fn feed(&self) -> PositionFeed {
        PositionFeed {
            state: Arc::clone(&self.state),
        }
    }

    /// Options of the most recent subscription.
    pub fn last_options(&self) -> Option<WatchOptions> {
        self.state.lock().last_options
    }
}

impl PositionSource for ChannelPositionSource {
    fn subscribe(&self, options: WatchOptions) -> PositionSubscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let cancel = CancellationToken::new();
        let mut state = self.state.lock();
        state.last_options = Some(options);
        state.subscribers.push(Subscriber {
            tx,
            cancel: cancel.clone(),
        });
        debug!(high_accuracy = options.high_accuracy, "Position subscription opened");
        PositionSubscription::new(rx, cancel)
    }
}

/// Sending half of a [`ChannelPositionSource`].
#[derive(Clone)]
pub struct PositionFeed {
    state: Arc<Mutex<ChannelState>>,
}

impl PositionFeed {
    /// Deliver `update` to all live subscriptions, in order.
    ///
    /// Returns the number of subscriptions that received it.
    pub async fn send(&self, update: PositionUpdate) -> usize {
        let senders: Vec<mpsc::Sender<PositionUpdate>> = {
            let mut state = self.state.lock();
            state
                .subscribers
                .retain(|s| !s.cancel.is_cancelled() && !s.tx.is_closed());
            state.subscribers.iter().map(|s| s.tx.clone()).collect()
        };

        let mut delivered = 0;
        for tx in senders {
            if tx.send(update).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .subscribers
            .iter()
            .filter(|s| !s.cancel.is_cancelled() && !s.tx.is_closed())
            .count()
    }
}
