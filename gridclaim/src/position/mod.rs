//! Device position input.
//!
//! - [`PositionSource`] / [`PositionSubscription`]: the cancellable stream
//!   of fixes and failures.
//! - [`PositionReconciler`]: turns fixes into resolution requests and
//!   guards the selection against duplicate and stale results.

mod reconciler;
mod source;

pub use reconciler::{PositionReconciler, Reconciled, ReconcilerConfig, ResolveTicket};
pub use source::{
    ChannelPositionSource, LocationError, PositionFeed, PositionSource, PositionSubscription,
    PositionUpdate, WatchOptions, DEFAULT_CHANNEL_CAPACITY,
};
