//! GridClaim - claim fixed-size map cells by walking through them
//!
//! This library provides the selection engine behind a "claim the ground you
//! walk on" map: it derives which geographic cell a coordinate falls in,
//! renders a cell grid aligned to the visible viewport, and tracks a claiming
//! session that accumulates every cell visited while it is active.
//!
//! # Architecture
//!
//! ```text
//! PositionSource ──► PositionReconciler ──► SelectionTracker ──► GridRenderer ──► MapSurface
//!                          │  (CellId)                                ▲
//!                          ▼                                          │
//!                 CellAddressResolver                        MapEvent (viewport)
//! ```
//!
//! All state lives in a [`session::SessionController`], driven by the
//! [`session::SessionService`] event loop. The presentation layer only talks
//! to a [`session::SessionHandle`].

pub mod config;
pub mod coord;
pub mod grid;
pub mod logging;
pub mod map;
pub mod position;
pub mod resolver;
pub mod selection;
pub mod session;

/// Library version, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
