//! Claiming session orchestration.
//!
//! - [`SessionController`]: synchronous state machine; events in, commands
//!   out. Testable without a runtime, map or device.
//! - [`SessionService`] / [`SessionHandle`]: tokio driver executing the
//!   controller's commands and publishing [`SessionSnapshot`]s.

mod controller;
mod service;
mod types;

pub use controller::SessionController;
pub use service::{SessionHandle, SessionService};
pub use types::{
    LocationStatus, SessionCommand, SessionConfig, SessionError, SessionEvent, SessionSnapshot,
};
