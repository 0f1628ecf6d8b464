//! Cell selection and claiming.
//!
//! [`SelectionTracker`] is the only writer of the live [`SelectionSet`] and
//! the [`ClaimingMode`]; everything else reads snapshots.

mod set;
mod tracker;

pub use set::SelectionSet;
pub use tracker::{ClaimRecord, ClaimingMode, SelectionChange, SelectionTracker};
