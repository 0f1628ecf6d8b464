//! CLI command implementations.

pub mod cell;
pub mod common;
pub mod grid;
pub mod init;
pub mod replay;
