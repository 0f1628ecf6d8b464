//! Types shared by all address resolvers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::Coordinate;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque identifier of one geographic cell (a three-word address).
///
/// Stable under repeated resolution of any coordinate inside the same cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    /// Wrap an address string.
    pub fn new(words: impl Into<String>) -> Self {
        Self(words.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(words: &str) -> Self {
        Self::new(words)
    }
}

impl From<String> for CellId {
    fn from(words: String) -> Self {
        Self(words)
    }
}

/// Errors returned by address resolution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// The coordinate cannot be resolved.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// The coordinate is outside the service's coverage (e.g. open water).
    #[error("Coordinate outside coverage: {0}")]
    OutOfCoverage(Coordinate),

    /// The address does not name a known cell.
    #[error("Unknown cell: {0}")]
    UnknownCell(String),

    /// The service rejected the request.
    #[error("Service error {code}: {message}")]
    Service { code: String, message: String },

    /// Transport failure talking to the service.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with something we could not read.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Converts coordinates to cell identifiers and back.
///
/// Implementations are consumed as an external capability: the engine keeps
/// no state about them and tolerates latency and failure on every call.
///
/// # Dyn Compatibility
///
/// Async methods return [`BoxFuture`] so resolvers can be shared as
/// `Arc<dyn CellAddressResolver>` and wrapped by decorators such as
/// [`CachedResolver`](super::CachedResolver).
pub trait CellAddressResolver: Send + Sync {
    /// Resolve the cell containing `coordinate`.
    fn resolve_to_cell(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<CellId, ResolutionError>>;

    /// Resolve the centre of the cell named by `cell_id`.
    fn resolve_to_coordinate<'a>(
        &'a self,
        cell_id: &'a CellId,
    ) -> BoxFuture<'a, Result<Coordinate, ResolutionError>>;

    /// Human-readable resolver name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_id_display_and_conversions() {
        let id = CellId::from("filled.count.soap");
        assert_eq!(id.as_str(), "filled.count.soap");
        assert_eq!(id.to_string(), "filled.count.soap");
        assert_eq!(CellId::from(String::from("filled.count.soap")), id);
    }

    #[test]
    fn test_cell_id_serializes_as_plain_string() {
        let id = CellId::new("index.home.raft");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"index.home.raft\"");
    }

    #[test]
    fn test_resolution_error_display() {
        let err = ResolutionError::Service {
            code: "BadCoordinates".to_string(),
            message: "latitude must be >=-90 and <= 90".to_string(),
        };
        assert!(err.to_string().contains("BadCoordinates"));
    }
}
