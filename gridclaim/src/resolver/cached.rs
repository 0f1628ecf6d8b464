//! Centroid caching resolver.
//!
//! Wraps another [`CellAddressResolver`] and memoizes
//! `resolve_to_coordinate` results in a `moka::future::Cache`. A cell's
//! centroid never changes, so entries only leave the cache through LRU
//! eviction. `resolve_to_cell` is passed through uncached: positions rarely
//! repeat exactly, and the session already skips unchanged positions.

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::trace;

use super::types::{BoxFuture, CellAddressResolver, CellId, ResolutionError};
use crate::coord::Coordinate;

/// Default number of cached centroids.
pub const DEFAULT_CACHE_CAPACITY: u64 = 4096;

/// Resolver decorator caching cell centroids.
pub struct CachedResolver {
    inner: Arc<dyn CellAddressResolver>,
    centroids: MokaCache<CellId, Coordinate>,
}

impl CachedResolver {
    /// Wrap `inner`, keeping at most `capacity` centroids.
    pub fn new(inner: Arc<dyn CellAddressResolver>, capacity: u64) -> Self {
        Self {
            inner,
            centroids: MokaCache::builder().max_capacity(capacity).build(),
        }
    }

    /// Number of cached centroids.
    pub fn cached_count(&self) -> u64 {
        self.centroids.entry_count()
    }

    /// Whether the centroid for `cell_id` is cached.
    pub fn is_cached(&self, cell_id: &CellId) -> bool {
        self.centroids.contains_key(cell_id)
    }
}

impl CellAddressResolver for CachedResolver {
    fn resolve_to_cell(&self, coordinate: Coordinate) -> BoxFuture<'_, Result<CellId, ResolutionError>> {
        self.inner.resolve_to_cell(coordinate)
    }

    fn resolve_to_coordinate<'a>(
        &'a self,
        cell_id: &'a CellId,
    ) -> BoxFuture<'a, Result<Coordinate, ResolutionError>> {
        Box::pin(async move {
            if let Some(center) = self.centroids.get(cell_id).await {
                trace!(%cell_id, "Centroid cache hit");
                return Ok(center);
            }
            let center = self.inner.resolve_to_coordinate(cell_id).await?;
            self.centroids.insert(cell_id.clone(), center).await;
            Ok(center)
        })
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
