//! Cell address resolution.
//!
//! A [`CellAddressResolver`] maps a coordinate to the identifier of the cell
//! containing it, and an identifier back to the cell's centre.
//!
//! - [`LocalResolver`]: offline, derives synthetic three-word names from the
//!   local [`CellGrid`](crate::grid::CellGrid).
//! - [`What3WordsResolver`]: the what3words v3 API over an
//!   [`AsyncHttpClient`].
//! - [`CachedResolver`]: wraps either and memoizes centroid lookups.

mod cached;
mod http;
mod local;
mod types;
mod what3words;

pub use cached::{CachedResolver, DEFAULT_CACHE_CAPACITY};
pub use http::{AsyncHttpClient, HttpResponse, ReqwestClient, DEFAULT_TIMEOUT};
pub use local::LocalResolver;
pub use types::{BoxFuture, CellAddressResolver, CellId, ResolutionError};
pub use what3words::{What3WordsConfig, What3WordsResolver, WHAT3WORDS_BASE_URL};

#[cfg(test)]
pub use http::tests::MockHttpClient;
