//! Map surface abstraction.
//!
//! The map widget and its tile source are external collaborators. This
//! module defines the drawing capability the engine consumes
//! ([`MapSurface`]), an in-memory implementation ([`RecordingSurface`]) and a
//! GeoJSON export of whatever is drawn.

mod geojson;
mod recording;
mod surface;

pub use geojson::{feature, feature_collection};
pub use recording::{RecordingSurface, SurfaceLayer, SurfaceStats};
pub use surface::{HighlightRole, LayerKey, MapSurface, MarkerKind, MarkerStyle, PolygonStyle};
