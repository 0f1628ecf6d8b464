//! GeoJSON export of surface layers.

use serde_json::{json, Value};

use super::recording::SurfaceLayer;
use super::surface::LayerKey;
use crate::grid::CellBoundary;

/// Closed GeoJSON ring (`[lon, lat]` pairs, first vertex repeated).
fn ring(boundary: &CellBoundary) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = boundary
        .vertices()
        .iter()
        .map(|v| [v.longitude, v.latitude])
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

fn layer_kind(key: &LayerKey) -> (&'static str, String) {
    match key {
        LayerKey::Grid(cell) => ("grid", cell.to_string()),
        LayerKey::Highlight(id) => ("highlight", id.to_string()),
        LayerKey::Marker(kind) => ("marker", format!("{:?}", kind)),
    }
}

/// Build a GeoJSON `Feature` for one layer.
pub fn feature(key: &LayerKey, layer: &SurfaceLayer) -> Value {
    let (kind, id) = layer_kind(key);
    match layer {
        SurfaceLayer::Polygon { boundary, style } => json!({
            "type": "Feature",
            "id": id,
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring(boundary)],
            },
            "properties": {
                "layer": kind,
                "stroke": style.stroke,
                "stroke-width": style.weight,
                "fill": style.fill,
                "fill-opacity": style.fill_opacity,
            },
        }),
        SurfaceLayer::Marker { at, style } => json!({
            "type": "Feature",
            "id": id,
            "geometry": {
                "type": "Point",
                "coordinates": [at.longitude, at.latitude],
            },
            "properties": {
                "layer": kind,
                "marker-color": style.colour,
                "title": style.label,
            },
        }),
    }
}

/// Build a GeoJSON `FeatureCollection` from surface layers.
pub fn feature_collection(layers: &[(LayerKey, SurfaceLayer)]) -> Value {
    let features: Vec<Value> = layers.iter().map(|(k, l)| feature(k, l)).collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
