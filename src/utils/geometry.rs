// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Geometry utilities for STAC items

use serde_json::Value;

/// Calculate the bounding box of a GeoJSON geometry.
///
/// Folds over every position in `coordinates` (any nesting depth) and over
/// the members of a GeometryCollection. Returns `[minx, miny, maxx, maxy]`,
/// or `None` when the geometry carries no positions.
pub fn ensure_bbox(geometry: &Value) -> Option<[f64; 4]> {
    let mut bounds: Option<[f64; 4]> = None;

    if geometry.get("type").and_then(Value::as_str) == Some("GeometryCollection") {
        if let Some(members) = geometry.get("geometries").and_then(Value::as_array) {
            for member in members {
                if let Some(b) = ensure_bbox(member) {
                    extend(&mut bounds, b[0], b[1]);
                    extend(&mut bounds, b[2], b[3]);
                }
            }
        }
        return bounds;
    }

    let coordinates = geometry.get("coordinates")?;
    fold_positions(coordinates, &mut bounds);
    bounds
}

fn fold_positions(value: &Value, bounds: &mut Option<[f64; 4]>) {
    let Some(array) = value.as_array() else {
        return;
    };

    // A position is an array starting with a number: [x, y] or [x, y, z]
    if let (Some(x), Some(y)) = (
        array.first().and_then(Value::as_f64),
        array.get(1).and_then(Value::as_f64),
    ) {
        extend(bounds, x, y);
        return;
    }

    for nested in array {
        fold_positions(nested, bounds);
    }
}

fn extend(bounds: &mut Option<[f64; 4]>, x: f64, y: f64) {
    match bounds {
        Some(b) => {
            b[0] = b[0].min(x);
            b[1] = b[1].min(y);
            b[2] = b[2].max(x);
            b[3] = b[3].max(y);
        }
        None => *bounds = Some([x, y, x, y]),
    }
}
