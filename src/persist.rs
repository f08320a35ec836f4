//! Persistence adapter between the raster-space store and the document-space
//! wire format.
//!
//! [`serialize`] is the only way layers leave the editor and
//! [`deserialize`] the only way template layers enter it, so the store never
//! holds document-space coordinates. Lines always leave with explicit
//! `x1,y1,x2,y2` endpoints; a line without them is written as a horizontal
//! segment of its length starting at its anchor.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{DEFAULT_CHECK_SIZE, DEFAULT_FONT_SIZE, DEFAULT_LINE_LENGTH, WIRE_LINE_WIDTH_FALLBACK};
use crate::layer::{Layer, LayerId, LayerKind, Segment};
use crate::transform::{Point, RasterFrame, finite_or};

/// One layer as the remote service stores it (document space).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireLayer {
    pub id: LayerId,
    pub key: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub shape: WireShape,
}

/// Type-specific part of a [`WireLayer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireShape {
    Text {
        value: String,
        font_size: f64,
    },
    Check {
        checked: bool,
        size: f64,
    },
    Line {
        width: f64,
        length: f64,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
}

/// Body of `POST /api/override`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverridePayload {
    pub company_key: String,
    pub city: String,
    pub form_key: String,
    pub fields: BTreeMap<String, String>,
    pub layers: Vec<WireLayer>,
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

/// Convert one raster-space layer to its document-space wire form.
#[must_use]
pub fn serialize_layer(layer: &Layer, frame: &RasterFrame) -> WireLayer {
    let anchor = Point::new(finite_or(layer.x, 0.0), finite_or(layer.y, 0.0));
    let doc = frame.to_document(anchor);

    let shape = match &layer.kind {
        LayerKind::Text { value, font_size } => WireShape::Text {
            value: value.clone(),
            font_size: positive_or(*font_size, DEFAULT_FONT_SIZE),
        },
        LayerKind::Check { checked, size } => WireShape::Check {
            checked: *checked != Some(false),
            size: positive_or(*size, DEFAULT_CHECK_SIZE),
        },
        LayerKind::Line { length, thickness, endpoints } => {
            let length = finite_or(*length, DEFAULT_LINE_LENGTH);
            let seg = endpoints.unwrap_or(Segment {
                x1: anchor.x,
                y1: anchor.y,
                x2: anchor.x + length,
                y2: anchor.y,
            });
            WireShape::Line {
                width: positive_or(*thickness, WIRE_LINE_WIDTH_FALLBACK),
                length: frame.len_to_document(length),
                x1: frame.x_to_document(seg.x1),
                y1: frame.y_to_document(seg.y1),
                x2: frame.x_to_document(seg.x2),
                y2: frame.y_to_document(seg.y2),
            }
        }
    };

    WireLayer { id: layer.id.clone(), key: layer.key.clone(), page: layer.page.max(1), x: doc.x, y: doc.y, shape }
}

/// Convert the whole layer set for submission.
#[must_use]
pub fn serialize(layers: &[Layer], frame: &RasterFrame) -> Vec<WireLayer> {
    layers.iter().map(|l| serialize_layer(l, frame)).collect()
}

/// Normalize document-space records and bring them into raster space.
///
/// A line that only carries endpoints is anchored at `(x1, y1)` and, when
/// no length is given, takes the endpoint distance as its length.
#[must_use]
pub fn deserialize(records: &[Value], frame: &RasterFrame) -> Vec<Layer> {
    records.iter().map(|raw| deserialize_layer(raw, frame)).collect()
}

fn deserialize_layer(raw: &Value, frame: &RasterFrame) -> Layer {
    let mut layer = Layer::normalize(raw);
    let has = |name: &str| raw.get(name).and_then(Value::as_f64).is_some_and(f64::is_finite);

    if let LayerKind::Line { length, endpoints: Some(seg), .. } = &mut layer.kind {
        if !has("length") {
            *length = (seg.x2 - seg.x1).hypot(seg.y2 - seg.y1);
            if *length <= 0.0 {
                *length = DEFAULT_LINE_LENGTH;
            }
        }
        if !has("x") || !has("y") {
            layer.x = seg.x1;
            layer.y = seg.y1;
        }
    }

    let at = frame.to_raster(layer.position());
    layer.x = at.x;
    layer.y = at.y;
    if let LayerKind::Line { length, endpoints, .. } = &mut layer.kind {
        *length = frame.len_to_raster(*length);
        if let Some(seg) = endpoints {
            *seg = Segment {
                x1: frame.x_to_raster(seg.x1),
                y1: frame.y_to_raster(seg.y1),
                x2: frame.x_to_raster(seg.x2),
                y2: frame.y_to_raster(seg.y2),
            };
        }
    }
    layer
}
