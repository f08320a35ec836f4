//! Hit-testing overlay nodes by raster position.
//!
//! Browser hosts know which node a pointer went down on from the event
//! target. Hosts that only deliver coordinates resolve the node here, using
//! approximate bounds for each visual.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::{GLYPH_ADVANCE_RATIO, LINE_HIT_SLOP_PX, TEXT_PAD_X_PX, TEXT_PAD_Y_PX};
use crate::layer::LayerId;
use crate::render::{NodeVisual, OverlayNode};
use crate::transform::Point;

/// Axis-aligned box in raster space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Approximate on-screen box of a node.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn node_bounds(node: &OverlayNode) -> Bounds {
    match &node.visual {
        NodeVisual::Text { label, font_px } => Bounds {
            x: node.x,
            y: node.y,
            width: label.chars().count() as f64 * font_px * GLYPH_ADVANCE_RATIO + 2.0 * TEXT_PAD_X_PX,
            height: font_px + 2.0 * TEXT_PAD_Y_PX,
        },
        NodeVisual::Check { size_px, .. } => Bounds { x: node.x, y: node.y, width: *size_px, height: *size_px },
        NodeVisual::Line { length_px, thickness_px } => Bounds {
            x: node.x,
            y: node.y - LINE_HIT_SLOP_PX,
            width: *length_px,
            height: thickness_px + 2.0 * LINE_HIT_SLOP_PX,
        },
    }
}

/// Topmost node under `point`. Later nodes are drawn above earlier ones.
#[must_use]
pub fn hit_test(nodes: &[OverlayNode], point: Point) -> Option<&LayerId> {
    nodes
        .iter()
        .rev()
        .find(|n| node_bounds(n).contains(point))
        .map(|n| &n.id)
}
