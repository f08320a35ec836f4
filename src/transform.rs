//! Coordinate conversion between raster space and document space.
//!
//! Raster space is the rendered page bitmap: origin top-left, multiplied by the
//! render scale. Document space is the page's native vector space: origin
//! bottom-left, unscaled. Everything in the layer store lives in raster space;
//! only [`crate::persist`] calls into this module to cross the boundary.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use serde::{Deserialize, Serialize};

/// A point in either raster or document space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Replace a non-finite value with `fallback`.
#[must_use]
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Geometry of the page currently rendered by the viewport.
///
/// `canvas_height` is in raster pixels; zero means "not known yet".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterFrame {
    pub scale: f64,
    pub canvas_height: f64,
}

impl Default for RasterFrame {
    fn default() -> Self {
        Self { scale: 1.0, canvas_height: 0.0 }
    }
}

impl RasterFrame {
    #[must_use]
    pub fn new(scale: f64, canvas_height: f64) -> Self {
        Self { scale, canvas_height }
    }

    /// Scale actually used for division. Zero and non-finite scales become 1.
    #[must_use]
    pub fn effective_scale(&self) -> f64 {
        let scale = finite_or(self.scale, 1.0);
        if scale.abs() < f64::EPSILON { 1.0 } else { scale }
    }

    /// Canvas height if known (finite and positive).
    #[must_use]
    pub fn known_height(&self) -> Option<f64> {
        let h = finite_or(self.canvas_height, 0.0);
        (h > 0.0).then_some(h)
    }

    /// Convert a raster point to document space.
    ///
    /// `x' = x / s`, `y' = (h - y) / s`. When the canvas height is unknown the
    /// vertical flip is skipped and `y' = y / s`.
    #[must_use]
    pub fn to_document(&self, raster: Point) -> Point {
        Point::new(self.x_to_document(raster.x), self.y_to_document(raster.y))
    }

    /// Inverse of [`RasterFrame::to_document`].
    #[must_use]
    pub fn to_raster(&self, document: Point) -> Point {
        Point::new(self.x_to_raster(document.x), self.y_to_raster(document.y))
    }

    #[must_use]
    pub fn x_to_document(&self, x: f64) -> f64 {
        finite_or(x, 0.0) / self.effective_scale()
    }

    #[must_use]
    pub fn y_to_document(&self, y: f64) -> f64 {
        let y = finite_or(y, 0.0);
        let scale = self.effective_scale();
        match self.known_height() {
            Some(h) => (h - y) / scale,
            None => y / scale,
        }
    }

    #[must_use]
    pub fn x_to_raster(&self, x: f64) -> f64 {
        finite_or(x, 0.0) * self.effective_scale()
    }

    #[must_use]
    pub fn y_to_raster(&self, y: f64) -> f64 {
        let y = finite_or(y, 0.0);
        let scale = self.effective_scale();
        match self.known_height() {
            Some(h) => h - y * scale,
            None => y * scale,
        }
    }

    /// Convert a raster distance (no flip) to document units.
    #[must_use]
    pub fn len_to_document(&self, len: f64) -> f64 {
        len / self.effective_scale()
    }

    /// Convert a document distance (no flip) to raster pixels.
    #[must_use]
    pub fn len_to_raster(&self, len: f64) -> f64 {
        len * self.effective_scale()
    }
}

/// Flat form of [`RasterFrame::to_document`] for callers holding loose numbers.
#[must_use]
pub fn to_document_space(x_raster: f64, y_raster: f64, scale: f64, canvas_height: f64) -> (f64, f64) {
    let p = RasterFrame::new(scale, canvas_height).to_document(Point::new(x_raster, y_raster));
    (p.x, p.y)
}
