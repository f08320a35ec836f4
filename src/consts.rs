//! Shared numeric constants for the overlay editor.

// ── Layer defaults ──────────────────────────────────────────────

/// Default text size for `text` layers, in raster pixels.
pub const DEFAULT_FONT_SIZE: f64 = 10.0;

/// Default box edge for `check` layers, in raster pixels.
pub const DEFAULT_CHECK_SIZE: f64 = 14.0;

/// Default horizontal extent for `line` layers, in raster pixels.
pub const DEFAULT_LINE_LENGTH: f64 = 160.0;

/// Default stroke for `line` layers, in raster pixels.
pub const DEFAULT_LINE_THICKNESS: f64 = 2.0;

/// Position given to a new or positionless layer.
pub const DEFAULT_LAYER_X: f64 = 120.0;
pub const DEFAULT_LAYER_Y: f64 = 120.0;

// ── Layer keys ──────────────────────────────────────────────────

/// Namespace for user-authored layers. Only these are captured by presets.
pub const CUSTOM_PREFIX: &str = "custom.";

pub const CUSTOM_TEXT_KEY: &str = "custom.text";
pub const CUSTOM_CHECK_KEY: &str = "custom.check";
pub const CUSTOM_LINE_KEY: &str = "custom.line";

// ── Standard-layer grid ─────────────────────────────────────────

/// Vertical distance between successive auto-provisioned layers.
pub const STANDARD_ROW_STEP: f64 = 18.0;

/// Rows per column before the grid wraps.
pub const STANDARD_ROWS_PER_COLUMN: usize = 3;

/// Horizontal distance between grid columns.
pub const STANDARD_COLUMN_STEP: f64 = 240.0;

// ── Wire fallbacks ──────────────────────────────────────────────

/// Stroke width written for a line whose thickness is unusable.
pub const WIRE_LINE_WIDTH_FALLBACK: f64 = 1.0;

// ── Rendering ───────────────────────────────────────────────────

/// Scale the rasterizer renders pages at unless configured otherwise.
pub const DEFAULT_RENDER_SCALE: f64 = 1.5;

/// Smallest glyph size drawn inside a check box.
pub const MIN_CHECK_GLYPH_PX: f64 = 10.0;

/// Approximate advance of one glyph as a fraction of the font size.
pub const GLYPH_ADVANCE_RATIO: f64 = 0.6;

/// Padding around text nodes (2px vertical, 4px horizontal on each side).
pub const TEXT_PAD_X_PX: f64 = 4.0;
pub const TEXT_PAD_Y_PX: f64 = 2.0;

/// Extra slop around thin lines so they can be grabbed.
pub const LINE_HIT_SLOP_PX: f64 = 4.0;
