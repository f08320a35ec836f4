//! Runtime configuration.
//!
//! [`ApiConfig`] is read from the environment by native hosts (the CLI);
//! browser hosts construct it from the page origin. [`EditorConfig`] carries
//! the editor's placement and render constants so hosts can override them.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{
    DEFAULT_LAYER_X, DEFAULT_LAYER_Y, DEFAULT_RENDER_SCALE, STANDARD_COLUMN_STEP, STANDARD_ROW_STEP,
    STANDARD_ROWS_PER_COLUMN,
};
use crate::transform::Point;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:4000";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Where the remote service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_API_BASE.to_owned(), timeout_secs: DEFAULT_API_TIMEOUT_SECS }
    }
}

impl ApiConfig {
    /// Read `PERMIT_API_BASE` and `PERMIT_API_TIMEOUT_SECS`.
    ///
    /// Unset or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| match std::env::var(name) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Same as [`ApiConfig::from_env`] with an injectable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PERMIT_API_BASE")
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned());
        let timeout_secs = match lookup("PERMIT_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid PERMIT_API_TIMEOUT_SECS; using default");
                DEFAULT_API_TIMEOUT_SECS
            }),
            None => DEFAULT_API_TIMEOUT_SECS,
        };
        Self { base_url, timeout_secs }
    }
}

/// Grid used when auto-provisioning standard text layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardGrid {
    pub origin: Point,
    pub row_step: f64,
    pub rows_per_column: usize,
    pub column_step: f64,
}

impl Default for StandardGrid {
    fn default() -> Self {
        Self {
            origin: Point::new(DEFAULT_LAYER_X, DEFAULT_LAYER_Y),
            row_step: STANDARD_ROW_STEP,
            rows_per_column: STANDARD_ROWS_PER_COLUMN,
            column_step: STANDARD_COLUMN_STEP,
        }
    }
}

impl StandardGrid {
    /// Position of the `n`th provisioned layer (0-based).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn slot(&self, n: usize) -> Point {
        let rows = self.rows_per_column.max(1);
        let column = (n / rows) as f64;
        let row = (n % rows) as f64;
        Point::new(self.origin.x + column * self.column_step, self.origin.y + row * self.row_step)
    }
}

/// Editor placement and rendering constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Scale the host rasterizes pages at.
    pub render_scale: f64,
    /// Where user-added layers appear.
    pub default_position: Point,
    pub grid: StandardGrid,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            default_position: Point::new(DEFAULT_LAYER_X, DEFAULT_LAYER_Y),
            grid: StandardGrid::default(),
        }
    }
}
