//! Overlay rendering: projects current-page layers onto positioned nodes.
//!
//! Rendering is split in two. [`project`] is a pure function from store state
//! to a list of [`OverlayNode`]s; an [`OverlaySurface`] turns those nodes into
//! something visible (DOM elements in the browser, plain records headless).
//! A redraw always clears the surface and rebuilds it from scratch, so there
//! is never residue from a previous page.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::consts::MIN_CHECK_GLYPH_PX;
use crate::error::EditorError;
use crate::layer::{Layer, LayerId, LayerKind};
use crate::store::LayerStore;
use crate::transform::Point;

/// How a node looks, per layer type.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeVisual {
    /// The layer value, or its key while the value is blank.
    Text { label: String, font_px: f64 },
    /// Square box with a check glyph when on.
    Check { size_px: f64, glyph_px: f64, checked: bool },
    /// Horizontal rule.
    Line { length_px: f64, thickness_px: f64 },
}

/// One positioned visual node in raster space.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayNode {
    pub id: LayerId,
    pub x: f64,
    pub y: f64,
    pub visual: NodeVisual,
    pub selected: bool,
}

impl OverlayNode {
    #[must_use]
    pub fn from_layer(layer: &Layer, selected: bool) -> Self {
        let visual = match &layer.kind {
            LayerKind::Text { value, font_size } => NodeVisual::Text {
                label: if value.trim().is_empty() { layer.key.clone() } else { value.clone() },
                font_px: *font_size,
            },
            LayerKind::Check { checked, size } => NodeVisual::Check {
                size_px: *size,
                glyph_px: (size - 2.0).max(MIN_CHECK_GLYPH_PX),
                checked: checked.unwrap_or(false),
            },
            LayerKind::Line { length, thickness, .. } => {
                NodeVisual::Line { length_px: *length, thickness_px: *thickness }
            }
        };
        Self { id: layer.id.clone(), x: layer.x, y: layer.y, visual, selected }
    }

    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Project every layer anchored to `page` into overlay nodes, in store order.
#[must_use]
pub fn project(store: &LayerStore, page: u32) -> Vec<OverlayNode> {
    let selected = store.selected_id();
    store
        .on_page(page)
        .map(|layer| OverlayNode::from_layer(layer, selected == Some(&layer.id)))
        .collect()
}

/// Something overlay nodes can be drawn onto.
pub trait OverlaySurface {
    /// Remove every node.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::RenderTargetMissing`] if the mount point is gone.
    fn clear(&mut self) -> Result<(), EditorError>;

    /// Add one node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be created.
    fn mount(&mut self, node: &OverlayNode) -> Result<(), EditorError>;

    /// Move an already mounted node without a full redraw. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount point is gone.
    fn reposition(&mut self, id: &LayerId, at: Point) -> Result<(), EditorError>;
}

/// Full-redraw overlay renderer.
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    drawn: Option<DrawnState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DrawnState {
    revision: u64,
    page: u32,
}

impl OverlayRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear `surface` and rebuild it from the layers on `page`. Returns the
    /// number of nodes mounted.
    ///
    /// # Errors
    ///
    /// Propagates surface failures; the renderer then counts as stale.
    pub fn redraw<S: OverlaySurface + ?Sized>(
        &mut self,
        store: &LayerStore,
        page: u32,
        surface: &mut S,
    ) -> Result<usize, EditorError> {
        self.drawn = None;
        surface.clear()?;
        let nodes = project(store, page);
        for node in &nodes {
            surface.mount(node)?;
        }
        self.drawn = Some(DrawnState { revision: store.revision(), page });
        Ok(nodes.len())
    }

    /// Redraw only when the store or page changed since the last redraw.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn redraw_if_stale<S: OverlaySurface + ?Sized>(
        &mut self,
        store: &LayerStore,
        page: u32,
        surface: &mut S,
    ) -> Result<bool, EditorError> {
        if self.drawn == Some(DrawnState { revision: store.revision(), page }) {
            return Ok(false);
        }
        self.redraw(store, page, surface)?;
        Ok(true)
    }

    /// Forget what was drawn so the next [`OverlayRenderer::redraw_if_stale`] redraws.
    pub fn invalidate(&mut self) {
        self.drawn = None;
    }
}

/// Headless surface that keeps mounted nodes in memory.
#[derive(Debug, Default)]
pub struct MemorySurface {
    nodes: Vec<OverlayNode>,
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes currently mounted, in mount order.
    #[must_use]
    pub fn nodes(&self) -> &[OverlayNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &LayerId) -> Option<&OverlayNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

impl OverlaySurface for MemorySurface {
    fn clear(&mut self) -> Result<(), EditorError> {
        self.nodes.clear();
        Ok(())
    }

    fn mount(&mut self, node: &OverlayNode) -> Result<(), EditorError> {
        self.nodes.push(node.clone());
        Ok(())
    }

    fn reposition(&mut self, id: &LayerId, at: Point) -> Result<(), EditorError> {
        if let Some(node) = self.nodes.iter_mut().find(|n| &n.id == id) {
            node.x = at.x;
            node.y = at.y;
        }
        Ok(())
    }
}

// =============================================================
// Layer list
// =============================================================

/// One card in the side list. The list shows layers from every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub id: LayerId,
    /// `"{type} • {key}"`.
    pub title: String,
    /// `"x:{x} y:{y} p:{page}"` with rounded coordinates.
    pub detail: String,
    pub active: bool,
}

/// Build the side-list cards for every layer in the store.
#[must_use]
pub fn list_entries(store: &LayerStore) -> Vec<ListEntry> {
    let selected = store.selected_id();
    store
        .layers()
        .iter()
        .map(|l| ListEntry {
            id: l.id.clone(),
            title: format!("{} • {}", l.layer_type().as_str(), l.key),
            detail: format!("x:{} y:{} p:{}", l.x.round(), l.y.round(), l.page),
            active: selected == Some(&l.id),
        })
        .collect()
}
