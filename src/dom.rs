//! Browser bindings for the overlay surface, local storage and page rasterization.
//!
//! Only compiled with the `browser` feature. Everything here adapts a web-sys
//! handle to one of the core traits; no editor logic lives in this module.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Event, HtmlElement, Node, Storage};

use crate::consts::{TEXT_PAD_X_PX, TEXT_PAD_Y_PX};
use crate::error::EditorError;
use crate::layer::LayerId;
use crate::render::{NodeVisual, OverlayNode, OverlaySurface};
use crate::storage::ScopedStore;
use crate::transform::Point;
use crate::viewport::{RasterPage, Rasterizer};

fn js_error(context: &str, err: &JsValue) -> EditorError {
    EditorError::RenderTargetMissing(format!("{context}: {err:?}"))
}

fn document() -> Result<Document, EditorError> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| EditorError::RenderTargetMissing("document".into()))
}

fn set_style(el: &HtmlElement, name: &str, value: &str) -> Result<(), EditorError> {
    el.style().set_property(name, value).map_err(|e| js_error(name, &e))
}

fn px(v: f64) -> String {
    format!("{v}px")
}

// =============================================================
// Overlay surface
// =============================================================

/// Absolutely positioned `div`s inside the overlay element.
pub struct DomSurface {
    document: Document,
    overlay: HtmlElement,
}

impl DomSurface {
    /// Bind to the element with id `overlay_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::RenderTargetMissing`] when the element is absent.
    pub fn from_id(overlay_id: &str) -> Result<Self, EditorError> {
        let document = document()?;
        let Some(element) = document.get_element_by_id(overlay_id) else {
            return Err(EditorError::RenderTargetMissing(overlay_id.to_owned()));
        };
        let overlay = element
            .dyn_into::<HtmlElement>()
            .map_err(|_| EditorError::RenderTargetMissing(format!("{overlay_id} is not an HTML element")))?;
        Ok(Self { document, overlay })
    }

    #[must_use]
    pub fn overlay(&self) -> &HtmlElement {
        &self.overlay
    }

    /// Size the overlay to cover the rasterized page exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the style cannot be written.
    pub fn align_to(&self, width: f64, height: f64) -> Result<(), EditorError> {
        set_style(&self.overlay, "width", &px(width))?;
        set_style(&self.overlay, "height", &px(height))
    }

    /// Layer of the node `event` landed on, if it landed on one.
    #[must_use]
    pub fn event_layer(&self, event: &Event) -> Option<LayerId> {
        let target = event.target()?;
        let element = target.dyn_ref::<Element>()?;
        let node = match element.closest("[data-id]") {
            Ok(node) => node?,
            Err(e) => {
                tracing::warn!(error = ?e, "layer node lookup failed");
                return None;
            }
        };
        let inside: &Node = &node;
        if !self.overlay.contains(Some(inside)) {
            return None;
        }
        node.get_attribute("data-id").map(|id| LayerId::from(id.as_str()))
    }

    /// Convert a viewport pointer position to overlay-local raster pixels.
    #[must_use]
    pub fn local_point(&self, client_x: f64, client_y: f64) -> Point {
        let rect = self.overlay.get_bounding_client_rect();
        Point::new(client_x - rect.left(), client_y - rect.top())
    }

    fn create_div(&self) -> Result<HtmlElement, EditorError> {
        self.document
            .create_element("div")
            .map_err(|e| js_error("create_element", &e))?
            .dyn_into::<HtmlElement>()
            .map_err(|e| js_error("dyn_into", &e))
    }

    fn node_element(&self, id: &LayerId) -> Result<Option<Element>, EditorError> {
        self.overlay
            .query_selector(&format!("[data-id=\"{id}\"]"))
            .map_err(|e| js_error("query_selector", &e))
    }
}

impl OverlaySurface for DomSurface {
    fn clear(&mut self) -> Result<(), EditorError> {
        self.overlay.set_inner_html("");
        Ok(())
    }

    fn mount(&mut self, node: &OverlayNode) -> Result<(), EditorError> {
        let el = self.create_div()?;
        let class = if node.selected { "pf-layer selected" } else { "pf-layer" };
        el.set_class_name(class);
        el.set_attribute("data-id", node.id.as_str()).map_err(|e| js_error("data-id", &e))?;
        set_style(&el, "position", "absolute")?;
        set_style(&el, "left", &px(node.x))?;
        set_style(&el, "top", &px(node.y))?;

        match &node.visual {
            NodeVisual::Text { label, font_px } => {
                el.set_text_content(Some(label.as_str()));
                set_style(&el, "font-size", &px(*font_px))?;
                set_style(&el, "white-space", "nowrap")?;
                set_style(&el, "padding", &format!("{TEXT_PAD_Y_PX}px {TEXT_PAD_X_PX}px"))?;
            }
            NodeVisual::Check { size_px, glyph_px, checked } => {
                set_style(&el, "width", &px(*size_px))?;
                set_style(&el, "height", &px(*size_px))?;
                set_style(&el, "font-size", &px(*glyph_px))?;
                set_style(&el, "line-height", &px(*size_px))?;
                set_style(&el, "text-align", "center")?;
                set_style(&el, "border", "1px solid currentColor")?;
                el.set_text_content(checked.then_some("✓"));
            }
            NodeVisual::Line { length_px, thickness_px } => {
                set_style(&el, "width", &px(*length_px))?;
                set_style(&el, "height", &px(*thickness_px))?;
                set_style(&el, "background", "currentColor")?;
            }
        }

        self.overlay.append_child(&el).map_err(|e| js_error("append_child", &e))?;
        Ok(())
    }

    fn reposition(&mut self, id: &LayerId, at: Point) -> Result<(), EditorError> {
        let Some(el) = self.node_element(id)? else {
            return Err(EditorError::RenderTargetMissing(format!("layer node {id}")));
        };
        let el = el.dyn_into::<HtmlElement>().map_err(|e| js_error("dyn_into", &e))?;
        set_style(&el, "left", &px(at.x))?;
        set_style(&el, "top", &px(at.y))
    }
}

// =============================================================
// localStorage
// =============================================================

/// [`ScopedStore`] over `window.localStorage`.
pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    /// # Errors
    ///
    /// Fails when local storage is unavailable (e.g. disabled by the browser).
    pub fn open() -> Result<Self, EditorError> {
        let window = web_sys::window().ok_or_else(|| EditorError::RenderTargetMissing("window".into()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(Self { storage }),
            Ok(None) => Err(EditorError::RenderTargetMissing("localStorage".into())),
            Err(e) => Err(js_error("localStorage", &e)),
        }
    }
}

impl ScopedStore for LocalStorage {
    fn get(&self, scope: &str) -> Option<String> {
        match self.storage.get_item(scope) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(scope, error = ?e, "localStorage read failed");
                None
            }
        }
    }

    fn put(&mut self, scope: &str, value: &str) -> Result<(), EditorError> {
        self.storage.set_item(scope, value).map_err(|e| EditorError::MalformedLocalState {
            scope: scope.to_owned(),
            reason: format!("{e:?}"),
        })
    }
}

// =============================================================
// Rasterization
// =============================================================

/// A page the host has already drawn onto its canvas.
///
/// Page rendering in the browser is asynchronous, so the host renders first
/// and then hands the result to the core through this adapter.
#[derive(Debug, Clone, Copy)]
pub struct RenderedPage {
    pub page: u32,
    pub page_count: u32,
    pub raster: RasterPage,
}

impl Rasterizer for RenderedPage {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn rasterize(&mut self, page: u32) -> Result<RasterPage, EditorError> {
        if page == self.page {
            Ok(self.raster)
        } else {
            Err(EditorError::RenderTargetMissing(format!("page {page} was not rendered")))
        }
    }
}

/// Read `{width, height, scale, pageCount}` returned by the host's renderer.
///
/// # Errors
///
/// Returns an error when a field is missing or not a number.
pub fn rendered_page_from_js(page: u32, value: &JsValue) -> Result<RenderedPage, EditorError> {
    let number = |name: &str| -> Result<f64, EditorError> {
        js_sys::Reflect::get(value, &JsValue::from_str(name))
            .map_err(|e| js_error(name, &e))?
            .as_f64()
            .ok_or_else(|| EditorError::RenderTargetMissing(format!("rendered page has no numeric `{name}`")))
    };
    let page_count = number("pageCount")?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let page_count = page_count.max(1.0).min(f64::from(u32::MAX)) as u32;
    Ok(RenderedPage {
        page,
        page_count,
        raster: RasterPage { width: number("width")?, height: number("height")?, scale: number("scale")? },
    })
}
