//! `OverlayEditor`: the JavaScript-facing wrapper around [`EditorCore`].
//!
//! The host page owns the PDF canvas and renders pages itself through the
//! `render_page(url, page, scale)` callback, which resolves to
//! `{width, height, scale, pageCount}`. Everything else (overlay nodes,
//! pointer dragging, presets, field resolution, saving) runs here.
//!
//! Async exports return a `Promise`. No `RefCell` borrow is held across an
//! `await`; each step borrows, acts, and releases.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, closure::Closure};
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::PointerEvent;

use crate::api::ApiClient;
use crate::config::{ApiConfig, EditorConfig};
use crate::context::{DocumentContext, SessionContext};
use crate::dom::{DomSurface, LocalStorage, RenderedPage, rendered_page_from_js};
use crate::drag::DragEnd;
use crate::error::EditorError;
use crate::layer::{Layer, LayerId};
use crate::loader::fetch_document;
use crate::panel::PanelField;
use crate::preset::PresetManager;
use crate::render::OverlaySurface;
use crate::session::{Action, EditorCore, LoadOutcome};
use crate::transform::Point;
use crate::viewport::PageNav;

type PointerClosure = Closure<dyn FnMut(PointerEvent)>;
type PointerHandler = fn(&mut BrowserEditor, &PointerEvent, Point) -> Vec<Action>;

fn to_js(err: &EditorError) -> JsValue {
    JsValue::from_str(&err.status_text())
}

struct BrowserEditor {
    core: EditorCore,
    surface: DomSurface,
    presets: PresetManager<LocalStorage>,
    on_status: js_sys::Function,
    on_change: js_sys::Function,
}

impl BrowserEditor {
    fn session() -> Result<SessionContext, EditorError> {
        Ok(SessionContext::load(&LocalStorage::open()?))
    }

    /// Carry out the actions an editor operation returned.
    fn dispatch(&mut self, actions: Vec<Action>) {
        let mut changed = false;
        for action in actions {
            let result = match action {
                Action::RenderNeeded => {
                    changed = true;
                    self.core.render(&mut self.surface).map(|_| ())
                }
                Action::NodeMoved { id, at } => self.surface.reposition(&id, at),
                Action::SelectionChanged(_) => {
                    changed = true;
                    Ok(())
                }
                Action::Status(text) => {
                    self.status(&text);
                    Ok(())
                }
            };
            if let Err(err) = result {
                self.report(&err);
            }
        }
        if changed {
            if let Err(e) = self.on_change.call0(&JsValue::NULL) {
                tracing::warn!(error = ?e, "change callback threw");
            }
        }
    }

    /// Size the overlay to the page the viewport shows.
    fn align_overlay(&self) -> Result<(), EditorError> {
        let viewport = &self.core.viewport;
        self.surface.align_to(viewport.width(), viewport.frame().canvas_height)
    }

    fn status(&self, text: &str) {
        if let Err(e) = self.on_status.call1(&JsValue::NULL, &JsValue::from_str(text)) {
            tracing::warn!(error = ?e, "status callback threw");
        }
    }

    fn report(&self, err: &EditorError) {
        tracing::warn!(error = %err, "editor operation failed");
        self.status(&err.status_text());
    }

    fn run(&mut self, op: impl FnOnce(&mut Self) -> Result<Vec<Action>, EditorError>) -> Result<(), JsValue> {
        match op(self) {
            Ok(actions) => {
                self.dispatch(actions);
                Ok(())
            }
            Err(err) => {
                self.report(&err);
                Err(to_js(&err))
            }
        }
    }
}

/// Browser handle for one overlay editor instance.
#[wasm_bindgen]
pub struct OverlayEditor {
    inner: Rc<RefCell<BrowserEditor>>,
    api: ApiClient,
    render_page: js_sys::Function,
    listeners: Vec<(&'static str, PointerClosure)>,
}

#[wasm_bindgen]
impl OverlayEditor {
    /// Bind to the overlay element `overlay_id` and install pointer listeners.
    ///
    /// # Errors
    ///
    /// Fails when the overlay element or local storage is missing, or the
    /// API base URL is not http(s).
    #[wasm_bindgen(constructor)]
    pub fn new(
        overlay_id: &str,
        api_base: &str,
        render_page: js_sys::Function,
        on_status: js_sys::Function,
        on_change: js_sys::Function,
    ) -> Result<OverlayEditor, JsValue> {
        console_error_panic_hook::set_once();
        let base = if api_base.trim().is_empty() { page_origin() } else { Some(api_base.to_owned()) };
        let config = ApiConfig::from_lookup(|name| if name == "PERMIT_API_BASE" { base.clone() } else { None });
        let api = ApiClient::new(&config).map_err(|e| to_js(&e.into()))?;
        let surface = DomSurface::from_id(overlay_id).map_err(|e| to_js(&e))?;
        let presets = PresetManager::new(LocalStorage::open().map_err(|e| to_js(&e))?);

        let inner = Rc::new(RefCell::new(BrowserEditor {
            core: EditorCore::new(EditorConfig::default()),
            surface,
            presets,
            on_status,
            on_change,
        }));
        let mut editor = OverlayEditor { inner, api, render_page, listeners: Vec::new() };
        editor.install_pointer_listeners()?;
        Ok(editor)
    }

    // =========================================================
    // Loading and navigation
    // =========================================================

    /// Load the document named by the stored session. Resolves to
    /// `"rebuilt"`, `"merged"` or `"stale"`.
    pub fn load(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        let api = self.api.clone();
        let render_page = self.render_page.clone();
        future_to_promise(async move {
            let result = load_current(&inner, &api, &render_page).await;
            finish(&inner, result.map(|outcome| {
                JsValue::from_str(match outcome {
                    LoadOutcome::Rebuilt { .. } => "rebuilt",
                    LoadOutcome::Merged { .. } => "merged",
                    LoadOutcome::Stale => "stale",
                })
            }))
        })
    }

    /// Go to page `page` (clamped). Resolves to the page now shown.
    pub fn go_to(&self, page: u32) -> js_sys::Promise {
        self.navigate(PageNav::GoTo(page))
    }

    pub fn next_page(&self) -> js_sys::Promise {
        self.navigate(PageNav::Next)
    }

    pub fn prev_page(&self) -> js_sys::Promise {
        self.navigate(PageNav::Prev)
    }

    /// Arrow-key navigation while the editor view is active.
    pub fn key_down(&self, key: &str) -> js_sys::Promise {
        let nav = self.inner.borrow().core.viewport.key_nav(key);
        match nav {
            Some(nav) => self.navigate(nav),
            None => js_sys::Promise::resolve(&JsValue::FALSE),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.inner.borrow_mut().core.set_active(active);
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.inner.borrow().core.viewport.page()
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.inner.borrow().core.viewport.page_count()
    }

    // =========================================================
    // Editing
    // =========================================================

    pub fn add_text(&self) {
        let mut ed = self.inner.borrow_mut();
        let actions = ed.core.add_text();
        ed.dispatch(actions);
    }

    pub fn add_check(&self) {
        let mut ed = self.inner.borrow_mut();
        let actions = ed.core.add_check();
        ed.dispatch(actions);
    }

    pub fn add_line(&self) {
        let mut ed = self.inner.borrow_mut();
        let actions = ed.core.add_line();
        ed.dispatch(actions);
    }

    /// # Errors
    ///
    /// Fails when nothing is selected.
    pub fn delete_selected(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().run(|ed| ed.core.delete_selected())
    }

    /// Select layer `id`, or clear the selection with `undefined`.
    pub fn select(&self, id: Option<String>) {
        let mut ed = self.inner.borrow_mut();
        let id = id.map(|s| LayerId::from(s.as_str()));
        let actions = ed.core.select(id.as_ref());
        ed.dispatch(actions);
    }

    /// Apply an edit from the panel input with DOM id `input_id`.
    pub fn edit_field(&self, input_id: &str, value: &str) {
        let Some(field) = PanelField::ALL.into_iter().find(|f| f.input_id() == input_id) else {
            tracing::warn!(input_id, "unknown panel input");
            return;
        };
        let mut ed = self.inner.borrow_mut();
        let actions = ed.core.edit_field(field, value);
        ed.dispatch(actions);
    }

    /// Re-resolve field values against the stored session.
    ///
    /// # Errors
    ///
    /// Fails without a loaded document.
    pub fn reapply_fields_now(&self) -> Result<(), JsValue> {
        self.inner.borrow_mut().run(|ed| {
            let session = BrowserEditor::session()?;
            ed.core.reapply_fields_now(&session)
        })
    }

    // =========================================================
    // Views for the host UI
    // =========================================================

    /// All layers (raster space) as a JSON array string.
    #[must_use]
    pub fn layers_json(&self) -> String {
        let ed = self.inner.borrow();
        Value::Array(ed.core.layers().iter().map(Layer::to_value).collect()).to_string()
    }

    /// Replace every layer from a JSON array string (raster space).
    ///
    /// # Errors
    ///
    /// Fails when `json` is not an array.
    pub fn set_layers_json(&self, json: &str) -> Result<(), JsValue> {
        self.inner.borrow_mut().run(|ed| {
            let records: Vec<Value> = serde_json::from_str(json)?;
            Ok(ed.core.set_layers(&records))
        })
    }

    /// Layer list cards as JSON.
    #[must_use]
    pub fn list_json(&self) -> String {
        let ed = self.inner.borrow();
        let cards: Vec<Value> = ed
            .core
            .list()
            .into_iter()
            .map(|e| json!({ "id": e.id.as_str(), "title": e.title, "detail": e.detail, "active": e.active }))
            .collect();
        Value::Array(cards).to_string()
    }

    /// Panel inputs for the selected layer as JSON, or `null`.
    #[must_use]
    pub fn panel_json(&self) -> String {
        let ed = self.inner.borrow();
        match ed.core.panel() {
            Some(view) => {
                let mut inputs = serde_json::Map::new();
                for field in PanelField::ALL {
                    inputs.insert(field.input_id().to_owned(), Value::String(view.text(field)));
                }
                json!({ "id": view.id.as_str(), "sizeLabel": view.size_label(), "inputs": inputs }).to_string()
            }
            None => Value::Null.to_string(),
        }
    }

    // =========================================================
    // Presets
    // =========================================================

    /// Preset names for the loaded document as a JSON array string.
    #[must_use]
    pub fn preset_names_json(&self) -> String {
        let ed = self.inner.borrow();
        let names = match ed.core.document() {
            Some(doc) => ed.presets.names(doc),
            None => Vec::new(),
        };
        json!(names).to_string()
    }

    /// # Errors
    ///
    /// Fails for a blank name, no custom layers, or no loaded document.
    pub fn save_preset(&self, name: &str) -> Result<(), JsValue> {
        self.inner.borrow_mut().run(|ed| ed.core.save_preset(&mut ed.presets, name))
    }

    /// # Errors
    ///
    /// Fails when the preset does not exist or no document is loaded.
    pub fn apply_preset(&self, name: &str) -> Result<(), JsValue> {
        self.inner.borrow_mut().run(|ed| ed.core.apply_preset(&ed.presets, name))
    }

    /// # Errors
    ///
    /// Fails when no document is loaded or storage rejects the write.
    pub fn remove_preset(&self, name: &str) -> Result<bool, JsValue> {
        let mut ed = self.inner.borrow_mut();
        let doc = match ed.core.document().cloned() {
            Some(doc) => doc,
            None => return Err(to_js(&EditorError::ContextIncomplete("document"))),
        };
        match ed.presets.remove(&doc, name) {
            Ok(removed) => Ok(removed),
            Err(err) => {
                ed.report(&err);
                Err(to_js(&err))
            }
        }
    }

    // =========================================================
    // Saving
    // =========================================================

    /// The override body as a JSON string, without sending it.
    ///
    /// # Errors
    ///
    /// Fails without a company in the session or a loaded document.
    pub fn override_payload_json(&self) -> Result<String, JsValue> {
        let ed = self.inner.borrow();
        let session = BrowserEditor::session().map_err(|e| to_js(&e))?;
        let payload = ed.core.override_payload(&session).map_err(|e| to_js(&e))?;
        serde_json::to_string(&payload).map_err(|e| to_js(&e.into()))
    }

    /// Send the overlay to the server as a company override.
    pub fn save_override(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        let api = self.api.clone();
        future_to_promise(async move {
            let payload = {
                let ed = inner.borrow();
                BrowserEditor::session().and_then(|session| ed.core.override_payload(&session))
            };
            let result = match payload {
                Ok(payload) => api.save_override(&payload).await.map_err(EditorError::from).map(|_| {
                    inner.borrow().status(&format!("✅ Overlay saved for {}", payload.company_key));
                    JsValue::TRUE
                }),
                Err(err) => Err(err),
            };
            finish(&inner, result)
        })
    }
}

impl OverlayEditor {
    fn install_pointer_listeners(&mut self) -> Result<(), JsValue> {
        let overlay = self.inner.borrow().surface.overlay().clone();
        let handlers: [(&'static str, PointerHandler); 5] = [
            ("pointerdown", |ed, ev, p| match ed.surface.event_layer(ev) {
                Some(id) => ed.core.pointer_down(&id, p),
                None => Vec::new(),
            }),
            ("pointermove", |ed, _, p| ed.core.pointer_move(p)),
            ("pointerup", |ed, _, _| ed.core.pointer_end(DragEnd::PointerUp)),
            ("pointercancel", |ed, _, _| ed.core.pointer_end(DragEnd::PointerCancel)),
            ("pointerleave", |ed, _, _| ed.core.pointer_end(DragEnd::PointerLeave)),
        ];

        for (event, handler) in handlers {
            let inner = Rc::clone(&self.inner);
            let cb: PointerClosure = Closure::wrap(Box::new(move |ev: PointerEvent| {
                let Ok(mut ed) = inner.try_borrow_mut() else {
                    return;
                };
                let at = ed.surface.local_point(f64::from(ev.client_x()), f64::from(ev.client_y()));
                let actions = handler(&mut *ed, &ev, at);
                if !actions.is_empty() {
                    ev.prevent_default();
                }
                ed.dispatch(actions);
            }) as Box<dyn FnMut(PointerEvent)>);
            overlay.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref())?;
            self.listeners.push((event, cb));
        }
        Ok(())
    }

    fn navigate(&self, nav: PageNav) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        let api = self.api.clone();
        let render_page = self.render_page.clone();
        future_to_promise(async move {
            let result = navigate_to(&inner, &api, &render_page, nav).await;
            finish(&inner, result.map(JsValue::from))
        })
    }
}

impl Drop for OverlayEditor {
    fn drop(&mut self) {
        let Ok(ed) = self.inner.try_borrow() else {
            return;
        };
        let overlay = ed.surface.overlay();
        for (event, cb) in &self.listeners {
            if let Err(e) = overlay.remove_event_listener_with_callback(event, cb.as_ref().unchecked_ref()) {
                tracing::warn!(event, error = ?e, "failed to remove pointer listener");
            }
        }
    }
}

/// `window.location.origin`, used when the host passes no API base.
fn page_origin() -> Option<String> {
    let location = web_sys::window()?.location();
    match location.origin() {
        Ok(origin) => Some(origin),
        Err(e) => {
            tracing::warn!(error = ?e, "page origin unavailable; using default API base");
            None
        }
    }
}

/// Report a failed async step and turn the result into a promise outcome.
fn finish(inner: &Rc<RefCell<BrowserEditor>>, result: Result<JsValue, EditorError>) -> Result<JsValue, JsValue> {
    result.map_err(|err| {
        inner.borrow().report(&err);
        to_js(&err)
    })
}

/// Ask the host to render `page` of `url` at `scale` and wait for it.
async fn render(render_page: &js_sys::Function, url: &str, page: u32, scale: f64) -> Result<RenderedPage, EditorError> {
    let returned = render_page
        .call3(&JsValue::NULL, &JsValue::from_str(url), &JsValue::from(page), &JsValue::from(scale))
        .map_err(|e| EditorError::RenderTargetMissing(format!("render_page threw: {e:?}")))?;
    let promise = js_sys::Promise::resolve(&returned);
    let value = JsFuture::from(promise)
        .await
        .map_err(|e| EditorError::RenderTargetMissing(format!("render_page rejected: {e:?}")))?;
    rendered_page_from_js(page, &value)
}

async fn load_current(
    inner: &Rc<RefCell<BrowserEditor>>,
    api: &ApiClient,
    render_page: &js_sys::Function,
) -> Result<LoadOutcome, EditorError> {
    let session = BrowserEditor::session()?;
    let doc: DocumentContext = session.document()?;
    let (token, page, scale) = {
        let mut ed = inner.borrow_mut();
        let same = ed.core.document() == Some(&doc) && !ed.core.store.is_empty();
        let page = if same { ed.core.viewport.page() } else { 1 };
        (ed.core.begin_load(), page, ed.core.config().render_scale)
    };

    let loaded = fetch_document(api, &doc, session.company_key.as_deref()).await?;
    if !inner.borrow().core.is_current(token) {
        tracing::warn!(city = %doc.city, form = %doc.form, "newer load started; not rendering this one");
        return Ok(LoadOutcome::Stale);
    }
    let mut rendered = render(render_page, &api.template_blank_url(&doc), page, scale).await?;

    let outcome = {
        let mut ed = inner.borrow_mut();
        let outcome = ed.core.finish_load(token, doc, loaded, &session, &mut rendered)?;
        if outcome != LoadOutcome::Stale {
            ed.align_overlay()?;
            ed.dispatch(vec![Action::SelectionChanged(None), Action::RenderNeeded]);
        }
        outcome
    };
    if outcome == LoadOutcome::Stale {
        repaint(inner, api, render_page).await?;
    }
    Ok(outcome)
}

async fn navigate_to(
    inner: &Rc<RefCell<BrowserEditor>>,
    api: &ApiClient,
    render_page: &js_sys::Function,
    nav: PageNav,
) -> Result<u32, EditorError> {
    let (url, target, scale, token) = {
        let ed = inner.borrow();
        let doc = ed.core.document().ok_or(EditorError::ContextIncomplete("document"))?;
        let target = ed.core.viewport.target(nav);
        (api.template_blank_url(doc), target, ed.core.config().render_scale, ed.core.navigate_token())
    };
    let mut rendered = render(render_page, &url, target, scale).await?;

    let committed = {
        let mut ed = inner.borrow_mut();
        match ed.core.finish_navigate(token, &mut rendered, target)? {
            Some(actions) => {
                ed.align_overlay()?;
                ed.dispatch(actions);
                true
            }
            None => false,
        }
    };
    if !committed {
        repaint(inner, api, render_page).await?;
    }
    Ok(inner.borrow().core.viewport.page())
}

/// Render the page the core shows again, after a dropped render may have
/// painted another document over it. A repaint that is itself overtaken is
/// dropped; whatever overtook it renders its own page.
async fn repaint(
    inner: &Rc<RefCell<BrowserEditor>>,
    api: &ApiClient,
    render_page: &js_sys::Function,
) -> Result<(), EditorError> {
    let (url, page, scale, token) = {
        let ed = inner.borrow();
        let Some(doc) = ed.core.document() else {
            return Ok(());
        };
        let page = ed.core.viewport.page();
        (api.template_blank_url(doc), page, ed.core.config().render_scale, ed.core.navigate_token())
    };
    let mut rendered = render(render_page, &url, page, scale).await?;

    let mut ed = inner.borrow_mut();
    if let Some(actions) = ed.core.finish_navigate(token, &mut rendered, page)? {
        ed.align_overlay()?;
        ed.dispatch(actions);
    }
    Ok(())
}
