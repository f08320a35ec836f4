//! Editor session core: every piece of editor state in one owner.
//!
//! `EditorCore` owns the layer store, the viewport, the drag controller,
//! the overlay renderer and the latest field resolution, and passes them by
//! reference to the stateless helpers in the other modules. It never touches
//! a browser API: the host feeds it events and gets back a list of
//! [`Action`]s to carry out (redraw, move one node, show a status line).
//! Surfaces and rasterizers are passed in per call.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::EditorConfig;
use crate::consts::{CUSTOM_CHECK_KEY, CUSTOM_LINE_KEY, CUSTOM_TEXT_KEY};
use crate::context::{DocumentContext, SessionContext};
use crate::drag::{DragController, DragEnd};
use crate::error::EditorError;
use crate::fields::{self, CompanyProfile, FieldMap};
use crate::hit::hit_test;
use crate::layer::{Layer, LayerId, LayerType};
use crate::panel::{PanelField, PanelView};
use crate::persist::{self, OverridePayload};
use crate::preset::PresetManager;
use crate::render::{ListEntry, OverlayRenderer, OverlaySurface, list_entries, project};
use crate::storage::ScopedStore;
use crate::store::LayerStore;
use crate::transform::Point;
use crate::viewport::{PageNav, Rasterizer, Viewport};

/// Something the host must do after an editor operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Redraw the overlay, the layer list and the panel.
    RenderNeeded,
    /// Move one mounted node without a full redraw (mid-drag).
    NodeMoved { id: LayerId, at: Point },
    SelectionChanged(Option<LayerId>),
    /// User-visible status line.
    Status(String),
}

/// Template data fetched for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDocument {
    pub template_fields: Map<String, Value>,
    /// Layer records in document space.
    pub template_layers: Vec<Value>,
    pub company: CompanyProfile,
}

/// Ticket for one load; only the newest ticket may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken(u64);

/// Ticket for one asynchronous page change. Starting or finishing a load
/// invalidates every ticket handed out before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The store was rebuilt from the template.
    Rebuilt { page_count: u32 },
    /// Same document reloaded; values were merged into the existing layers.
    Merged { page_count: u32 },
    /// A newer load started before this one finished; nothing changed.
    Stale,
}

/// Headless editor state.
#[derive(Debug, Default)]
pub struct EditorCore {
    pub store: LayerStore,
    pub viewport: Viewport,
    pub drag: DragController,
    renderer: OverlayRenderer,
    config: EditorConfig,
    document: Option<DocumentContext>,
    template_fields: Map<String, Value>,
    company: CompanyProfile,
    fields: FieldMap,
    load_seq: u64,
    view_epoch: u64,
}

impl EditorCore {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self { config, ..Self::default() }
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The document currently loaded, if any.
    #[must_use]
    pub fn document(&self) -> Option<&DocumentContext> {
        self.document.as_ref()
    }

    /// The latest resolved field values.
    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        self.store.layers()
    }

    /// Replace every layer with `records` (raster space).
    pub fn set_layers(&mut self, records: &[Value]) -> Vec<Action> {
        self.drag.end(DragEnd::PointerCancel);
        self.store.set_all_raw(records);
        vec![Action::SelectionChanged(self.store.selected_id().cloned()), Action::RenderNeeded]
    }

    // =========================================================
    // Loading
    // =========================================================

    /// Start a load. Any load started earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadToken {
        self.load_seq += 1;
        self.view_epoch += 1;
        LoadToken(self.load_seq)
    }

    #[must_use]
    pub fn is_current(&self, token: LoadToken) -> bool {
        token.0 == self.load_seq
    }

    /// Apply a finished load.
    ///
    /// A different document rebuilds the store from the template layers,
    /// converted to raster space only after the first page is rasterized.
    /// Reloading the same document keeps the user's layers and merges values
    /// into them. Either way the fields are then resolved and applied.
    ///
    /// # Errors
    ///
    /// Propagates rasterizer failures; the store is untouched in that case.
    pub fn finish_load<R: Rasterizer + ?Sized>(
        &mut self,
        token: LoadToken,
        doc: DocumentContext,
        loaded: LoadedDocument,
        session: &SessionContext,
        rasterizer: &mut R,
    ) -> Result<LoadOutcome, EditorError> {
        if !self.is_current(token) {
            tracing::warn!(city = %doc.city, form = %doc.form, "dropping stale document load");
            return Ok(LoadOutcome::Stale);
        }

        self.drag.end(DragEnd::PointerCancel);
        let same_document = self.document.as_ref() == Some(&doc) && !self.store.is_empty();
        let outcome = if same_document {
            self.viewport.navigate(rasterizer, PageNav::GoTo(self.viewport.page()))?;
            LoadOutcome::Merged { page_count: self.viewport.page_count() }
        } else {
            self.viewport.open(rasterizer)?;
            let layers = persist::deserialize(&loaded.template_layers, &self.viewport.frame());
            self.store.set_all(layers);
            LoadOutcome::Rebuilt { page_count: self.viewport.page_count() }
        };

        tracing::info!(city = %doc.city, form = %doc.form, ?outcome, "document loaded");
        self.view_epoch += 1;
        self.document = Some(doc);
        self.template_fields = loaded.template_fields;
        self.company = loaded.company;
        self.apply_fields(session);
        self.renderer.invalidate();
        Ok(outcome)
    }

    fn apply_fields(&mut self, session: &SessionContext) {
        self.fields = fields::reapply(
            &mut self.store,
            self.viewport.page(),
            &self.config.grid,
            &self.template_fields,
            &self.company,
            session,
        );
    }

    /// Re-resolve fields against the current session and push them into
    /// the layers, provisioning missing standard layers on the current page.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ContextIncomplete`] when no document is loaded.
    pub fn reapply_fields_now(&mut self, session: &SessionContext) -> Result<Vec<Action>, EditorError> {
        if self.document.is_none() {
            return Err(EditorError::ContextIncomplete("document"));
        }
        self.apply_fields(session);
        Ok(vec![Action::RenderNeeded, Action::Status("✅ Field values applied".to_owned())])
    }

    // =========================================================
    // Layer editing
    // =========================================================

    fn add_layer(&mut self, layer: Layer) -> Vec<Action> {
        let id = self.store.add(layer);
        self.store.select(Some(&id));
        vec![Action::SelectionChanged(Some(id)), Action::RenderNeeded]
    }

    /// Add an empty `custom.text` layer on the current page.
    pub fn add_text(&mut self) -> Vec<Action> {
        let layer = Layer::text(CUSTOM_TEXT_KEY, self.viewport.page(), self.config.default_position);
        self.add_layer(layer)
    }

    /// Add a checked `custom.check` layer on the current page.
    pub fn add_check(&mut self) -> Vec<Action> {
        let layer = Layer::check(CUSTOM_CHECK_KEY, self.viewport.page(), self.config.default_position);
        self.add_layer(layer)
    }

    /// Add a `custom.line` layer on the current page.
    pub fn add_line(&mut self) -> Vec<Action> {
        let layer = Layer::new(LayerType::Line, CUSTOM_LINE_KEY, self.viewport.page(), self.config.default_position);
        self.add_layer(layer)
    }

    /// Remove the selected layer.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NothingSelected`] when there is no selection.
    pub fn delete_selected(&mut self) -> Result<Vec<Action>, EditorError> {
        let id = self.store.selected_id().cloned().ok_or(EditorError::NothingSelected)?;
        self.store.remove(&id);
        Ok(vec![Action::SelectionChanged(self.store.selected_id().cloned()), Action::RenderNeeded])
    }

    pub fn select(&mut self, id: Option<&LayerId>) -> Vec<Action> {
        let before = self.store.selected_id().cloned();
        self.store.select(id);
        let after = self.store.selected_id().cloned();
        if before == after {
            return Vec::new();
        }
        vec![Action::SelectionChanged(after), Action::RenderNeeded]
    }

    /// Panel contents for the selected layer.
    #[must_use]
    pub fn panel(&self) -> Option<PanelView> {
        self.store.selected().map(PanelView::from_layer)
    }

    /// Layer list rows.
    #[must_use]
    pub fn list(&self) -> Vec<ListEntry> {
        list_entries(&self.store)
    }

    /// Apply one edited panel input to the selected layer. Unusable input is ignored.
    pub fn edit_field(&mut self, field: PanelField, input: &str) -> Vec<Action> {
        let Some(id) = self.store.selected_id().cloned() else {
            return Vec::new();
        };
        let Some(patch) = field.patch(input) else {
            return Vec::new();
        };
        if self.store.mutate(&id, &patch) {
            vec![Action::RenderNeeded]
        } else {
            Vec::new()
        }
    }

    // =========================================================
    // Pointer input
    // =========================================================

    /// Pointer pressed on the node of layer `id`: select it and start dragging.
    pub fn pointer_down(&mut self, id: &LayerId, pointer: Point) -> Vec<Action> {
        let Some(anchor) = self.store.get(id).map(Layer::position) else {
            return Vec::new();
        };
        self.drag.pointer_down(id.clone(), pointer, anchor);
        let mut actions = self.select(Some(id));
        if actions.is_empty() {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    /// Pointer pressed somewhere on the overlay; picks the topmost node hit.
    pub fn pointer_down_at(&mut self, pointer: Point) -> Vec<Action> {
        let nodes = project(&self.store, self.viewport.page());
        match hit_test(&nodes, pointer).cloned() {
            Some(id) => self.pointer_down(&id, pointer),
            None => Vec::new(),
        }
    }

    /// Pointer moved. While dragging, the layer follows the pointer.
    pub fn pointer_move(&mut self, pointer: Point) -> Vec<Action> {
        let Some((id, at)) = self.drag.pointer_move(pointer).map(|(id, at)| (id.clone(), at)) else {
            return Vec::new();
        };
        self.store.update(&id, |layer| layer.move_to(at));
        vec![Action::NodeMoved { id, at }]
    }

    /// Pointer released, cancelled, or left the overlay.
    pub fn pointer_end(&mut self, reason: DragEnd) -> Vec<Action> {
        match self.drag.end(reason) {
            Some(_) => vec![Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    // =========================================================
    // Navigation
    // =========================================================

    /// Move to another page, re-rasterizing it first.
    ///
    /// # Errors
    ///
    /// Propagates rasterizer failures; the current page is kept.
    pub fn navigate<R: Rasterizer + ?Sized>(&mut self, rasterizer: &mut R, nav: PageNav) -> Result<Vec<Action>, EditorError> {
        self.drag.end(DragEnd::PointerCancel);
        self.viewport.navigate(rasterizer, nav)?;
        Ok(vec![Action::RenderNeeded])
    }

    /// Ticket for a page change whose page is rendered asynchronously.
    #[must_use]
    pub fn navigate_token(&self) -> NavToken {
        NavToken(self.view_epoch)
    }

    /// Whether a page change started under `token` may still be applied.
    #[must_use]
    pub fn accepts(&self, token: NavToken) -> bool {
        token.0 == self.view_epoch
    }

    /// Commit an asynchronous page change to `page`, already rendered by
    /// `rasterizer`. Returns `None` when a load started or finished since
    /// `token` was taken; the viewport is left alone in that case.
    ///
    /// # Errors
    ///
    /// Propagates rasterizer failures.
    pub fn finish_navigate<R: Rasterizer + ?Sized>(
        &mut self,
        token: NavToken,
        rasterizer: &mut R,
        page: u32,
    ) -> Result<Option<Vec<Action>>, EditorError> {
        if !self.accepts(token) {
            tracing::warn!(page, "dropping page change from before the last load");
            return Ok(None);
        }
        self.navigate(rasterizer, PageNav::GoTo(page)).map(Some)
    }

    /// Keyboard navigation; ignored while the editor view is inactive.
    ///
    /// # Errors
    ///
    /// Propagates rasterizer failures.
    pub fn key_down<R: Rasterizer + ?Sized>(&mut self, rasterizer: &mut R, key: &str) -> Result<Vec<Action>, EditorError> {
        match self.viewport.key_nav(key) {
            Some(nav) => self.navigate(rasterizer, nav),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.viewport.set_active(active);
    }

    // =========================================================
    // Rendering
    // =========================================================

    /// Rebuild `surface` from the layers on the current page.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn render<S: OverlaySurface + ?Sized>(&mut self, surface: &mut S) -> Result<usize, EditorError> {
        self.renderer.redraw(&self.store, self.viewport.page(), surface)
    }

    /// Redraw only if something changed since the last render.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn render_if_stale<S: OverlaySurface + ?Sized>(&mut self, surface: &mut S) -> Result<bool, EditorError> {
        self.renderer.redraw_if_stale(&self.store, self.viewport.page(), surface)
    }

    // =========================================================
    // Presets and persistence
    // =========================================================

    fn require_document(&self) -> Result<&DocumentContext, EditorError> {
        self.document.as_ref().ok_or(EditorError::ContextIncomplete("document"))
    }

    /// Save the custom layers as preset `name`.
    ///
    /// # Errors
    ///
    /// Fails without a loaded document or for any [`PresetManager::save`] error.
    pub fn save_preset<S: ScopedStore>(&self, presets: &mut PresetManager<S>, name: &str) -> Result<Vec<Action>, EditorError> {
        let doc = self.require_document()?;
        let count = presets.save(doc, name, self.store.custom_layers())?;
        Ok(vec![Action::Status(format!("✅ Preset \"{}\" saved ({count} layers)", name.trim()))])
    }

    /// Stamp preset `name` onto the current page.
    ///
    /// # Errors
    ///
    /// Fails without a loaded document or when the preset does not exist.
    pub fn apply_preset<S: ScopedStore>(&mut self, presets: &PresetManager<S>, name: &str) -> Result<Vec<Action>, EditorError> {
        let doc = self.document.clone().ok_or(EditorError::ContextIncomplete("document"))?;
        let ids = presets.apply(&doc, name, &mut self.store, self.viewport.page())?;
        Ok(vec![
            Action::RenderNeeded,
            Action::Status(format!("✅ Preset \"{}\" applied ({} layers)", name.trim(), ids.len())),
        ])
    }

    /// Body for `POST /api/override`: every layer in document space plus
    /// the session's job values.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ContextIncomplete`] without a company or a
    /// loaded document.
    pub fn override_payload(&self, session: &SessionContext) -> Result<OverridePayload, EditorError> {
        let company_key = session.require_company()?.to_owned();
        let doc = self.require_document()?;
        let job = session.job_data();
        let fields = BTreeMap::from([
            ("job.address".to_owned(), job.job_address),
            ("job.zip".to_owned(), job.job_zip),
            ("roof.category".to_owned(), job.roof_category),
            ("roof.area_sqft".to_owned(), job.roof_area_sqft),
        ]);
        Ok(OverridePayload {
            company_key,
            city: doc.city.clone(),
            form_key: doc.form.clone(),
            fields,
            layers: persist::serialize(self.store.layers(), &self.viewport.frame()),
        })
    }
}
