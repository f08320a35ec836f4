#![allow(clippy::float_cmp)]

use std::collections::HashSet;

use serde_json::json;

use super::*;
use crate::render::MemorySurface;
use crate::storage::MemoryStore;
use crate::viewport::RasterPage;

struct FakeRasterizer {
    pages: u32,
    fail: bool,
}

impl FakeRasterizer {
    fn new(pages: u32) -> Self {
        Self { pages, fail: false }
    }
}

impl Rasterizer for FakeRasterizer {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn rasterize(&mut self, _page: u32) -> Result<RasterPage, EditorError> {
        if self.fail {
            return Err(EditorError::RenderTargetMissing("pdfCanvas".into()));
        }
        Ok(RasterPage { width: 918.0, height: 1188.0, scale: 1.5 })
    }
}

fn doc() -> DocumentContext {
    DocumentContext::new("miami", "roof_permit")
}

fn acme_session() -> SessionContext {
    SessionContext {
        company_key: Some("acme".into()),
        city: Some("miami".into()),
        form_key: Some("roof_permit".into()),
        job_address: Some("123 Main St".into()),
        ..SessionContext::default()
    }
}

fn acme_document() -> LoadedDocument {
    LoadedDocument {
        company: CompanyProfile { name: Some("Acme Roofing".into()), ..CompanyProfile::default() },
        ..LoadedDocument::default()
    }
}

fn loaded_core() -> EditorCore {
    let mut core = EditorCore::default();
    let token = core.begin_load();
    core.finish_load(token, doc(), acme_document(), &acme_session(), &mut FakeRasterizer::new(3))
        .unwrap();
    core
}

fn layer_by_key<'a>(core: &'a EditorCore, key: &str) -> &'a Layer {
    core.layers().iter().find(|l| l.key == key).unwrap()
}

// =============================================================
// Loading and field application
// =============================================================

#[test]
fn load_seeds_standard_layers_without_overlap() {
    let core = loaded_core();

    assert_eq!(layer_by_key(&core, "company.name").text_value(), Some("Acme Roofing"));
    assert_eq!(layer_by_key(&core, "job.address").text_value(), Some("123 Main St"));

    let positions: HashSet<(u64, u64)> = core
        .layers()
        .iter()
        .map(|l| (l.x.to_bits(), l.y.to_bits()))
        .collect();
    assert_eq!(positions.len(), core.layers().len());
    assert_eq!(core.fields()["company.name"], "Acme Roofing");
}

#[test]
fn template_layers_are_converted_after_rasterizing() {
    let mut core = EditorCore::default();
    let loaded = LoadedDocument {
        template_layers: vec![json!({ "id": "t1", "type": "text", "key": "permit.no", "x": 100, "y": 592 })],
        ..LoadedDocument::default()
    };
    let token = core.begin_load();
    let outcome = core
        .finish_load(token, doc(), loaded, &SessionContext::default(), &mut FakeRasterizer::new(2))
        .unwrap();

    assert_eq!(outcome, LoadOutcome::Rebuilt { page_count: 2 });
    let layer = core.store.get(&LayerId::from("t1")).unwrap();
    assert_eq!(layer.position(), Point::new(150.0, 300.0));
}

#[test]
fn stale_load_is_dropped() {
    let mut core = EditorCore::default();
    let first = core.begin_load();
    let second = core.begin_load();

    let outcome = core
        .finish_load(first, doc(), acme_document(), &acme_session(), &mut FakeRasterizer::new(1))
        .unwrap();
    assert_eq!(outcome, LoadOutcome::Stale);
    assert!(core.store.is_empty());
    assert!(core.document().is_none());

    assert!(core.is_current(second));
}

#[test]
fn reloading_same_document_merges_into_user_layers() {
    let mut core = loaded_core();
    core.add_text();
    let custom_count = core.layers().len();

    let token = core.begin_load();
    let outcome = core
        .finish_load(token, doc(), acme_document(), &acme_session(), &mut FakeRasterizer::new(3))
        .unwrap();
    assert_eq!(outcome, LoadOutcome::Merged { page_count: 3 });
    assert_eq!(core.layers().len(), custom_count);
}

#[test]
fn failed_rasterize_leaves_store_untouched() {
    let mut core = loaded_core();
    let before = core.layers().len();
    let mut broken = FakeRasterizer { pages: 3, fail: true };

    let token = core.begin_load();
    let result = core.finish_load(token, DocumentContext::new("miami", "other"), acme_document(), &acme_session(), &mut broken);
    assert!(matches!(result, Err(EditorError::RenderTargetMissing(_))));
    assert_eq!(core.layers().len(), before);
    assert_eq!(core.document(), Some(&doc()));
}

#[test]
fn reapply_requires_loaded_document() {
    let mut core = EditorCore::default();
    let err = core.reapply_fields_now(&acme_session()).unwrap_err();
    assert!(matches!(err, EditorError::ContextIncomplete("document")));
}

#[test]
fn reapply_picks_up_session_changes_without_clobbering_edits() {
    let mut core = loaded_core();
    let zip_id = layer_by_key(&core, "job.zip").id.clone();
    let address_id = layer_by_key(&core, "job.address").id.clone();
    core.store.mutate(&address_id, &crate::layer::LayerPatch { value: Some("Typed".into()), ..Default::default() });

    let session = SessionContext { job_zip: Some("33101".into()), ..acme_session() };
    core.reapply_fields_now(&session).unwrap();

    assert_eq!(core.store.get(&zip_id).and_then(Layer::text_value), Some("33101"));
    assert_eq!(core.store.get(&address_id).and_then(Layer::text_value), Some("Typed"));
}

// =============================================================
// Editing
// =============================================================

#[test]
fn added_layers_land_on_current_page_and_are_selected() {
    let mut core = loaded_core();
    core.navigate(&mut FakeRasterizer::new(3), PageNav::Next).unwrap();

    let actions = core.add_check();
    let Some(Action::SelectionChanged(Some(id))) = actions.first().cloned() else {
        panic!("expected selection change, got {actions:?}");
    };
    let layer = core.store.get(&id).unwrap();
    assert_eq!(layer.page, 2);
    assert_eq!(layer.key, "custom.check");
    assert_eq!(layer.checked(), Some(Some(true)));
    assert_eq!(layer.position(), Point::new(120.0, 120.0));
    assert_eq!(core.panel().map(|p| p.id), Some(id));
}

#[test]
fn delete_requires_selection() {
    let mut core = EditorCore::default();
    assert!(matches!(core.delete_selected(), Err(EditorError::NothingSelected)));

    core.add_line();
    core.delete_selected().unwrap();
    assert!(core.store.is_empty());
}

#[test]
fn panel_edits_patch_selected_layer() {
    let mut core = EditorCore::default();
    core.add_text();
    assert_eq!(core.edit_field(PanelField::X, "42"), vec![Action::RenderNeeded]);
    assert!(core.edit_field(PanelField::Size, "-3").is_empty());
    core.edit_field(PanelField::Size, "14");

    let layer = core.store.selected().unwrap();
    assert_eq!(layer.x, 42.0);
    assert_eq!(layer.size_value(), 14.0);
}

// =============================================================
// Dragging
// =============================================================

#[test]
fn drag_moves_layer_and_reports_node_moves() {
    let mut core = EditorCore::default();
    core.add_text();
    let id = core.store.selected_id().cloned().unwrap();
    core.store.mutate(&id, &crate::layer::LayerPatch::position(Point::new(140.0, 140.0)));

    core.pointer_down(&id, Point::new(150.0, 150.0));
    let moved = core.pointer_move(Point::new(200.0, 180.0));
    assert_eq!(moved, vec![Action::NodeMoved { id: id.clone(), at: Point::new(190.0, 170.0) }]);
    assert_eq!(core.store.get(&id).map(Layer::position), Some(Point::new(190.0, 170.0)));

    assert_eq!(core.pointer_end(DragEnd::PointerUp), vec![Action::RenderNeeded]);
    assert!(core.pointer_move(Point::new(0.0, 0.0)).is_empty());
}

#[test]
fn pointer_down_at_hits_topmost_node() {
    let mut core = EditorCore::default();
    core.add_check();
    core.add_check();
    let top = core.store.selected_id().cloned().unwrap();
    core.select(None);

    core.pointer_down_at(Point::new(125.0, 125.0));
    assert_eq!(core.store.selected_id(), Some(&top));
    assert!(core.drag.is_dragging());

    core.pointer_end(DragEnd::PointerLeave);
    assert!(core.pointer_down_at(Point::new(5.0, 5.0)).is_empty());
}

#[test]
fn pointer_down_on_a_known_node_ignores_estimated_bounds() {
    let mut core = EditorCore::default();
    core.add_text();
    let id = core.store.selected_id().cloned().unwrap();
    core.select(None);
    let anchor = core.store.get(&id).map(Layer::position).unwrap();
    let far_right = Point::new(anchor.x + 400.0, anchor.y + 2.0);

    assert!(core.pointer_down_at(far_right).is_empty());
    assert!(!core.drag.is_dragging());

    assert!(!core.pointer_down(&id, far_right).is_empty());
    assert!(core.drag.is_dragging());
    assert_eq!(core.store.selected_id(), Some(&id));

    let moved = core.pointer_move(Point::new(far_right.x + 10.0, far_right.y));
    assert_eq!(moved, vec![Action::NodeMoved { id, at: Point::new(anchor.x + 10.0, anchor.y) }]);
}

#[test]
fn pointer_down_on_an_unknown_node_does_nothing() {
    let mut core = EditorCore::default();
    assert!(core.pointer_down(&LayerId::from("gone"), Point::new(1.0, 1.0)).is_empty());
    assert!(!core.drag.is_dragging());
}

// =============================================================
// Navigation and rendering
// =============================================================

#[test]
fn overlay_shows_only_current_page() {
    let mut core = loaded_core();
    let mut raster = FakeRasterizer::new(3);
    let mut surface = MemorySurface::new();

    core.navigate(&mut raster, PageNav::GoTo(2)).unwrap();
    core.add_text();
    let page_two = core.store.selected_id().cloned().unwrap();

    assert_eq!(core.render(&mut surface).unwrap(), 1);
    assert!(surface.node(&page_two).is_some());

    core.navigate(&mut raster, PageNav::Prev).unwrap();
    core.render(&mut surface).unwrap();
    assert!(surface.node(&page_two).is_none());
    assert_eq!(surface.nodes().len(), fields::STANDARD_KEYS.len());
}

#[test]
fn render_if_stale_skips_unchanged_state() {
    let mut core = loaded_core();
    let mut surface = MemorySurface::new();
    assert!(core.render_if_stale(&mut surface).unwrap());
    assert!(!core.render_if_stale(&mut surface).unwrap());
    core.add_line();
    assert!(core.render_if_stale(&mut surface).unwrap());
}

#[test]
fn arrow_keys_only_navigate_while_active() {
    let mut core = loaded_core();
    let mut raster = FakeRasterizer::new(3);

    assert_eq!(core.key_down(&mut raster, "ArrowRight").unwrap(), vec![Action::RenderNeeded]);
    assert_eq!(core.viewport.page(), 2);

    core.set_active(false);
    assert!(core.key_down(&mut raster, "ArrowRight").unwrap().is_empty());
    assert_eq!(core.viewport.page(), 2);
    assert!(core.key_down(&mut raster, "Enter").unwrap().is_empty());
}

#[test]
fn page_change_without_a_load_in_between_is_applied() {
    let mut core = loaded_core();
    let token = core.navigate_token();

    let actions = core.finish_navigate(token, &mut FakeRasterizer::new(3), 3).unwrap();
    assert_eq!(actions, Some(vec![Action::RenderNeeded]));
    assert_eq!(core.viewport.page(), 3);
}

#[test]
fn page_change_overtaken_by_a_newer_load_is_discarded() {
    let mut core = loaded_core();
    let load = core.begin_load();
    let nav = core.navigate_token();
    let other = DocumentContext::new("tampa", "roof_permit");
    core.finish_load(load, other.clone(), acme_document(), &acme_session(), &mut FakeRasterizer::new(3))
        .unwrap();

    assert!(!core.accepts(nav));
    assert_eq!(core.finish_navigate(nav, &mut FakeRasterizer::new(3), 2).unwrap(), None);
    assert_eq!(core.viewport.page(), 1);
    assert_eq!(core.document(), Some(&other));
}

#[test]
fn starting_a_load_discards_earlier_page_changes() {
    let mut core = loaded_core();
    let nav = core.navigate_token();
    core.begin_load();

    assert_eq!(core.finish_navigate(nav, &mut FakeRasterizer::new(3), 2).unwrap(), None);
    assert_eq!(core.viewport.page(), 1);
}

// =============================================================
// Presets and override payload
// =============================================================

#[test]
fn presets_round_trip_through_core() {
    let mut core = loaded_core();
    let mut presets = PresetManager::new(MemoryStore::new());

    assert!(matches!(core.save_preset(&mut presets, "stamp"), Err(EditorError::NoCustomLayers)));
    core.add_check();
    core.save_preset(&mut presets, "stamp").unwrap();

    let before = core.layers().len();
    core.apply_preset(&presets, "stamp").unwrap();
    assert_eq!(core.layers().len(), before + 1);
}

#[test]
fn presets_need_a_document() {
    let mut core = EditorCore::default();
    let presets = PresetManager::new(MemoryStore::new());
    assert!(matches!(core.apply_preset(&presets, "x"), Err(EditorError::ContextIncomplete("document"))));
}

#[test]
fn override_payload_is_in_document_space() {
    let mut core = loaded_core();
    core.add_text();
    let id = core.store.selected_id().cloned().unwrap();
    core.store.mutate(&id, &crate::layer::LayerPatch::position(Point::new(150.0, 300.0)));

    let session = SessionContext { job_zip: Some("33101".into()), ..acme_session() };
    let payload = core.override_payload(&session).unwrap();
    assert_eq!(payload.company_key, "acme");
    assert_eq!(payload.form_key, "roof_permit");
    assert_eq!(payload.fields["job.zip"], "33101");
    assert_eq!(payload.fields["roof.category"], "");
    assert_eq!(payload.layers.len(), core.layers().len());

    let wire = payload.layers.iter().find(|l| l.id == id).unwrap();
    assert_eq!((wire.x, wire.y), (100.0, 592.0));
}

#[test]
fn override_payload_requires_company() {
    let core = loaded_core();
    let session = SessionContext { company_key: None, ..acme_session() };
    assert!(matches!(core.override_payload(&session), Err(EditorError::ContextIncomplete("company"))));
}
