use std::collections::HashSet;

use super::*;
use crate::storage::{FileStore, MemoryStore};
use crate::transform::Point;

fn doc() -> DocumentContext {
    DocumentContext::new("miami", "roof_permit")
}

fn sample_layers() -> Vec<Layer> {
    vec![
        Layer::text("company.name", 1, Point::new(10.0, 10.0)),
        Layer::check("custom.check", 1, Point::new(50.0, 60.0)),
        Layer::line("custom.line", 1, Point::new(70.0, 80.0)),
    ]
}

#[test]
fn save_keeps_only_custom_layers() {
    let mut presets = PresetManager::new(MemoryStore::new());
    assert_eq!(presets.save(&doc(), "stamp", &sample_layers()).unwrap(), 2);

    let saved = presets.list(&doc());
    assert_eq!(saved.len(), 1);
    assert!(saved[0].layers.iter().all(Layer::is_custom));
}

#[test]
fn save_rejects_blank_name_and_no_custom_layers() {
    let mut presets = PresetManager::new(MemoryStore::new());
    assert!(matches!(presets.save(&doc(), "  ", &sample_layers()), Err(EditorError::EmptyPresetName)));

    let plain = vec![Layer::text("job.address", 1, Point::default())];
    assert!(matches!(presets.save(&doc(), "x", &plain), Err(EditorError::NoCustomLayers)));
    assert!(presets.list(&doc()).is_empty());
}

#[test]
fn saving_same_name_replaces() {
    let mut presets = PresetManager::new(MemoryStore::new());
    presets.save(&doc(), "stamp", &sample_layers()).unwrap();
    presets.save(&doc(), "other", &sample_layers()).unwrap();
    presets.save(&doc(), " stamp ", &sample_layers()[1..2]).unwrap();

    assert_eq!(presets.names(&doc()), ["other", "stamp"]);
    let stamp = presets.list(&doc()).into_iter().find(|p| p.name == "stamp").unwrap();
    assert_eq!(stamp.layers.len(), 1);
}

#[test]
fn presets_are_scoped_per_document() {
    let mut presets = PresetManager::new(MemoryStore::new());
    presets.save(&doc(), "stamp", &sample_layers()).unwrap();
    assert!(presets.list(&DocumentContext::new("miami", "other_form")).is_empty());
    assert_eq!(presets.names(&doc()), ["stamp"]);
}

#[test]
fn file_backed_presets_stay_in_their_document() {
    let dir = tempfile::tempdir().unwrap();
    let mut presets = PresetManager::new(FileStore::new(dir.path()));
    presets.save(&DocumentContext::new("miami dade", "hvhz"), "stamp", &sample_layers()).unwrap();

    assert!(presets.names(&DocumentContext::new("miami_dade", "hvhz")).is_empty());
    assert_eq!(presets.names(&DocumentContext::new("miami dade", "hvhz")), ["stamp"]);
}

#[test]
fn apply_uses_fresh_ids_on_current_page() {
    let mut presets = PresetManager::new(MemoryStore::new());
    let source = sample_layers();
    presets.save(&doc(), "stamp", &source).unwrap();

    let mut target = LayerStore::new();
    let first = presets.apply(&doc(), "stamp", &mut target, 3).unwrap();
    let second = presets.apply(&doc(), "stamp", &mut target, 4).unwrap();

    let source_ids: HashSet<_> = source.iter().map(|l| l.id.clone()).collect();
    let all_ids: HashSet<_> = first.iter().chain(second.iter()).cloned().collect();
    assert_eq!(all_ids.len(), 4);
    assert!(all_ids.is_disjoint(&source_ids));

    assert!(first.iter().all(|id| target.get(id).is_some_and(|l| l.page == 3)));
    assert!(second.iter().all(|id| target.get(id).is_some_and(|l| l.page == 4)));

    let check = target.get(&first[0]).unwrap();
    assert_eq!(check.key, "custom.check");
    assert_eq!(check.position(), Point::new(50.0, 60.0));
}

#[test]
fn apply_unknown_preset_fails() {
    let presets = PresetManager::new(MemoryStore::new());
    let mut target = LayerStore::new();
    let err = presets.apply(&doc(), "missing", &mut target, 1).unwrap_err();
    assert!(matches!(err, EditorError::PresetNotFound(ref n) if n == "missing"));
    assert!(target.is_empty());
}

#[test]
fn remove_reports_existence() {
    let mut presets = PresetManager::new(MemoryStore::new());
    presets.save(&doc(), "stamp", &sample_layers()).unwrap();
    assert!(presets.remove(&doc(), "stamp").unwrap());
    assert!(!presets.remove(&doc(), "stamp").unwrap());
    assert!(presets.names(&doc()).is_empty());
}

#[test]
fn corrupt_preset_list_reads_as_empty() {
    let mut store = MemoryStore::new();
    store.put("pf_actions::miami::roof_permit", "not json").unwrap();
    let presets = PresetManager::new(store);
    assert!(presets.list(&doc()).is_empty());
}
