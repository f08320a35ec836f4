#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

#[test]
fn view_reflects_selected_layer() {
    let layer = Layer::normalize(&json!({
        "id": "a", "type": "line", "key": "custom.rule", "x": 12.5, "y": 40, "page": 2, "thickness": 3,
    }));
    let view = PanelView::from_layer(&layer);
    assert_eq!(view.key, "custom.rule");
    assert_eq!(view.text(PanelField::X), "12.5");
    assert_eq!(view.text(PanelField::Y), "40");
    assert_eq!(view.text(PanelField::Page), "2");
    assert_eq!(view.text(PanelField::Size), "3");
    assert_eq!(view.size_label(), "Thickness");
}

#[test]
fn size_label_per_type() {
    let text = PanelView::from_layer(&Layer::normalize(&json!({})));
    let check = PanelView::from_layer(&Layer::normalize(&json!({ "type": "check" })));
    assert_eq!(text.size_label(), "Font size");
    assert_eq!(check.size_label(), "Box size");
    assert_eq!(check.size, 14.0);
}

#[test]
fn numeric_fields_parse_trimmed_input() {
    assert_eq!(PanelField::X.patch(" 42.5 ").and_then(|p| p.x), Some(42.5));
    assert_eq!(PanelField::Y.patch("-3").and_then(|p| p.y), Some(-3.0));
    assert_eq!(PanelField::Page.patch("3").and_then(|p| p.page), Some(3));
    assert_eq!(PanelField::Size.patch("11").and_then(|p| p.size), Some(11.0));
}

#[test]
fn unusable_input_yields_no_patch() {
    assert!(PanelField::X.patch("abc").is_none());
    assert!(PanelField::X.patch("").is_none());
    assert!(PanelField::X.patch("inf").is_none());
    assert!(PanelField::Page.patch("0").is_none());
    assert!(PanelField::Size.patch("-1").is_none());
}

#[test]
fn key_patch_is_trimmed() {
    let patch = PanelField::Key.patch("  job.address ").unwrap();
    assert_eq!(patch.key.as_deref(), Some("job.address"));
}

#[test]
fn size_patch_targets_type_attribute() {
    let mut layer = Layer::normalize(&json!({ "type": "check" }));
    PanelField::Size.patch("22").unwrap().apply_to(&mut layer);
    assert_eq!(layer.size_value(), 22.0);
    assert!(matches!(layer.kind, crate::layer::LayerKind::Check { size, .. } if size == 22.0));
}

#[test]
fn input_ids_are_distinct() {
    let ids: std::collections::HashSet<_> = PanelField::ALL.iter().map(|f| f.input_id()).collect();
    assert_eq!(ids.len(), PanelField::ALL.len());
}
