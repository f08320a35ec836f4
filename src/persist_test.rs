#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn frame() -> RasterFrame {
    RasterFrame::new(1.5, 1188.0)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// =============================================================
// serialize
// =============================================================

#[test]
fn text_position_moves_to_document_space() {
    let layer = Layer::text("company.name", 2, Point::new(150.0, 300.0));
    let wire = serialize_layer(&layer, &frame());
    assert_eq!(wire.x, 100.0);
    assert_eq!(wire.y, 592.0);
    assert_eq!(wire.page, 2);
    assert_eq!(wire.shape, WireShape::Text { value: String::new(), font_size: 10.0 });
}

#[test]
fn line_without_endpoints_becomes_horizontal_segment() {
    let mut layer = Layer::line("custom.line", 1, Point::new(30.0, 60.0));
    layer.kind = LayerKind::Line { length: 150.0, thickness: 3.0, endpoints: None };

    let WireShape::Line { width, length, x1, y1, x2, y2 } = serialize_layer(&layer, &frame()).shape else {
        panic!("expected line");
    };
    assert_eq!(width, 3.0);
    assert_eq!(length, 100.0);
    assert_eq!((x1, x2), (20.0, 120.0));
    assert_eq!((y1, y2), (752.0, 752.0));
}

#[test]
fn line_with_endpoints_converts_them() {
    let mut layer = Layer::line("custom.line", 1, Point::new(0.0, 0.0));
    layer.kind = LayerKind::Line {
        length: 10.0,
        thickness: 2.0,
        endpoints: Some(Segment { x1: 15.0, y1: 1188.0, x2: 30.0, y2: 1173.0 }),
    };
    let WireShape::Line { x1, y1, x2, y2, .. } = serialize_layer(&layer, &frame()).shape else {
        panic!("expected line");
    };
    assert_eq!((x1, y1, x2, y2), (10.0, 0.0, 20.0, 10.0));
}

#[test]
fn numeric_fallbacks_apply() {
    let mut text = Layer::text("a", 1, Point::new(f64::NAN, 0.0));
    text.kind = LayerKind::Text { value: "v".into(), font_size: f64::INFINITY };
    let wire = serialize_layer(&text, &RasterFrame::default());
    assert_eq!(wire.x, 0.0);
    assert_eq!(wire.shape, WireShape::Text { value: "v".into(), font_size: 10.0 });

    let mut line = Layer::line("b", 1, Point::default());
    line.kind = LayerKind::Line { length: f64::NAN, thickness: -1.0, endpoints: None };
    let WireShape::Line { width, length, .. } = serialize_layer(&line, &RasterFrame::default()).shape else {
        panic!("expected line");
    };
    assert_eq!(width, 1.0);
    assert_eq!(length, 160.0);
}

#[test]
fn undecided_check_is_written_checked() {
    let layer = Layer::normalize(&json!({ "type": "check", "key": "flags.a" }));
    let wire = serialize_layer(&layer, &RasterFrame::default());
    assert_eq!(wire.shape, WireShape::Check { checked: true, size: 14.0 });

    let off = Layer::normalize(&json!({ "type": "check", "checked": false }));
    assert!(matches!(serialize_layer(&off, &RasterFrame::default()).shape, WireShape::Check { checked: false, .. }));
}

#[test]
fn wire_json_shape() {
    let layer = Layer::normalize(&json!({ "id": "L1", "type": "check", "key": "custom.check", "x": 3, "y": 4 }));
    let value = serde_json::to_value(serialize_layer(&layer, &RasterFrame::default())).unwrap();
    assert_eq!(value["type"], "check");
    assert_eq!(value["id"], "L1");
    assert_eq!(value["checked"], true);
    assert_eq!(value["x"], 3.0);
}

#[test]
fn unknown_height_skips_flip() {
    let layer = Layer::text("a", 1, Point::new(30.0, 60.0));
    let wire = serialize_layer(&layer, &RasterFrame::new(1.5, 0.0));
    assert_eq!((wire.x, wire.y), (20.0, 40.0));
}

// =============================================================
// deserialize
// =============================================================

#[test]
fn document_records_land_in_raster_space() {
    let layers = deserialize(&[json!({ "type": "text", "key": "job.address", "x": 100, "y": 592 })], &frame());
    assert_eq!(layers[0].position(), Point::new(150.0, 300.0));
}

#[test]
fn endpoint_only_lines_are_anchored_and_measured() {
    let layers = deserialize(
        &[json!({ "type": "line", "x1": 10, "y1": 0, "x2": 40, "y2": 40 })],
        &RasterFrame::new(2.0, 0.0),
    );
    let line = &layers[0];
    assert_eq!(line.position(), Point::new(20.0, 0.0));
    let LayerKind::Line { length, endpoints: Some(seg), .. } = &line.kind else {
        panic!("expected line with endpoints");
    };
    assert_eq!(*length, 100.0);
    assert_eq!(*seg, Segment { x1: 20.0, y1: 0.0, x2: 80.0, y2: 80.0 });
}

#[test]
fn serialize_inverts_deserialize() {
    let original = vec![
        Layer::text("company.name", 1, Point::new(150.0, 300.0)),
        Layer::check("custom.check", 2, Point::new(45.5, 1000.25)),
        Layer::line("custom.line", 1, Point::new(12.0, 600.0)),
    ];
    let wire: Vec<Value> = serialize(&original, &frame())
        .into_iter()
        .map(|w| serde_json::to_value(w).unwrap())
        .collect();
    let back = deserialize(&wire, &frame());

    for (a, b) in original.iter().zip(&back) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.layer_type(), b.layer_type());
        assert!(close(a.x, b.x) && close(a.y, b.y), "{a:?} vs {b:?}");
    }
    let LayerKind::Line { length, .. } = back[2].kind else {
        panic!("expected line");
    };
    assert!(close(length, 160.0));
}

#[test]
fn override_payload_shape() {
    let payload = OverridePayload {
        company_key: "acme".into(),
        city: "miami".into(),
        form_key: "roof".into(),
        fields: BTreeMap::from([("job.zip".to_owned(), "33101".to_owned())]),
        layers: Vec::new(),
    };
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["fields"]["job.zip"], "33101");
    assert_eq!(value["layers"], json!([]));
}
