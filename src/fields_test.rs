use serde_json::json;

use super::*;
use crate::transform::Point;

fn template(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn acme() -> CompanyProfile {
    CompanyProfile { name: Some("Acme Roofing".into()), license: Some("CCC-1".into()), ..CompanyProfile::default() }
}

// =============================================================
// resolve
// =============================================================

#[test]
fn exact_key_beats_alias_beats_profile_beats_session() {
    let session = SessionContext { company_name: Some("Session Co".into()), ..SessionContext::default() };

    let all = template(json!({ "company.name": "Exact", "name": "Alias" }));
    assert_eq!(resolve(&all, &acme(), &session)["company.name"], "Exact");

    let alias = template(json!({ "companyName": "Alias" }));
    assert_eq!(resolve(&alias, &acme(), &session)["company.name"], "Alias");

    let none = Map::new();
    assert_eq!(resolve(&none, &acme(), &session)["company.name"], "Acme Roofing");
    assert_eq!(resolve(&none, &CompanyProfile::default(), &session)["company.name"], "Session Co");
    assert_eq!(resolve(&none, &CompanyProfile::default(), &SessionContext::default())["company.name"], "");
}

#[test]
fn empty_string_is_a_value_but_null_is_absent() {
    let empty = template(json!({ "company.name": "" }));
    assert_eq!(resolve(&empty, &acme(), &SessionContext::default())["company.name"], "");

    let null = template(json!({ "company.name": null }));
    assert_eq!(resolve(&null, &acme(), &SessionContext::default())["company.name"], "Acme Roofing");
}

#[test]
fn session_supplies_job_data() {
    let session = SessionContext {
        job_address: Some("123 Main St".into()),
        job_zip: Some("33101".into()),
        roof_area_sqft: Some("2400".into()),
        ..SessionContext::default()
    };
    let fields = resolve(&template(json!({ "roofArea": "1800" })), &CompanyProfile::default(), &session);
    assert_eq!(fields["job.address"], "123 Main St");
    assert_eq!(fields["job.zip"], "33101");
    assert_eq!(fields["roof.area_sqft"], "1800");
}

#[test]
fn unknown_keys_pass_through_and_scalars_are_stringified() {
    let fields = resolve(
        &template(json!({ "permit.number": 42, "flags.hvhz": true, "x": null })),
        &CompanyProfile::default(),
        &SessionContext::default(),
    );
    assert_eq!(fields["permit.number"], "42");
    assert_eq!(fields["flags.hvhz"], "true");
    assert!(!fields.contains_key("x"));
}

#[test]
fn every_rule_key_is_present() {
    let fields = resolve(&Map::new(), &CompanyProfile::default(), &SessionContext::default());
    for key in ["company.qualifier_name", "job.city", "job.state", "roof.type", "noa.primary.number", "noa.primary.product"] {
        assert_eq!(fields.get(key).map(String::as_str), Some(""), "{key}");
    }
}

// =============================================================
// ensure_standard_layers
// =============================================================

#[test]
fn provisions_only_missing_keys_without_overlap() {
    let mut store = LayerStore::new();
    store.add(Layer::text("company.name", 1, Point::new(10.0, 10.0)));

    let created = ensure_standard_layers(&mut store, 2, &StandardGrid::default());
    assert_eq!(created.len(), STANDARD_KEYS.len() - 1);

    let positions: Vec<Point> = created.iter().filter_map(|id| store.get(id)).map(Layer::position).collect();
    for (i, a) in positions.iter().enumerate() {
        for b in &positions[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert!(created.iter().filter_map(|id| store.get(id)).all(|l| l.page == 2 && l.text_value() == Some("")));
}

#[test]
fn provisioning_is_idempotent() {
    let mut store = LayerStore::new();
    let grid = StandardGrid::default();
    ensure_standard_layers(&mut store, 1, &grid);
    assert!(ensure_standard_layers(&mut store, 1, &grid).is_empty());
    assert_eq!(store.len(), STANDARD_KEYS.len());
}

// =============================================================
// apply_fields
// =============================================================

#[test]
fn text_layers_are_only_filled_when_empty() {
    let mut fields = FieldMap::new();
    fields.insert("job.address".into(), "123 Main St".into());

    let mut empty = Layer::text("job.address", 1, Point::default());
    let mut edited = Layer::text("job.address", 1, Point::default());
    edited.kind = LayerKind::Text { value: "User typed".into(), font_size: 10.0 };

    assert_eq!(apply_fields(&fields, [&mut empty, &mut edited]), 1);
    assert_eq!(empty.text_value(), Some("123 Main St"));
    assert_eq!(edited.text_value(), Some("User typed"));
}

#[test]
fn check_layers_follow_truthiness() {
    let mut fields = FieldMap::new();
    fields.insert("flags.a".into(), "yes".into());
    fields.insert("flags.b".into(), "false".into());
    fields.insert("flags.c".into(), "0".into());

    let mut a = Layer::normalize(&json!({ "type": "check", "key": "flags.a" }));
    let mut b = Layer::normalize(&json!({ "type": "check", "key": "flags.b", "checked": true }));
    let mut c = Layer::normalize(&json!({ "type": "check", "key": "flags.c" }));
    apply_fields(&fields, [&mut a, &mut b, &mut c]);

    assert_eq!(a.checked(), Some(Some(true)));
    assert_eq!(b.checked(), Some(Some(false)));
    assert_eq!(c.checked(), Some(Some(false)));
}

#[test]
fn undecided_custom_checks_default_to_checked() {
    let fields = FieldMap::new();
    let mut custom = Layer::normalize(&json!({ "type": "check", "key": "custom.mark" }));
    let mut other = Layer::normalize(&json!({ "type": "check", "key": "flags.x" }));
    let mut decided = Layer::normalize(&json!({ "type": "check", "key": "custom.off", "checked": false }));
    apply_fields(&fields, [&mut custom, &mut other, &mut decided]);

    assert_eq!(custom.checked(), Some(Some(true)));
    assert_eq!(other.checked(), Some(None));
    assert_eq!(decided.checked(), Some(Some(false)));
}

#[test]
fn lines_are_untouched() {
    let mut fields = FieldMap::new();
    fields.insert("custom.line".into(), "anything".into());
    let mut line = Layer::line("custom.line", 1, Point::default());
    let before = line.clone();
    assert_eq!(apply_fields(&fields, [&mut line]), 0);
    assert_eq!(line, before);
}

// =============================================================
// reapply
// =============================================================

#[test]
fn reapply_seeds_company_and_job_layers() {
    let mut store = LayerStore::new();
    let session = SessionContext { job_address: Some("123 Main St".into()), ..SessionContext::default() };
    let fields = reapply(&mut store, 1, &StandardGrid::default(), &Map::new(), &acme(), &session);

    assert_eq!(fields["company.name"], "Acme Roofing");
    let value_of = |key: &str| store.layers().iter().find(|l| l.key == key).and_then(|l| l.text_value().map(str::to_owned));
    assert_eq!(value_of("company.name").as_deref(), Some("Acme Roofing"));
    assert_eq!(value_of("job.address").as_deref(), Some("123 Main St"));
    assert_eq!(value_of("company.license").as_deref(), Some("CCC-1"));
}

#[test]
fn company_profile_tolerates_extra_fields() {
    let profile: CompanyProfile = serde_json::from_value(json!({
        "company_key": "acme",
        "name": "Acme Roofing",
        "fields": { "company.name": "Acme Roofing LLC" },
    }))
    .unwrap();
    assert_eq!(profile.name.as_deref(), Some("Acme Roofing"));
    assert!(profile.extra.contains_key("fields"));
}

#[test]
fn upsert_data_carries_company_dictionary() {
    let profile = CompanyProfile {
        company_key: Some("acme".into()),
        qualifier: Some(" Jane Roe ".into()),
        extra: template(json!({ "notes": "keep", "fields": { "stale": "x" } })),
        ..acme()
    };
    let data = profile.upsert_data();

    assert_eq!(data["name"], "Acme Roofing");
    assert_eq!(data["qualifier"], "Jane Roe");
    assert_eq!(data["phone"], "");
    assert_eq!(data["notes"], "keep");
    assert!(!data.contains_key("company_key"));
    assert_eq!(data["fields"]["company.qualifier_name"], "Jane Roe");
    assert_eq!(data["fields"]["company.license"], "CCC-1");
    assert!(data["fields"].get("stale").is_none());
}
