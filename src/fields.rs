//! Field resolution: merging template values, the company profile and the
//! session into one flat map, then pushing that map into the layers.
//!
//! Resolution order for a rule key is: the template's value under the key
//! itself, then each template alias, then the company profile, then the
//! session, then `""`. Only absent (or JSON `null`) values fall through; an
//! empty string is a value and wins. Keys without a rule pass through from
//! the template unchanged.
//!
//! The three steps run in a fixed order whenever data is (re)applied:
//! [`resolve`], [`ensure_standard_layers`], [`apply_fields`].

#[cfg(test)]
#[path = "fields_test.rs"]
mod fields_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::StandardGrid;
use crate::context::SessionContext;
use crate::layer::{Layer, LayerId, LayerKind};
use crate::store::LayerStore;

/// Resolved dotted key → string value.
pub type FieldMap = BTreeMap<String, String>;

/// Keys provisioned as text layers when data is applied.
pub const STANDARD_KEYS: [&str; 7] = [
    "job.address",
    "job.zip",
    "roof.category",
    "roof.area_sqft",
    "company.name",
    "company.license",
    "company.address",
];

/// Company record as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Everything else the service stores (notably the `company.*` dictionary).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy)]
enum CompanyAttr {
    Name,
    License,
    Qualifier,
    Address,
    Phone,
    Email,
}

impl CompanyProfile {
    /// Upsert body for this profile: the plain attributes plus the
    /// `company.*` dictionary under `fields`, so the service can fill
    /// documents without knowing the attribute names.
    #[must_use]
    pub fn upsert_data(&self) -> Map<String, Value> {
        let mut data = self.extra.clone();
        let mut fields = Map::new();
        for rule in RULES {
            let Some(attr) = rule.company else {
                continue;
            };
            let value = self.attr(attr).unwrap_or_default().trim().to_owned();
            data.insert(attr.name().to_owned(), Value::String(value.clone()));
            fields.insert(rule.key.to_owned(), Value::String(value));
        }
        data.insert("fields".to_owned(), Value::Object(fields));
        data
    }

    fn attr(&self, attr: CompanyAttr) -> Option<&str> {
        match attr {
            CompanyAttr::Name => self.name.as_deref(),
            CompanyAttr::License => self.license.as_deref(),
            CompanyAttr::Qualifier => self.qualifier.as_deref(),
            CompanyAttr::Address => self.address.as_deref(),
            CompanyAttr::Phone => self.phone.as_deref(),
            CompanyAttr::Email => self.email.as_deref(),
        }
    }
}

impl CompanyAttr {
    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::License => "license",
            Self::Qualifier => "qualifier",
            Self::Address => "address",
            Self::Phone => "phone",
            Self::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SessionAttr {
    CompanyName,
    CompanyLicense,
    CompanyQualifier,
    CompanyAddress,
    CompanyPhone,
    CompanyEmail,
    JobAddress,
    JobZip,
    RoofCategory,
    RoofAreaSqft,
}

fn session_attr(session: &SessionContext, attr: SessionAttr) -> Option<&str> {
    match attr {
        SessionAttr::CompanyName => session.company_name.as_deref(),
        SessionAttr::CompanyLicense => session.company_license.as_deref(),
        SessionAttr::CompanyQualifier => session.company_qualifier.as_deref(),
        SessionAttr::CompanyAddress => session.company_address.as_deref(),
        SessionAttr::CompanyPhone => session.company_phone.as_deref(),
        SessionAttr::CompanyEmail => session.company_email.as_deref(),
        SessionAttr::JobAddress => session.job_address.as_deref(),
        SessionAttr::JobZip => session.job_zip.as_deref(),
        SessionAttr::RoofCategory => session.roof_category.as_deref(),
        SessionAttr::RoofAreaSqft => session.roof_area_sqft.as_deref(),
    }
}

struct FieldRule {
    key: &'static str,
    aliases: &'static [&'static str],
    company: Option<CompanyAttr>,
    session: Option<SessionAttr>,
}

const fn rule(
    key: &'static str,
    aliases: &'static [&'static str],
    company: Option<CompanyAttr>,
    session: Option<SessionAttr>,
) -> FieldRule {
    FieldRule { key, aliases, company, session }
}

#[rustfmt::skip]
const RULES: &[FieldRule] = &[
    rule("company.name", &["name", "companyName"], Some(CompanyAttr::Name), Some(SessionAttr::CompanyName)),
    rule("company.license", &["license", "companyLicense"], Some(CompanyAttr::License), Some(SessionAttr::CompanyLicense)),
    rule("company.qualifier_name", &["qualifier", "companyQualifier"], Some(CompanyAttr::Qualifier), Some(SessionAttr::CompanyQualifier)),
    rule("company.address", &["address", "companyAddress"], Some(CompanyAttr::Address), Some(SessionAttr::CompanyAddress)),
    rule("company.phone", &["phone", "companyPhone"], Some(CompanyAttr::Phone), Some(SessionAttr::CompanyPhone)),
    rule("company.email", &["email", "companyEmail"], Some(CompanyAttr::Email), Some(SessionAttr::CompanyEmail)),
    rule("job.address", &["jobAddress", "address_job"], None, Some(SessionAttr::JobAddress)),
    rule("job.city", &["jobCity"], None, None),
    rule("job.state", &["jobState"], None, None),
    rule("job.zip", &["jobZip"], None, Some(SessionAttr::JobZip)),
    rule("roof.category", &["roofCategory"], None, Some(SessionAttr::RoofCategory)),
    rule("roof.type", &["roofType"], None, None),
    rule("roof.area_sqft", &["roofArea", "areaSqft"], None, Some(SessionAttr::RoofAreaSqft)),
    rule("noa.primary.number", &["noaNumber"], None, None),
    rule("noa.primary.product", &["noaProduct"], None, None),
];

/// String form of a template value; `null` counts as absent.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Merge template fields, company profile and session into one map.
#[must_use]
pub fn resolve(template: &Map<String, Value>, company: &CompanyProfile, session: &SessionContext) -> FieldMap {
    let from_template = |name: &str| template.get(name).and_then(value_text);

    let mut out: FieldMap = template
        .iter()
        .filter_map(|(k, v)| value_text(v).map(|s| (k.clone(), s)))
        .collect();

    for rule in RULES {
        let value = from_template(rule.key)
            .or_else(|| rule.aliases.iter().find_map(|a| from_template(*a)))
            .or_else(|| rule.company.and_then(|a| company.attr(a)).map(str::to_owned))
            .or_else(|| rule.session.and_then(|a| session_attr(session, a)).map(str::to_owned))
            .unwrap_or_default();
        out.insert(rule.key.to_owned(), value);
    }
    out
}

/// Add an empty text layer on `page` for every standard key the store lacks.
///
/// New layers are laid out on `grid` in the order they are created, so they
/// never share a position with each other. Returns the ids created.
pub fn ensure_standard_layers(store: &mut LayerStore, page: u32, grid: &StandardGrid) -> Vec<LayerId> {
    let missing: Vec<&str> = STANDARD_KEYS.iter().copied().filter(|k| !store.has_key(k)).collect();
    let created: Vec<LayerId> = missing
        .iter()
        .enumerate()
        .map(|(n, key)| store.add(Layer::text(key, page, grid.slot(n))))
        .collect();
    if !created.is_empty() {
        tracing::debug!(count = created.len(), page, "provisioned standard layers");
    }
    created
}

/// Truthiness of a resolved value for a check layer.
fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty() || v == "false" || v == "0")
}

/// Push resolved values into `layers`.
///
/// Text layers are only filled while empty, so user edits survive a
/// re-apply. Check layers follow a non-empty value; without one, an
/// undecided `custom.*` check becomes checked. Lines are untouched.
/// Returns how many layers changed.
pub fn apply_fields<'a, I>(fields: &FieldMap, layers: I) -> usize
where
    I: IntoIterator<Item = &'a mut Layer>,
{
    let mut changed = 0;
    for layer in layers {
        let custom = layer.is_custom();
        let incoming = fields.get(&layer.key);
        match &mut layer.kind {
            LayerKind::Text { value, .. } => {
                if !value.trim().is_empty() {
                    continue;
                }
                if let Some(v) = incoming.filter(|v| v.as_str() != value.as_str()) {
                    value.clone_from(v);
                    changed += 1;
                }
            }
            LayerKind::Check { checked, .. } => match incoming.filter(|v| !v.trim().is_empty()) {
                Some(v) => {
                    let next = Some(is_truthy(v));
                    if *checked != next {
                        *checked = next;
                        changed += 1;
                    }
                }
                None if checked.is_none() && custom => {
                    *checked = Some(true);
                    changed += 1;
                }
                None => {}
            },
            LayerKind::Line { .. } => {}
        }
    }
    changed
}

/// Resolve, provision and apply in one pass against `store`.
///
/// Returns the resolved map so callers can display it.
pub fn reapply(
    store: &mut LayerStore,
    page: u32,
    grid: &StandardGrid,
    template: &Map<String, Value>,
    company: &CompanyProfile,
    session: &SessionContext,
) -> FieldMap {
    let fields = resolve(template, company, session);
    ensure_standard_layers(store, page, grid);
    let changed = apply_fields(&fields, store.layers_mut());
    tracing::info!(fields = fields.len(), changed, "applied field values");
    fields
}
