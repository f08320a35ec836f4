//! Layer model: the positioned annotations drawn over a document page.
//!
//! A [`Layer`] is a tagged union over the three annotation types. Records
//! arriving from the network, from presets, or from the host page are loosely
//! shaped JSON; [`Layer::normalize`] is the single place that turns such a
//! record into a fully-populated layer, filling every missing or unusable
//! attribute with its type default. Normalization is idempotent: a layer
//! serialized with [`Layer::to_value`] normalizes back to itself.
//!
//! Positions held here are always raster-space pixels.

#[cfg(test)]
#[path = "layer_test.rs"]
mod layer_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::consts::{
    CUSTOM_CHECK_KEY, CUSTOM_LINE_KEY, CUSTOM_PREFIX, CUSTOM_TEXT_KEY, DEFAULT_CHECK_SIZE, DEFAULT_FONT_SIZE,
    DEFAULT_LAYER_X, DEFAULT_LAYER_Y, DEFAULT_LINE_LENGTH, DEFAULT_LINE_THICKNESS,
};
use crate::transform::Point;

/// Opaque, immutable layer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Fresh identifier that cannot collide with any live layer.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The annotation variant of a layer, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Text,
    Check,
    Line,
}

impl LayerType {
    /// Wire name (`"text"`, `"check"`, `"line"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Check => "check",
            Self::Line => "line",
        }
    }

    /// Key given to a layer of this type when none was supplied.
    #[must_use]
    pub fn sentinel_key(self) -> &'static str {
        match self {
            Self::Text => CUSTOM_TEXT_KEY,
            Self::Check => CUSTOM_CHECK_KEY,
            Self::Line => CUSTOM_LINE_KEY,
        }
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("check") => Self::Check,
            Some("line") => Self::Line,
            Some("text") | None => Self::Text,
            Some(other) => {
                tracing::warn!(layer_type = other, "unknown layer type; treating as text");
                Self::Text
            }
        }
    }
}

/// Explicit two-endpoint geometry for a line, in the same space as its layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Segment {
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self { x1: self.x1 + dx, y1: self.y1 + dy, x2: self.x2 + dx, y2: self.y2 + dy }
    }
}

/// Type-specific payload of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Text {
        value: String,
        font_size: f64,
    },
    Check {
        /// `None` until something (a field value or the user) decides it.
        checked: Option<bool>,
        size: f64,
    },
    Line {
        length: f64,
        thickness: f64,
        /// Present when the source supplied explicit endpoints.
        endpoints: Option<Segment>,
    },
}

impl LayerKind {
    #[must_use]
    pub fn layer_type(&self) -> LayerType {
        match self {
            Self::Text { .. } => LayerType::Text,
            Self::Check { .. } => LayerType::Check,
            Self::Line { .. } => LayerType::Line,
        }
    }

    /// Type default payload.
    #[must_use]
    pub fn default_for(layer_type: LayerType) -> Self {
        match layer_type {
            LayerType::Text => Self::Text { value: String::new(), font_size: DEFAULT_FONT_SIZE },
            LayerType::Check => Self::Check { checked: None, size: DEFAULT_CHECK_SIZE },
            LayerType::Line => Self::Line { length: DEFAULT_LINE_LENGTH, thickness: DEFAULT_LINE_THICKNESS, endpoints: None },
        }
    }
}

/// A positioned annotation anchored to one document page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct Layer {
    pub id: LayerId,
    /// Dotted logical field name, e.g. `company.name`.
    pub key: String,
    /// 1-indexed page number.
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub kind: LayerKind,
}

impl Layer {
    /// New layer of `layer_type` with type defaults and a fresh id.
    #[must_use]
    pub fn new(layer_type: LayerType, key: &str, page: u32, at: Point) -> Self {
        let key = if key.trim().is_empty() { layer_type.sentinel_key() } else { key };
        Self {
            id: LayerId::generate(),
            key: key.to_owned(),
            page: page.max(1),
            x: at.x,
            y: at.y,
            kind: LayerKind::default_for(layer_type),
        }
    }

    /// Empty `text` layer bound to `key`.
    #[must_use]
    pub fn text(key: &str, page: u32, at: Point) -> Self {
        Self::new(LayerType::Text, key, page, at)
    }

    /// User-authored check layer; starts checked.
    #[must_use]
    pub fn check(key: &str, page: u32, at: Point) -> Self {
        let mut layer = Self::new(LayerType::Check, key, page, at);
        if let LayerKind::Check { checked, .. } = &mut layer.kind {
            *checked = Some(true);
        }
        layer
    }

    #[must_use]
    pub fn line(key: &str, page: u32, at: Point) -> Self {
        Self::new(LayerType::Line, key, page, at)
    }

    /// Build a layer from a loosely shaped record, filling every gap with the
    /// type default.
    #[must_use]
    pub fn normalize(raw: &Value) -> Self {
        let props = RawProps::new(raw);
        let layer_type = LayerType::parse(props.str("type"));

        let id = props.id().unwrap_or_else(LayerId::generate);
        let key = props
            .str("key")
            .filter(|k| !k.is_empty())
            .unwrap_or(layer_type.sentinel_key())
            .to_owned();
        let page = props.page().unwrap_or(1);
        let x = props.number("x").unwrap_or(DEFAULT_LAYER_X);
        let y = props.number("y").unwrap_or(DEFAULT_LAYER_Y);

        let kind = match layer_type {
            LayerType::Text => LayerKind::Text {
                value: props.str("value").unwrap_or_default().to_owned(),
                font_size: props
                    .positive("font_size")
                    .or_else(|| props.positive("fontSize"))
                    .unwrap_or(DEFAULT_FONT_SIZE),
            },
            LayerType::Check => LayerKind::Check {
                checked: props.bool("checked"),
                size: props.positive("size").unwrap_or(DEFAULT_CHECK_SIZE),
            },
            LayerType::Line => LayerKind::Line {
                length: props.positive("length").unwrap_or(DEFAULT_LINE_LENGTH),
                thickness: props
                    .positive("thickness")
                    .or_else(|| props.positive("width"))
                    .unwrap_or(DEFAULT_LINE_THICKNESS),
                endpoints: props.segment(),
            },
        };

        Self { id, key, page, x, y, kind }
    }

    /// Re-run normalization over an existing layer.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self::normalize(&self.to_value())
    }

    /// Canonical JSON form; the inverse of [`Layer::normalize`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), json!(self.id.as_str()));
        map.insert("type".into(), json!(self.layer_type().as_str()));
        map.insert("key".into(), json!(self.key));
        map.insert("page".into(), json!(self.page));
        map.insert("x".into(), json!(self.x));
        map.insert("y".into(), json!(self.y));
        match &self.kind {
            LayerKind::Text { value, font_size } => {
                map.insert("value".into(), json!(value));
                map.insert("font_size".into(), json!(font_size));
            }
            LayerKind::Check { checked, size } => {
                if let Some(checked) = checked {
                    map.insert("checked".into(), json!(checked));
                }
                map.insert("size".into(), json!(size));
            }
            LayerKind::Line { length, thickness, endpoints } => {
                map.insert("length".into(), json!(length));
                map.insert("thickness".into(), json!(thickness));
                if let Some(seg) = endpoints {
                    map.insert("x1".into(), json!(seg.x1));
                    map.insert("y1".into(), json!(seg.y1));
                    map.insert("x2".into(), json!(seg.x2));
                    map.insert("y2".into(), json!(seg.y2));
                }
            }
        }
        Value::Object(map)
    }

    #[must_use]
    pub fn layer_type(&self) -> LayerType {
        self.kind.layer_type()
    }

    /// Whether the key lives in the user-authored `custom.` namespace.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.key.starts_with(CUSTOM_PREFIX)
    }

    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Move the anchor; explicit line endpoints travel with it.
    pub fn move_to(&mut self, to: Point) {
        let (dx, dy) = (to.x - self.x, to.y - self.y);
        self.x = to.x;
        self.y = to.y;
        if let LayerKind::Line { endpoints: Some(seg), .. } = &mut self.kind {
            *seg = seg.translated(dx, dy);
        }
    }

    /// The type's primary size: font size, box size, or stroke thickness.
    #[must_use]
    pub fn size_value(&self) -> f64 {
        match &self.kind {
            LayerKind::Text { font_size, .. } => *font_size,
            LayerKind::Check { size, .. } => *size,
            LayerKind::Line { thickness, .. } => *thickness,
        }
    }

    /// Set the primary size. Non-positive or non-finite values are ignored.
    pub fn set_size_value(&mut self, value: f64) {
        if !(value.is_finite() && value > 0.0) {
            return;
        }
        match &mut self.kind {
            LayerKind::Text { font_size, .. } => *font_size = value,
            LayerKind::Check { size, .. } => *size = value,
            LayerKind::Line { thickness, .. } => *thickness = value,
        }
    }

    /// Text value, if this is a text layer.
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        match &self.kind {
            LayerKind::Text { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Checked state, if this is a check layer.
    #[must_use]
    pub fn checked(&self) -> Option<Option<bool>> {
        match &self.kind {
            LayerKind::Check { checked, .. } => Some(*checked),
            _ => None,
        }
    }
}

impl From<Value> for Layer {
    fn from(value: Value) -> Self {
        Self::normalize(&value)
    }
}

impl From<Layer> for Value {
    fn from(layer: Layer) -> Self {
        layer.to_value()
    }
}

/// Sparse update for a layer. Only present fields are applied; attributes that
/// do not exist on the layer's type are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Font size, box size or thickness depending on the layer type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

impl LayerPatch {
    /// Patch that only moves the layer.
    #[must_use]
    pub fn position(to: Point) -> Self {
        Self { x: Some(to.x), y: Some(to.y), ..Self::default() }
    }

    /// Apply to `layer`, keeping every normalization guarantee intact.
    pub fn apply_to(&self, layer: &mut Layer) {
        if let Some(key) = &self.key {
            layer.key = if key.is_empty() { layer.layer_type().sentinel_key().to_owned() } else { key.clone() };
        }
        if let Some(page) = self.page {
            layer.page = page.max(1);
        }
        let x = self.x.filter(|v| v.is_finite()).unwrap_or(layer.x);
        let y = self.y.filter(|v| v.is_finite()).unwrap_or(layer.y);
        layer.move_to(Point::new(x, y));
        if let Some(size) = self.size {
            layer.set_size_value(size);
        }
        match &mut layer.kind {
            LayerKind::Text { value, .. } => {
                if let Some(v) = &self.value {
                    value.clone_from(v);
                }
            }
            LayerKind::Check { checked, .. } => {
                if self.checked.is_some() {
                    *checked = self.checked;
                }
            }
            LayerKind::Line { length, .. } => {
                if let Some(len) = self.length.filter(|v| v.is_finite() && *v > 0.0) {
                    *length = len;
                }
            }
        }
    }
}

/// Typed, forgiving access to a loosely shaped layer record.
struct RawProps<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> RawProps<'a> {
    fn new(value: &'a Value) -> Self {
        Self { map: value.as_object() }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(name))
    }

    fn str(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(Value::as_str)
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64).filter(|v| v.is_finite())
    }

    fn positive(&self, name: &str) -> Option<f64> {
        self.number(name).filter(|v| *v > 0.0)
    }

    fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    fn id(&self) -> Option<LayerId> {
        match self.get("id")? {
            Value::String(s) if !s.is_empty() => Some(LayerId(s.clone())),
            Value::Number(n) => Some(LayerId(n.to_string())),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn page(&self) -> Option<u32> {
        let page = self.number("page")?.trunc();
        if page < 1.0 {
            return None;
        }
        Some(page.min(f64::from(u32::MAX)) as u32)
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment {
            x1: self.number("x1")?,
            y1: self.number("y1")?,
            x2: self.number("x2")?,
            y2: self.number("y2")?,
        })
    }
}
