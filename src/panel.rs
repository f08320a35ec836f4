//! Property panel: two-way binding between the selected layer and its inputs.
//!
//! [`PanelView`] is what the inputs show; [`PanelField::patch`] turns one
//! edited input back into a [`LayerPatch`]. The single "size" input edits font
//! size, box size or stroke thickness depending on the layer type.

#[cfg(test)]
#[path = "panel_test.rs"]
mod panel_test;

use crate::layer::{Layer, LayerId, LayerPatch, LayerType};

/// Editable inputs of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelField {
    Key,
    X,
    Y,
    Page,
    Size,
}

impl PanelField {
    pub const ALL: [PanelField; 5] = [Self::Key, Self::X, Self::Y, Self::Page, Self::Size];

    /// DOM id of the input bound to this field.
    #[must_use]
    pub fn input_id(self) -> &'static str {
        match self {
            Self::Key => "layerKey",
            Self::X => "layerX",
            Self::Y => "layerY",
            Self::Page => "layerPage",
            Self::Size => "layerFont",
        }
    }

    /// Patch for an edit of this field, or `None` when the text is not a usable value.
    #[must_use]
    pub fn patch(self, input: &str) -> Option<LayerPatch> {
        let mut patch = LayerPatch::default();
        match self {
            Self::Key => patch.key = Some(input.trim().to_owned()),
            Self::X => patch.x = Some(parse_number(input)?),
            Self::Y => patch.y = Some(parse_number(input)?),
            Self::Page => patch.page = Some(parse_page(input)?),
            Self::Size => patch.size = Some(parse_number(input).filter(|v| *v > 0.0)?),
        }
        Some(patch)
    }
}

/// Values shown by the panel for the selected layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub id: LayerId,
    pub layer_type: LayerType,
    pub key: String,
    pub x: f64,
    pub y: f64,
    pub page: u32,
    pub size: f64,
}

impl PanelView {
    #[must_use]
    pub fn from_layer(layer: &Layer) -> Self {
        Self {
            id: layer.id.clone(),
            layer_type: layer.layer_type(),
            key: layer.key.clone(),
            x: layer.x,
            y: layer.y,
            page: layer.page,
            size: layer.size_value(),
        }
    }

    /// Text for one input.
    #[must_use]
    pub fn text(&self, field: PanelField) -> String {
        match field {
            PanelField::Key => self.key.clone(),
            PanelField::X => self.x.to_string(),
            PanelField::Y => self.y.to_string(),
            PanelField::Page => self.page.to_string(),
            PanelField::Size => self.size.to_string(),
        }
    }

    /// Label for the size input.
    #[must_use]
    pub fn size_label(&self) -> &'static str {
        match self.layer_type {
            LayerType::Text => "Font size",
            LayerType::Check => "Box size",
            LayerType::Line => "Thickness",
        }
    }
}

fn parse_number(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().into_iter().find(|v| v.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_page(input: &str) -> Option<u32> {
    let n = parse_number(input)?.trunc();
    if n < 1.0 {
        return None;
    }
    Some(n.min(f64::from(u32::MAX)) as u32)
}
