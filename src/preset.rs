//! Named presets of user-authored layers, scoped per document.
//!
//! A preset is a snapshot of the `custom.*` layers of one document, stored
//! under `pf_actions::{city}::{form}`. Saving under an existing name
//! replaces that preset. Applying clones every saved layer with a fresh id
//! onto the page currently shown, so one preset can stamp several pages.

#[cfg(test)]
#[path = "preset_test.rs"]
mod preset_test;

use serde::{Deserialize, Serialize};

use crate::context::DocumentContext;
use crate::error::EditorError;
use crate::layer::{Layer, LayerId};
use crate::storage::{ScopedStore, load_json, save_json};
use crate::store::LayerStore;

/// Scope prefix for preset lists.
pub const PRESET_SCOPE: &str = "pf_actions";

/// A named snapshot of custom layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// Reads and writes preset lists through a [`ScopedStore`].
#[derive(Debug, Default)]
pub struct PresetManager<S> {
    store: S,
}

impl<S: ScopedStore> PresetManager<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every preset saved for `doc`. Corrupt lists read as empty.
    #[must_use]
    pub fn list(&self, doc: &DocumentContext) -> Vec<Preset> {
        load_json(&self.store, &doc.scope_key(PRESET_SCOPE))
    }

    /// Preset names for `doc`, in save order.
    #[must_use]
    pub fn names(&self, doc: &DocumentContext) -> Vec<String> {
        self.list(doc).into_iter().map(|p| p.name).collect()
    }

    /// Snapshot the `custom.*` layers among `layers` under `name`.
    ///
    /// Returns how many layers were saved.
    ///
    /// # Errors
    ///
    /// Fails on a blank name, when there are no custom layers, or when the
    /// write fails.
    pub fn save<'a>(
        &mut self,
        doc: &DocumentContext,
        name: &str,
        layers: impl IntoIterator<Item = &'a Layer>,
    ) -> Result<usize, EditorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditorError::EmptyPresetName);
        }
        let custom: Vec<Layer> = layers.into_iter().filter(|l| l.is_custom()).cloned().collect();
        if custom.is_empty() {
            return Err(EditorError::NoCustomLayers);
        }
        let count = custom.len();

        let mut presets = self.list(doc);
        presets.retain(|p| p.name != name);
        presets.push(Preset { name: name.to_owned(), layers: custom });
        save_json(&mut self.store, &doc.scope_key(PRESET_SCOPE), &presets)?;

        tracing::info!(preset = name, layers = count, city = %doc.city, form = %doc.form, "preset saved");
        Ok(count)
    }

    /// Stamp preset `name` onto `page` of `target`, with fresh ids.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::PresetNotFound`] when no such preset exists.
    pub fn apply(
        &self,
        doc: &DocumentContext,
        name: &str,
        target: &mut LayerStore,
        page: u32,
    ) -> Result<Vec<LayerId>, EditorError> {
        let name = name.trim();
        let preset = self
            .list(doc)
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| EditorError::PresetNotFound(name.to_owned()))?;

        let ids: Vec<LayerId> = preset
            .layers
            .into_iter()
            .map(|mut layer| {
                layer.id = LayerId::generate();
                layer.page = page.max(1);
                target.add(layer)
            })
            .collect();
        tracing::info!(preset = name, layers = ids.len(), page, "preset applied");
        Ok(ids)
    }

    /// Delete preset `name`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn remove(&mut self, doc: &DocumentContext, name: &str) -> Result<bool, EditorError> {
        let name = name.trim();
        let mut presets = self.list(doc);
        let before = presets.len();
        presets.retain(|p| p.name != name);
        if presets.len() == before {
            return Ok(false);
        }
        save_json(&mut self.store, &doc.scope_key(PRESET_SCOPE), &presets)?;
        Ok(true)
    }
}
