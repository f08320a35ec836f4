//! In-memory layer store.
//!
//! Holds every live layer in insertion order together with the active
//! selection. All entries are normalized on the way in and are in raster
//! space. Each mutation bumps [`LayerStore::revision`], which the session
//! uses to decide when the overlay needs a full redraw.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use serde_json::Value;

use crate::layer::{Layer, LayerId, LayerPatch};

/// Ordered store of layers plus the current selection.
#[derive(Debug, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
    selected: Option<LayerId>,
    revision: u64,
}

impl LayerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store with normalized copies of `layers`.
    ///
    /// The first layer becomes the selection, or nothing when empty.
    pub fn set_all<I>(&mut self, layers: I)
    where
        I: IntoIterator<Item = Layer>,
    {
        self.layers = layers.into_iter().map(|l| l.normalized()).collect();
        self.selected = self.layers.first().map(|l| l.id.clone());
        self.touch();
        tracing::debug!(count = self.layers.len(), "layer store replaced");
    }

    /// [`LayerStore::set_all`] over loosely shaped JSON records.
    pub fn set_all_raw(&mut self, records: &[Value]) {
        self.set_all(records.iter().map(Layer::normalize));
    }

    /// Normalize and append. Selection is left alone.
    pub fn add(&mut self, layer: Layer) -> LayerId {
        let layer = layer.normalized();
        let id = layer.id.clone();
        self.layers.push(layer);
        self.touch();
        id
    }

    /// Remove a layer by id, returning it if it was present.
    ///
    /// When the removed layer was selected, selection falls back to the new
    /// first entry.
    pub fn remove(&mut self, id: &LayerId) -> Option<Layer> {
        let index = self.layers.iter().position(|l| &l.id == id)?;
        let removed = self.layers.remove(index);
        if self.selected.as_ref() == Some(id) {
            self.selected = self.layers.first().map(|l| l.id.clone());
        }
        self.touch();
        Some(removed)
    }

    /// Apply a partial update to one layer. Returns false if the id is unknown.
    pub fn mutate(&mut self, id: &LayerId, patch: &LayerPatch) -> bool {
        let Some(layer) = self.layers.iter_mut().find(|l| &l.id == id) else {
            return false;
        };
        patch.apply_to(layer);
        self.touch();
        true
    }

    /// Mutate a layer in place through a closure. Returns false if the id is unknown.
    pub fn update<F>(&mut self, id: &LayerId, f: F) -> bool
    where
        F: FnOnce(&mut Layer),
    {
        let Some(layer) = self.layers.iter_mut().find(|l| &l.id == id) else {
            return false;
        };
        f(layer);
        self.touch();
        true
    }

    /// Set the active selection. Unknown ids clear it.
    pub fn select(&mut self, id: Option<&LayerId>) {
        let next = id.filter(|id| self.contains(id)).cloned();
        if next != self.selected {
            self.selected = next;
            self.touch();
        }
    }

    /// Id of the selected layer, if any.
    #[must_use]
    pub fn selected_id(&self) -> Option<&LayerId> {
        self.selected.as_ref()
    }

    /// The selected layer, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&Layer> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &LayerId) -> bool {
        self.get(id).is_some()
    }

    /// Whether any layer is bound to `key`.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.layers.iter().any(|l| l.key == key)
    }

    /// All layers in insertion order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Mutable access to every layer, for bulk value application.
    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.touch();
        self.layers.iter_mut()
    }

    /// Layers anchored to `page`, in insertion order.
    pub fn on_page(&self, page: u32) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(move |l| l.page == page)
    }

    /// Layers in the `custom.` namespace.
    pub fn custom_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.is_custom())
    }

    /// Monotonic counter bumped by every mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of layers currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the store contains no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
