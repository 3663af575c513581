use crate::{
    layers::base::{LayerRevision, LayerTrait},
    prelude::HashMap,
    MapError, Result,
};
use std::sync::Arc;

/// Ordered layer collection of a map
///
/// Layers are shared handles, so the host can keep its own clone and keep
/// mutating the layer after adding it. Render order is by z-index; layers
/// with equal z-index keep their insertion order.
#[derive(Default)]
pub struct LayerCollection {
    /// All layers indexed by ID
    layers: HashMap<String, Arc<dyn LayerTrait>>,
    /// Layer IDs in insertion order
    insertion_order: Vec<String>,
}

impl LayerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer; ids must be unique within the collection
    pub fn add(&mut self, layer: Arc<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        if self.layers.contains_key(&layer_id) {
            return Err(MapError::Layer(format!("duplicate layer id '{layer_id}'")).into());
        }

        log::debug!("added layer '{layer_id}' ({})", layer.layer_type());
        self.layers.insert(layer_id.clone(), layer);
        self.insertion_order.push(layer_id);
        Ok(())
    }

    /// Removes a layer and hands it back to the caller
    pub fn remove(&mut self, layer_id: &str) -> Option<Arc<dyn LayerTrait>> {
        let layer = self.layers.remove(layer_id)?;
        self.insertion_order.retain(|id| id != layer_id);
        log::debug!("removed layer '{layer_id}'");
        Some(layer)
    }

    pub fn get(&self, layer_id: &str) -> Option<Arc<dyn LayerTrait>> {
        self.layers.get(layer_id).cloned()
    }

    /// Returns the concrete layer behind `layer_id`
    pub fn get_as<T: 'static + Clone>(&self, layer_id: &str) -> Option<T> {
        self.layers
            .get(layer_id)
            .and_then(|layer| layer.as_any().downcast_ref::<T>())
            .cloned()
    }

    /// Lists all layer IDs in insertion order
    pub fn list_layers(&self) -> Vec<String> {
        self.insertion_order.clone()
    }

    /// All layers in render order
    pub fn layers(&self) -> Vec<Arc<dyn LayerTrait>> {
        let mut layers: Vec<_> = self
            .insertion_order
            .iter()
            .filter_map(|id| self.layers.get(id).cloned())
            .collect();
        // sort_by_key is stable, equal z-indices keep insertion order
        layers.sort_by_key(|layer| layer.z_index());
        layers
    }

    /// Revision of every layer, keyed by id, in insertion order
    pub fn revisions(&self) -> Vec<(String, LayerRevision)> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.layers.get(id).map(|layer| (id.clone(), layer.revision())))
            .collect()
    }

    /// Disposes and removes every layer
    pub fn clear(&mut self) {
        for layer in self.layers.values() {
            layer.dispose();
        }
        self.layers.clear();
        self.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Debug for LayerCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerCollection")
            .field("layers", &self.insertion_order)
            .finish()
    }
}
