//! Resolution of layer ids to layers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use layerstore_common::Layer;

use crate::error::AccessError;

/// Resolves layer ids to layers.
pub trait LayerCatalog: Send + Sync {
    /// Returns the layer with the given id.
    fn layer(&self, id: i64) -> Option<Arc<dyn Layer>>;

    /// Returns the layer with the given id or a `LayerNotFound` error.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::LayerNotFound`] if the id does not resolve.
    fn resolve(&self, id: i64) -> Result<Arc<dyn Layer>, AccessError> {
        self.layer(id)
            .ok_or(AccessError::LayerNotFound { layer_id: id })
    }
}

/// Catalog holding layers in memory, keyed by layer id.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    layers: BTreeMap<i64, Arc<dyn Layer>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer, returning the layer it replaced under the same id.
    pub fn insert(&mut self, layer: Arc<dyn Layer>) -> Option<Arc<dyn Layer>> {
        self.layers.insert(layer.id(), layer)
    }

    /// Adds a layer and returns the catalog.
    #[must_use]
    pub fn with(mut self, layer: Arc<dyn Layer>) -> Self {
        self.insert(layer);
        self
    }

    /// Iterates over the layers in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Layer>> {
        self.layers.values()
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the catalog holds no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl LayerCatalog for MemoryCatalog {
    fn layer(&self, id: i64) -> Option<Arc<dyn Layer>> {
        self.layers.get(&id).cloned()
    }
}

impl fmt::Debug for MemoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCatalog")
            .field("layers", &self.layers.keys().collect::<Vec<_>>())
            .finish()
    }
}
