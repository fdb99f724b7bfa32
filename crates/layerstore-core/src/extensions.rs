//! Feature extension composition and the keyed-data extension.
//!
//! [`feature_extension_data`] builds the `ext` member of a single feature
//! response: one entry per registered extension, keyed by identity. A failing
//! extension contributes an `{"error": ...}` entry; the others and the core
//! feature payload are unaffected.
//!
//! [`KeyedDataExtension`] is a general purpose extension storing one JSON
//! value per `(layer id, feature id)`, such as a feature description.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use layerstore_common::{
    ExtensionError, ExtensionFactory, ExtensionRegistry, Feature, FeatureExtension, FeatureLayer,
    JsonObject, WidgetDescriptor,
};
use log::warn;
use serde_json::{Value, json};

/// Collects every registered extension's data for `feature`.
#[must_use]
pub fn feature_extension_data(
    registry: &ExtensionRegistry,
    layer: &dyn FeatureLayer,
    feature: &Feature,
) -> JsonObject {
    let mut ext = JsonObject::new();
    for (identity, extension) in registry.bind_all(layer) {
        let value = match extension.feature_data(feature) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Extension '{identity}' failed for feature {} of layer {}: {}",
                    feature.id,
                    layer.layer_id(),
                    e.message
                );
                json!({ "error": e.message })
            },
        };
        ext.insert(identity.to_string(), value);
    }
    ext
}

/// JSON values keyed by `(layer id, feature id)`, shared between an extension
/// type and whoever maintains the data.
#[derive(Debug, Default)]
pub struct KeyedDataStore {
    entries: RwLock<HashMap<(i64, i64), Value>>,
}

impl KeyedDataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for a feature, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn set(&self, layer_id: i64, feature_id: i64, value: Value) -> anyhow::Result<Option<Value>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("keyed data store lock poisoned"))?;
        Ok(entries.insert((layer_id, feature_id), value))
    }

    /// Returns the value stored for a feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn get(&self, layer_id: i64, feature_id: i64) -> anyhow::Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("keyed data store lock poisoned"))?;
        Ok(entries.get(&(layer_id, feature_id)).cloned())
    }

    /// Loads the values of one layer from a JSON object keyed by feature id.
    ///
    /// Returns the number of stored values.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not an object, a key is not an integer
    /// feature id, or the store lock is poisoned.
    pub fn load_layer(&self, layer_id: i64, data: &Value) -> anyhow::Result<usize> {
        let object = data
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("extension data for layer {layer_id} is not an object"))?;
        for (key, value) in object {
            let feature_id: i64 = key.parse().map_err(|_| {
                anyhow::anyhow!("extension data key '{key}' of layer {layer_id} is not a feature id")
            })?;
            self.set(layer_id, feature_id, value.clone())?;
        }
        Ok(object.len())
    }
}

/// Extension type exposing a [`KeyedDataStore`] under a fixed identity.
#[derive(Debug, Clone)]
pub struct KeyedDataExtension {
    identity: String,
    widget_module: String,
    display_widget: bool,
    store: Arc<KeyedDataStore>,
}

impl KeyedDataExtension {
    /// Creates an extension type serving `store` under `identity`.
    #[must_use]
    pub fn new(identity: impl Into<String>, store: Arc<KeyedDataStore>) -> Self {
        let identity = identity.into();
        Self {
            widget_module: format!("{identity}/EditorWidget"),
            identity,
            display_widget: false,
            store,
        }
    }

    /// Marks the extension's widget for display in clients.
    #[must_use]
    pub fn displayed(mut self) -> Self {
        self.display_widget = true;
        self
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<KeyedDataStore> {
        &self.store
    }
}

impl ExtensionFactory for KeyedDataExtension {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn display_widget(&self) -> bool {
        self.display_widget
    }

    fn bind(&self, layer: &dyn FeatureLayer) -> Box<dyn FeatureExtension> {
        Box::new(BoundKeyedData {
            identity: self.identity.clone(),
            widget_module: self.widget_module.clone(),
            layer_id: layer.layer_id(),
            store: Arc::clone(&self.store),
        })
    }
}

struct BoundKeyedData {
    identity: String,
    widget_module: String,
    layer_id: i64,
    store: Arc<KeyedDataStore>,
}

impl FeatureExtension for BoundKeyedData {
    fn feature_data(&self, feature: &Feature) -> Result<Value, ExtensionError> {
        self.store
            .get(self.layer_id, feature.id)
            .map(Option::unwrap_or_default)
            .map_err(|e| ExtensionError::new(&self.identity, e.to_string()))
    }

    fn feature_widget(&self) -> WidgetDescriptor {
        WidgetDescriptor::new(&self.widget_module).with_params(json!({ "layerId": self.layer_id }))
    }
}
