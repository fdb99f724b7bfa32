//! Builds a [`FeatureService`] from command-line options.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use layerstore_common::{ExtensionRegistry, ExtensionRegistryBuilder, Layer};
use layerstore_core::{
    ComponentSettings, FeatureService, KeyedDataExtension, KeyedDataStore, MemoryCatalog,
    Permission, StaticAcl,
};
use layerstore_geojson::{GeoJsonLayer, GeoJsonLayerOptions};
use serde_json::Value;
use tracing::{debug, info};

/// Options shared by every command.
#[derive(Debug, Default)]
pub struct ServiceOptions {
    pub layers: Vec<PathBuf>,
    pub deny: Vec<i64>,
    pub settings: Option<PathBuf>,
    pub ext_data: Option<PathBuf>,
}

/// Loaded service plus the layers it serves, in id order.
pub struct ServiceContext {
    pub service: FeatureService,
    pub layers: Vec<Arc<dyn Layer>>,
}

/// Opens every layer file, numbering layers from 1 in argument order, and
/// assembles the service around them.
///
/// # Errors
///
/// Returns an error if a layer, the settings, or the extension data cannot be loaded.
pub async fn build(options: &ServiceOptions) -> Result<ServiceContext> {
    let mut catalog = MemoryCatalog::new();
    let mut layers: Vec<Arc<dyn Layer>> = Vec::with_capacity(options.layers.len());
    for (path, id) in options.layers.iter().zip(1..) {
        let layer = GeoJsonLayer::open(id, path, GeoJsonLayerOptions::new())
            .await
            .with_context(|| format!("Failed to open layer {}", path.display()))?;
        info!("Layer {id}: {} ({} features)", path.display(), layer.len());
        let layer: Arc<dyn Layer> = Arc::new(layer);
        catalog.insert(Arc::clone(&layer));
        layers.push(layer);
    }

    let acl = options
        .deny
        .iter()
        .fold(StaticAcl::new(), |acl, id| acl.deny(*id, Permission::DataRead));

    let registry = match &options.ext_data {
        Some(path) => load_extensions(path)?,
        None => ExtensionRegistry::empty(),
    };

    let service = FeatureService::new(Arc::new(catalog), Arc::new(acl), registry);
    let service = match &options.settings {
        Some(path) => service.with_settings(ComponentSettings::load(path)?)?,
        None => service,
    };
    debug!("Service ready: {service:?}");

    Ok(ServiceContext { service, layers })
}

/// Registers one keyed-data extension per top-level member of the file.
///
/// The file maps extension identities to `{<layer id>: {<feature id>: value}}`.
fn load_extensions(path: &Path) -> Result<ExtensionRegistry> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read extension data {}", path.display()))?;
    let data: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse extension data {}", path.display()))?;
    let identities = data
        .as_object()
        .ok_or_else(|| anyhow!("Extension data must be a JSON object keyed by identity"))?;

    let mut builder = ExtensionRegistryBuilder::new();
    for (identity, per_layer) in identities {
        let store = Arc::new(KeyedDataStore::new());
        let per_layer = per_layer
            .as_object()
            .ok_or_else(|| anyhow!("Extension '{identity}' data must be keyed by layer id"))?;
        for (layer_id, values) in per_layer {
            let layer_id: i64 = layer_id
                .parse()
                .with_context(|| format!("Extension '{identity}': '{layer_id}' is not a layer id"))?;
            let count = store.load_layer(layer_id, values)?;
            debug!("Extension '{identity}': {count} value(s) for layer {layer_id}");
        }
        builder.register(Arc::new(KeyedDataExtension::new(identity.as_str(), store).displayed()))?;
    }
    Ok(builder.freeze())
}
