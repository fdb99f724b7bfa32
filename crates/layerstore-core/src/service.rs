//! The feature service: entry point for every feature operation.
//!
//! A [`FeatureService`] bundles the collaborators an operation needs (layer
//! catalog, authorizer, frozen extension registry, settings). It holds no
//! per-request state and can be shared freely between requests.

use std::fmt;
use std::sync::Arc;

use layerstore_common::{ExtensionRegistry, FeatureLayer, Layer};

use crate::access::{Authorizer, Permission, Principal};
use crate::catalog::LayerCatalog;
use crate::error::{AccessError, ConfigError};
use crate::settings::{ClientSettings, ComponentSettings, client_settings};

/// Capability name reported when a layer holds no features.
pub(crate) const FEATURE_LAYER_CAPABILITY: &str = "feature layer";

/// Feature operations over a catalog of layers.
#[derive(Clone)]
pub struct FeatureService {
    pub(crate) catalog: Arc<dyn LayerCatalog>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) registry: ExtensionRegistry,
    pub(crate) settings: ComponentSettings,
}

impl FeatureService {
    /// Creates a service with default settings.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn LayerCatalog>,
        authorizer: Arc<dyn Authorizer>,
        registry: ExtensionRegistry,
    ) -> Self {
        Self {
            catalog,
            authorizer,
            registry,
            settings: ComponentSettings::default(),
        }
    }

    /// Replaces the settings after validating them.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the settings are invalid.
    pub fn with_settings(mut self, settings: ComponentSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    /// Returns the extension registry.
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &ComponentSettings {
        &self.settings
    }

    /// Returns the client capability descriptor.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        client_settings(&self.registry, &self.settings)
    }

    /// Resolves a layer id.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::LayerNotFound`] if the id does not resolve.
    pub fn layer(&self, layer_id: i64) -> Result<Arc<dyn Layer>, AccessError> {
        self.catalog.resolve(layer_id)
    }

    /// Returns the feature-layer capability of `layer` if `principal` holds
    /// `permission`; both failures reject the whole operation.
    pub(crate) fn feature_layer<'l>(
        &self,
        layer: &'l dyn Layer,
        principal: &Principal,
        permission: Permission,
    ) -> Result<&'l dyn FeatureLayer, AccessError> {
        if !self.authorizer.has_permission(layer, principal, permission) {
            return Err(AccessError::Forbidden {
                layer_id: layer.id(),
                permission,
            });
        }
        layer
            .as_feature_layer()
            .ok_or(AccessError::NotImplemented {
                layer_id: layer.id(),
                capability: FEATURE_LAYER_CAPABILITY,
            })
    }
}

impl fmt::Debug for FeatureService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureService")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
