//! Feature extension registry.
//!
//! Extensions attach auxiliary data to features and contribute sub-widgets to
//! the feature edit form without the engine knowing their shape. Extension
//! types are registered once at startup on an [`ExtensionRegistryBuilder`],
//! which is then frozen into an immutable [`ExtensionRegistry`] shared by
//! every component for the life of the process.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use layerstore_common::{
//!     ExtensionError, ExtensionFactory, ExtensionRegistryBuilder, Feature, FeatureExtension,
//!     FeatureLayer, WidgetDescriptor,
//! };
//!
//! struct Echo;
//!
//! impl FeatureExtension for Echo {
//!     fn feature_data(&self, feature: &Feature) -> Result<serde_json::Value, ExtensionError> {
//!         Ok(serde_json::json!(feature.id))
//!     }
//!
//!     fn feature_widget(&self) -> WidgetDescriptor {
//!         WidgetDescriptor::new("echo/Widget")
//!     }
//! }
//!
//! struct EchoFactory;
//!
//! impl ExtensionFactory for EchoFactory {
//!     fn identity(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn bind(&self, _layer: &dyn FeatureLayer) -> Box<dyn FeatureExtension> {
//!         Box::new(Echo)
//!     }
//! }
//!
//! let mut builder = ExtensionRegistryBuilder::new();
//! builder.register(Arc::new(EchoFactory)).unwrap();
//! assert!(builder.register(Arc::new(EchoFactory)).is_err());
//!
//! let registry = builder.freeze();
//! assert_eq!(registry.identities(), vec!["echo"]);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ExtensionError, RegistryError};
use crate::layer::FeatureLayer;
use crate::model::Feature;

/// Client-side widget reference contributed to an edit form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetDescriptor {
    /// Client module implementing the widget.
    pub module: String,
    /// Parameters passed to the widget.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl WidgetDescriptor {
    /// Creates a widget reference without parameters.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            params: Value::Null,
        }
    }

    /// Sets the widget parameters.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// An extension instance bound to one layer.
pub trait FeatureExtension: Send + Sync {
    /// Returns this extension's auxiliary data for `feature`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtensionError`] if the data cannot be produced.
    fn feature_data(&self, feature: &Feature) -> Result<Value, ExtensionError>;

    /// Returns the sub-widget this extension contributes to the edit form.
    fn feature_widget(&self) -> WidgetDescriptor;
}

/// A registered extension type.
pub trait ExtensionFactory: Send + Sync {
    /// Returns the globally unique identity of the extension.
    fn identity(&self) -> &str;

    /// Returns whether clients should display the extension's widget.
    fn display_widget(&self) -> bool {
        false
    }

    /// Creates an extension instance bound to `layer`.
    fn bind(&self, layer: &dyn FeatureLayer) -> Box<dyn FeatureExtension>;
}

/// Mutable registry used during startup.
#[derive(Default)]
pub struct ExtensionRegistryBuilder {
    factories: Vec<Arc<dyn ExtensionFactory>>,
}

impl ExtensionRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateIdentity`] if an extension with the
    /// same identity is already registered.
    pub fn register(
        &mut self,
        factory: Arc<dyn ExtensionFactory>,
    ) -> Result<&mut Self, RegistryError> {
        let identity = factory.identity();
        if self.factories.iter().any(|f| f.identity() == identity) {
            return Err(RegistryError::DuplicateIdentity {
                identity: identity.to_string(),
            });
        }
        self.factories.push(factory);
        Ok(self)
    }

    /// Closes registration.
    #[must_use]
    pub fn freeze(self) -> ExtensionRegistry {
        ExtensionRegistry {
            factories: self.factories.into(),
        }
    }
}

/// Immutable registry of extension types, in registration order.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct ExtensionRegistry {
    factories: Arc<[Arc<dyn ExtensionFactory>]>,
}

impl ExtensionRegistry {
    /// Returns a registry without extensions.
    #[must_use]
    pub fn empty() -> Self {
        ExtensionRegistryBuilder::new().freeze()
    }

    /// Returns the number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no extension is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Iterates over the registered extension types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ExtensionFactory>> {
        self.factories.iter()
    }

    /// Returns the identities in registration order.
    #[must_use]
    pub fn identities(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.identity()).collect()
    }

    /// Looks up an extension type by identity.
    #[must_use]
    pub fn find(&self, identity: &str) -> Option<&Arc<dyn ExtensionFactory>> {
        self.factories.iter().find(|f| f.identity() == identity)
    }

    /// Instantiates every registered extension bound to `layer`, in
    /// registration order.
    #[must_use]
    pub fn bind_all(&self, layer: &dyn FeatureLayer) -> Vec<(&str, Box<dyn FeatureExtension>)> {
        self.factories
            .iter()
            .map(|f| (f.identity(), f.bind(layer)))
            .collect()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("identities", &self.identities())
            .finish()
    }
}
