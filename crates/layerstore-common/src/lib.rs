//! Common types and traits shared across `layerstore` crates.
//!
//! This crate holds the contract between the query engine (`layerstore-core`)
//! and layer backends such as `layerstore-geojson`: the feature model, the
//! query builder and its result, the layer capability traits, and the feature
//! extension registry.

pub mod capabilities;
pub mod error;
pub mod extension;
pub mod layer;
pub mod model;
pub mod query;

// Re-export commonly used types
pub use capabilities::{QueryCapabilities, SupportStatus};
pub use error::{ExtensionError, QueryError, RegistryError};
pub use extension::{
    ExtensionFactory, ExtensionRegistry, ExtensionRegistryBuilder, FeatureExtension,
    WidgetDescriptor,
};
pub use layer::{FeatureLayer, Layer};
pub use model::{
    Feature, FeatureBox, FieldDescriptor, FieldPatch, FieldType, JsonObject, LayerFieldsPatch,
};
pub use query::{FeatureQuery, FeatureSet, SpatialFilter, Window};
