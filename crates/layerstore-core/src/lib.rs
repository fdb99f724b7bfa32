//! `layerstore-core` is the feature query engine of the `layerstore` project.
//!
//! It serves the feature-level operations of a vector layer store on top of
//! the layer contract in `layerstore-common`:
//! - **Store operations**: paginated feature listing with field projection,
//!   single feature retrieval with extension data, field descriptors.
//! - **Identify**: concurrent, per-layer capped intersection search over many
//!   layers, degrading per layer on denied access or missing capabilities.
//! - **Edit composition**: the feature edit form and field descriptor edits.
//! - **Request translation**: transport hints (range, field list and prefix,
//!   box flag, substring filter) to queries and query results back to
//!   paginated responses.
//!
//! Everything is reached through [`FeatureService`].

pub mod access;
pub mod catalog;
pub mod edit;
pub mod error;
pub mod extensions;
pub mod identify;
pub mod request;
pub mod service;
pub mod settings;
pub mod store;
pub mod translator;

#[cfg(test)]
mod test_support;

pub use access::{AllowAll, Authorizer, Permission, Principal, StaticAcl};
pub use catalog::{LayerCatalog, MemoryCatalog};
pub use edit::CompositeWidget;
pub use error::{AccessError, ConfigError, InputError, LayerStoreError, Result};
pub use extensions::{KeyedDataExtension, KeyedDataStore};
pub use identify::{IdentifyRequest, IdentifyResult, LayerOutcome};
pub use request::{ItemRequest, StoreRequest};
pub use service::FeatureService;
pub use settings::{ClientSettings, ComponentSettings, IdentifySettings};
pub use store::FeatureSummary;
pub use translator::{ContentRange, StoreResponse};
