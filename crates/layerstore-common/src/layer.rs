//! Layer contract that backends implement.
//!
//! Every layer has an integer id. Layers that hold features additionally
//! expose the [`FeatureLayer`] capability through [`Layer::as_feature_layer`];
//! callers check the capability instead of inspecting concrete types.

use async_trait::async_trait;

use crate::capabilities::QueryCapabilities;
use crate::error::QueryError;
use crate::model::{FieldDescriptor, LayerFieldsPatch};
use crate::query::{FeatureQuery, FeatureSet};

/// A resource addressable by id that may or may not hold features.
pub trait Layer: Send + Sync {
    /// Returns the layer id.
    fn id(&self) -> i64;

    /// Returns the human readable name of the layer.
    fn display_name(&self) -> &str;

    /// Returns the feature-layer capability, if this layer provides it.
    fn as_feature_layer(&self) -> Option<&dyn FeatureLayer> {
        None
    }
}

/// Capability of a layer that stores features and can query them.
#[async_trait]
pub trait FeatureLayer: Send + Sync {
    /// Returns the id of the layer this capability belongs to.
    fn layer_id(&self) -> i64;

    /// Returns the field descriptors in display order.
    fn fields(&self) -> Vec<FieldDescriptor>;

    /// Returns the id of the field used to build feature labels.
    fn feature_label_field_id(&self) -> Option<i64>;

    /// Returns the optional query features this backend honours.
    fn capabilities(&self) -> QueryCapabilities;

    /// Returns a fresh query for this layer.
    fn feature_query(&self) -> FeatureQuery {
        FeatureQuery::new()
    }

    /// Executes `query` and returns the matching window with its total count.
    ///
    /// With an id filter the result holds at most one feature.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] if a filter cannot be honoured or execution fails.
    async fn execute(&self, query: &FeatureQuery) -> Result<FeatureSet, QueryError>;

    /// Applies an administrative edit to the field descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::ReadOnly`] unless the backend supports edits.
    fn update_fields(&self, patch: &LayerFieldsPatch) -> Result<(), QueryError> {
        let _ = patch;
        Err(QueryError::ReadOnly {
            layer_id: self.layer_id(),
        })
    }
}
