//! Edit form composition and administrative field edits.

use layerstore_common::{FeatureLayer, LayerFieldsPatch, WidgetDescriptor};
use log::info;
use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::json;

use crate::access::{Permission, Principal};
use crate::error::{AccessError, InputError, Result};
use crate::service::FeatureService;

/// Name of the core sub-widget editing feature fields.
pub const FEATURE_LAYER_WIDGET: &str = "feature_layer";

const FIELDS_WIDGET_MODULE: &str = "feature_layer/LayerFieldsWidget";
const WRITE_CAPABILITY: &str = "field edits";

/// Edit form of one layer: named sub-widgets in display order.
///
/// Serializes as an object whose key order is the display order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeWidget {
    /// `(name, widget)` pairs; the core field widget comes first.
    pub subwidgets: Vec<(String, WidgetDescriptor)>,
}

impl CompositeWidget {
    /// Returns the sub-widget names in display order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.subwidgets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Returns a sub-widget by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WidgetDescriptor> {
        self.subwidgets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, widget)| widget)
    }
}

impl Serialize for CompositeWidget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.subwidgets.len()))?;
        for (name, widget) in &self.subwidgets {
            map.serialize_entry(name, widget)?;
        }
        map.end()
    }
}

impl FeatureService {
    /// Composes the feature edit form of a layer: the field widget followed by
    /// one sub-widget per registered extension, in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not resolve, the caller may not
    /// write to it, or it holds no features.
    pub fn compose_edit_widget(&self, principal: &Principal, layer_id: i64) -> Result<CompositeWidget> {
        let layer = self.layer(layer_id)?;
        let features = self.feature_layer(layer.as_ref(), principal, Permission::DataWrite)?;

        let mut subwidgets = vec![(FEATURE_LAYER_WIDGET.to_string(), fields_widget(features))];
        subwidgets.extend(
            self.registry
                .bind_all(features)
                .into_iter()
                .map(|(identity, ext)| (identity.to_string(), ext.feature_widget())),
        );
        Ok(CompositeWidget { subwidgets })
    }

    /// Applies an administrative edit to a layer's field descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Forbidden`] without `data-write`,
    /// [`AccessError::NotImplemented`] if the layer cannot be edited, and
    /// [`InputError::UnknownLabelField`] if the label field does not exist.
    pub fn update_fields(
        &self,
        principal: &Principal,
        layer_id: i64,
        patch: &LayerFieldsPatch,
    ) -> Result<()> {
        let layer = self.layer(layer_id)?;
        let features = self.feature_layer(layer.as_ref(), principal, Permission::DataWrite)?;
        if !features.capabilities().write.is_supported() {
            return Err(AccessError::NotImplemented {
                layer_id,
                capability: WRITE_CAPABILITY,
            }
            .into());
        }

        if let Some(field_id) = patch.feature_label_field_id
            && !features.fields().iter().any(|f| f.id == field_id)
        {
            return Err(InputError::UnknownLabelField { layer_id, field_id }.into());
        }

        features.update_fields(patch)?;
        info!(
            "Layer {layer_id}: updated {} field descriptor(s) for {principal}",
            patch.fields.len()
        );
        Ok(())
    }
}

fn fields_widget(layer: &dyn FeatureLayer) -> WidgetDescriptor {
    WidgetDescriptor::new(FIELDS_WIDGET_MODULE).with_params(json!({
        "layerId": layer.layer_id(),
        "fields": layer.fields(),
        "featureLabelFieldId": layer.feature_label_field_id(),
    }))
}
