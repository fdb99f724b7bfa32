//! Feature and field value types exchanged between layer backends and the engine.
//!
//! Features are produced by a backend in response to a query and are read-only
//! from the engine's point of view. Field values are kept as JSON scalars in an
//! ordered map so the backend's field order survives to the response.

use geo_types::{Geometry, Rect};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Ordered mapping from field key to value.
pub type JsonObject = Map<String, Value>;

/// Geometry-derived extent of a feature.
///
/// Serialized as a four-number array `[minx, miny, maxx, maxy]`.
///
/// # Examples
///
/// ```
/// use layerstore_common::FeatureBox;
///
/// let extent = FeatureBox::new(1.0, 2.0, 3.0, 4.0);
/// assert_eq!(extent.bounds(), [1.0, 2.0, 3.0, 4.0]);
/// assert_eq!(serde_json::to_string(&extent).unwrap(), "[1.0,2.0,3.0,4.0]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureBox {
    /// Minimum x coordinate.
    pub min_x: f64,
    /// Minimum y coordinate.
    pub min_y: f64,
    /// Maximum x coordinate.
    pub max_x: f64,
    /// Maximum y coordinate.
    pub max_y: f64,
}

impl FeatureBox {
    /// Creates an extent from its four bounds.
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Returns the extent as `[minx, miny, maxx, maxy]`.
    #[must_use]
    pub fn bounds(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl From<Rect<f64>> for FeatureBox {
    fn from(rect: Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self::new(min.x, min.y, max.x, max.y)
    }
}

impl Serialize for FeatureBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bounds().serialize(serializer)
    }
}

/// A single record of a feature layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifier, unique and stable within the owning layer.
    pub id: i64,
    /// Display string.
    pub label: String,
    /// Field values keyed by field keyname, in layer field order.
    pub fields: JsonObject,
    /// Feature geometry, if the layer is spatial.
    pub geometry: Option<Geometry<f64>>,
    /// Extent of the geometry; populated only when the query requested boxes.
    pub bbox: Option<FeatureBox>,
}

impl Feature {
    /// Creates a feature without fields or geometry.
    #[must_use]
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            fields: JsonObject::new(),
            geometry: None,
            bbox: None,
        }
    }

    /// Replaces the field values.
    #[must_use]
    pub fn with_fields(mut self, fields: JsonObject) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: Geometry<f64>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Returns the value of a single field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Data type of a layer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    /// Free text.
    String,
    /// Whole number.
    Integer,
    /// Floating point number.
    Real,
    /// True or false.
    Boolean,
}

impl FieldType {
    /// Returns the string representation used in listings.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Real => "REAL",
            FieldType::Boolean => "BOOLEAN",
        }
    }
}

/// Per-field metadata exposed by a feature layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field identifier, unique within the layer.
    pub id: i64,
    /// Key under which values of this field appear in [`Feature::fields`].
    pub keyname: String,
    /// Human readable name.
    pub display_name: String,
    /// Value type.
    pub datatype: FieldType,
    /// Whether the field is shown in feature tables.
    pub grid_visibility: bool,
}

impl FieldDescriptor {
    /// Creates a visible field whose display name equals its keyname.
    #[must_use]
    pub fn new(id: i64, keyname: impl Into<String>, datatype: FieldType) -> Self {
        let keyname = keyname.into();
        Self {
            id,
            display_name: keyname.clone(),
            keyname,
            datatype,
            grid_visibility: true,
        }
    }
}

/// Change to a single field descriptor. Absent attributes are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    /// Identifier of the field to change.
    pub id: i64,
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New grid visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_visibility: Option<bool>,
}

/// Administrative edit of a layer's field descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerFieldsPatch {
    /// New label field; `None` leaves the label field unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_label_field_id: Option<i64>,
    /// Per-field changes. Patches for unknown field ids are ignored.
    #[serde(default)]
    pub fields: Vec<FieldPatch>,
}

impl LayerFieldsPatch {
    /// Applies the field changes to `fields` in place and returns how many
    /// descriptors were touched.
    pub fn apply_to(&self, fields: &mut [FieldDescriptor]) -> usize {
        let mut touched = 0;
        for descriptor in fields.iter_mut() {
            let Some(patch) = self.fields.iter().find(|p| p.id == descriptor.id) else {
                continue;
            };
            if let Some(display_name) = &patch.display_name {
                descriptor.display_name.clone_from(display_name);
            }
            if let Some(grid_visibility) = patch.grid_visibility {
                descriptor.grid_visibility = grid_visibility;
            }
            touched += 1;
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    #[test]
    fn feature_box_from_rect() {
        let rect = Rect::new(coord! { x: 3.0, y: 4.0 }, coord! { x: 1.0, y: 2.0 });
        assert_eq!(FeatureBox::from(rect).bounds(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn field_descriptor_defaults() {
        let field = FieldDescriptor::new(7, "name", FieldType::String);
        assert_eq!(field.display_name, "name");
        assert!(field.grid_visibility);

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["datatype"], "STRING");
        assert_eq!(json["grid_visibility"], true);
    }

    #[test]
    fn fields_patch_leaves_absent_attributes() {
        let mut fields = vec![
            FieldDescriptor::new(1, "name", FieldType::String),
            FieldDescriptor::new(2, "pop", FieldType::Integer),
        ];
        let patch = LayerFieldsPatch {
            feature_label_field_id: None,
            fields: vec![
                FieldPatch {
                    id: 2,
                    display_name: Some("Population".to_string()),
                    grid_visibility: None,
                },
                FieldPatch {
                    id: 99,
                    display_name: Some("ghost".to_string()),
                    grid_visibility: Some(false),
                },
            ],
        };

        assert_eq!(patch.apply_to(&mut fields), 1);
        assert_eq!(fields[0].display_name, "name");
        assert_eq!(fields[1].display_name, "Population");
        assert!(fields[1].grid_visibility);
    }

    #[test]
    fn fields_patch_deserializes_partial_entries() {
        let patch: LayerFieldsPatch =
            serde_json::from_str(r#"{"fields": [{"id": 1, "grid_visibility": false}]}"#).unwrap();
        assert_eq!(patch.feature_label_field_id, None);
        assert_eq!(patch.fields[0].grid_visibility, Some(false));
        assert_eq!(patch.fields[0].display_name, None);
    }
}
