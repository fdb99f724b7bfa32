//! Display utilities for formatting CLI output.
//!
//! Tables are used for layer and field listings; every other command prints
//! JSON so that its output can be piped into other tools.

use std::sync::Arc;

use anyhow::Result;
use layerstore_common::{FieldDescriptor, Layer};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Table row representation for displaying layer information.
#[derive(Tabled)]
pub struct LayerRow {
    /// Layer id, as used by every other command.
    #[tabled(rename = "Id")]
    pub id: i64,
    /// Human readable layer name.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Support status of intersection filters.
    #[tabled(rename = "Spatial")]
    pub spatial: String,
    /// Support status of substring filters.
    #[tabled(rename = "Like")]
    pub like: String,
    /// Support status of bounding boxes.
    #[tabled(rename = "Box")]
    pub bbox: String,
    /// Support status of field descriptor edits.
    #[tabled(rename = "Write")]
    pub write: String,
}

impl LayerRow {
    fn from_layer(layer: &dyn Layer) -> Self {
        let (spatial, like, bbox, write) = match layer.as_feature_layer() {
            Some(features) => {
                let caps = features.capabilities();
                (
                    caps.spatial.as_str().to_string(),
                    caps.like.as_str().to_string(),
                    caps.bbox.as_str().to_string(),
                    caps.write.as_str().to_string(),
                )
            },
            None => ("N/A".into(), "N/A".into(), "N/A".into(), "N/A".into()),
        };
        Self {
            id: layer.id(),
            name: layer.display_name().to_string(),
            spatial,
            like,
            bbox,
            write,
        }
    }
}

/// Table row representation for displaying field descriptors.
#[derive(Tabled)]
pub struct FieldRow {
    /// Field id, referenced by field edits.
    #[tabled(rename = "Id")]
    pub id: i64,
    /// Key of the field in feature payloads.
    #[tabled(rename = "Keyname")]
    pub keyname: String,
    /// Name shown to users.
    #[tabled(rename = "Display Name")]
    pub display_name: String,
    /// Data type of the field.
    #[tabled(rename = "Type")]
    pub datatype: String,
    /// Shown in feature tables.
    #[tabled(rename = "Grid")]
    pub grid: String,
    /// Marks the label field.
    #[tabled(rename = "Label")]
    pub label: String,
}

/// Renders the layer table.
#[must_use]
pub fn layer_table(layers: &[Arc<dyn Layer>]) -> String {
    let rows: Vec<LayerRow> = layers
        .iter()
        .map(|layer| LayerRow::from_layer(layer.as_ref()))
        .collect();
    Table::new(rows).to_string()
}

/// Renders the field table, marking the label field.
#[must_use]
pub fn field_table(fields: &[FieldDescriptor], label_field: Option<i64>) -> String {
    let rows: Vec<FieldRow> = fields
        .iter()
        .map(|f| FieldRow {
            id: f.id,
            keyname: f.keyname.clone(),
            display_name: f.display_name.clone(),
            datatype: f.datatype.as_str().to_string(),
            grid: if f.grid_visibility { "Yes" } else { "No" }.to_string(),
            label: if label_field == Some(f.id) { "*" } else { "" }.to_string(),
        })
        .collect();
    Table::new(rows).to_string()
}

/// Prints a value as pretty JSON on standard output.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
