//! In-memory feature layer backed by a `GeoJSON` document.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use geo::{BoundingRect, Intersects};
use geo_types::Geometry;
use layerstore_common::{
    Feature, FeatureBox, FeatureLayer, FeatureQuery, FeatureSet, FieldDescriptor, FieldType,
    JsonObject, Layer, LayerFieldsPatch, QueryCapabilities, QueryError,
};
use log::{debug, info};
use serde_json::Value;

use crate::error::{GeoJsonReadError, GeoJsonResult};
use crate::parser::{FeatureRecord, parse_geojson_bytes};
use crate::schema::infer_fields;

/// Spatial reference of `GeoJSON` coordinates (WGS 84).
pub const GEOJSON_SRID: i32 = 4326;

/// Options controlling how a `GeoJSON` document becomes a layer.
#[derive(Debug, Clone)]
pub struct GeoJsonLayerOptions {
    /// Human readable layer name. Defaults to the file stem when opening a file.
    pub display_name: Option<String>,
    /// Spatial reference of the coordinates.
    pub srid: i32,
    /// Keyname of the field used for feature labels.
    pub label_field: Option<String>,
}

impl Default for GeoJsonLayerOptions {
    fn default() -> Self {
        Self {
            display_name: None,
            srid: GEOJSON_SRID,
            label_field: None,
        }
    }
}

impl GeoJsonLayerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = srid;
        self
    }

    #[must_use]
    pub fn with_label_field(mut self, keyname: impl Into<String>) -> Self {
        self.label_field = Some(keyname.into());
        self
    }
}

#[derive(Debug, Clone)]
struct StoredFeature {
    id: i64,
    properties: JsonObject,
    geometry: Option<Geometry<f64>>,
}

/// Feature layer holding every feature of a `GeoJSON` document in memory.
///
/// Honours id, field, window, bounding box, substring and intersection
/// filters, whatever the document holds: a feature without geometry never
/// intersects and has no box. Field descriptors and the label field can be edited; the
/// features themselves are immutable.
#[derive(Debug)]
pub struct GeoJsonLayer {
    id: i64,
    display_name: String,
    srid: i32,
    features: Vec<StoredFeature>,
    fields: RwLock<Vec<FieldDescriptor>>,
    label_field: RwLock<Option<i64>>,
}

impl GeoJsonLayer {
    /// Reads a `GeoJSON` file into a layer.
    ///
    /// # Errors
    ///
    /// Returns [`GeoJsonReadError::Io`] if the file cannot be read and
    /// [`GeoJsonReadError::Parse`] if it is not `GeoJSON`.
    pub async fn open(
        id: i64,
        path: impl AsRef<Path>,
        mut options: GeoJsonLayerOptions,
    ) -> GeoJsonResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| GeoJsonReadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if options.display_name.is_none() {
            options.display_name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_owned);
        }
        Self::from_bytes(id, &bytes, &path.display().to_string(), options)
    }

    /// Parses an in-memory `GeoJSON` document into a layer.
    ///
    /// # Errors
    ///
    /// Returns [`GeoJsonReadError::Parse`] if `bytes` is not `GeoJSON`.
    pub fn from_bytes(
        id: i64,
        bytes: &[u8],
        context: &str,
        options: GeoJsonLayerOptions,
    ) -> GeoJsonResult<Self> {
        let records = parse_geojson_bytes(bytes, context)?;
        Ok(Self::from_records(id, records, options))
    }

    /// Builds a layer from parsed records.
    ///
    /// Document ids are kept when every record carries a distinct integer
    /// id; otherwise features are numbered from 1 in document order.
    #[must_use]
    pub fn from_records(id: i64, records: Vec<FeatureRecord>, options: GeoJsonLayerOptions) -> Self {
        let fields = infer_fields(&records);
        let label_field = resolve_label_field(&fields, options.label_field.as_deref());

        let mut seen = HashSet::new();
        let keep_ids = records
            .iter()
            .all(|record| record.id.is_some_and(|fid| seen.insert(fid)));
        if !keep_ids {
            debug!("Layer {id}: numbering features in document order");
        }

        let features: Vec<StoredFeature> = records
            .into_iter()
            .zip(1..)
            .map(|(record, index)| StoredFeature {
                id: record.id.filter(|_| keep_ids).unwrap_or(index),
                properties: record.properties,
                geometry: record.geometry,
            })
            .collect();

        info!(
            "Layer {id}: loaded {} features with {} fields",
            features.len(),
            fields.len()
        );

        Self {
            id,
            display_name: options.display_name.unwrap_or_else(|| format!("layer {id}")),
            srid: options.srid,
            features,
            fields: RwLock::new(fields),
            label_field: RwLock::new(label_field),
        }
    }

    /// Returns the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the layer has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns the spatial reference of the layer's coordinates.
    #[must_use]
    pub fn srid(&self) -> i32 {
        self.srid
    }

    fn label_key(&self, fields: &[FieldDescriptor]) -> Option<String> {
        let label_field = (*self.label_field.read().unwrap_or_else(PoisonError::into_inner))?;
        fields
            .iter()
            .find(|f| f.id == label_field)
            .map(|f| f.keyname.clone())
    }
}

fn materialize(
    stored: &StoredFeature,
    query: &FeatureQuery,
    fields: &[FieldDescriptor],
    label_key: Option<&str>,
) -> Feature {
    let values: JsonObject = fields
        .iter()
        .filter(|f| query.selects(&f.keyname))
        .map(|f| {
            let value = stored.properties.get(&f.keyname).cloned();
            (f.keyname.clone(), value.unwrap_or(Value::Null))
        })
        .collect();

    let mut feature = Feature::new(stored.id, label(stored, label_key)).with_fields(values);
    if let Some(geometry) = &stored.geometry {
        if query.box_requested() {
            feature.bbox = geometry.bounding_rect().map(FeatureBox::from);
        }
        feature = feature.with_geometry(geometry.clone());
    }
    feature
}

fn resolve_label_field(fields: &[FieldDescriptor], keyname: Option<&str>) -> Option<i64> {
    match keyname {
        Some(keyname) => fields.iter().find(|f| f.keyname == keyname).map(|f| f.id),
        None => fields
            .iter()
            .find(|f| f.datatype == FieldType::String)
            .map(|f| f.id),
    }
}

fn label(stored: &StoredFeature, label_key: Option<&str>) -> String {
    match label_key.and_then(|key| stored.properties.get(key)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => format!("#{}", stored.id),
        Some(other) => other.to_string(),
    }
}

/// Case-insensitive substring match over the label and every string value.
fn matches_like(stored: &StoredFeature, label: &str, pattern: &str) -> bool {
    label.to_lowercase().contains(pattern)
        || stored
            .properties
            .values()
            .filter_map(Value::as_str)
            .any(|s| s.to_lowercase().contains(pattern))
}

impl Layer for GeoJsonLayer {
    fn id(&self) -> i64 {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn as_feature_layer(&self) -> Option<&dyn FeatureLayer> {
        Some(self)
    }
}

#[async_trait]
impl FeatureLayer for GeoJsonLayer {
    fn layer_id(&self) -> i64 {
        self.id
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn feature_label_field_id(&self) -> Option<i64> {
        *self.label_field.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn capabilities(&self) -> QueryCapabilities {
        QueryCapabilities::spatial()
    }

    async fn execute(&self, query: &FeatureQuery) -> Result<FeatureSet, QueryError> {
        self.capabilities().check(self.id, query)?;
        if let Some(filter) = query.spatial_filter()
            && filter.srid != self.srid
        {
            return Err(QueryError::Reprojection {
                layer_id: self.id,
                from: filter.srid,
                to: self.srid,
            });
        }

        let fields = self.fields();
        if let Some(keys) = query.field_keys()
            && let Some(unknown) = keys.iter().find(|k| !fields.iter().any(|f| &f.keyname == *k))
        {
            return Err(QueryError::UnknownField {
                layer_id: self.id,
                field: unknown.clone(),
            });
        }
        let label_key = self.label_key(&fields);
        let pattern = query.like_pattern().map(str::to_lowercase);

        let matching: Vec<&StoredFeature> = self
            .features
            .iter()
            .filter(|f| query.id_filter().is_none_or(|id| f.id == id))
            .filter(|f| {
                pattern
                    .as_deref()
                    .is_none_or(|p| matches_like(f, &label(f, label_key.as_deref()), p))
            })
            .filter(|f| {
                query.spatial_filter().is_none_or(|s| {
                    f.geometry
                        .as_ref()
                        .is_some_and(|g| g.intersects(&s.geometry))
                })
            })
            .collect();

        let total = matching.len();
        let window = match query.window() {
            Some(window) => window.slice(&matching),
            None => &matching[..],
        };
        debug!(
            "Layer {}: {total} matching features, returning {}",
            self.id,
            window.len()
        );

        let features = window
            .iter()
            .map(|f| materialize(f, query, &fields, label_key.as_deref()))
            .collect();
        Ok(FeatureSet::new(features, total))
    }

    fn update_fields(&self, patch: &LayerFieldsPatch) -> Result<(), QueryError> {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(label_field) = patch.feature_label_field_id {
            if !fields.iter().any(|f| f.id == label_field) {
                return Err(QueryError::UnknownField {
                    layer_id: self.id,
                    field: label_field.to_string(),
                });
            }
            *self.label_field.write().unwrap_or_else(PoisonError::into_inner) = Some(label_field);
        }
        let touched = patch.apply_to(&mut fields);
        info!("Layer {}: edited {touched} field descriptor(s)", self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Point, Polygon, polygon};
    use layerstore_common::FieldPatch;

    const CITIES: &[u8] = br#"{
  "type": "FeatureCollection",
  "features": [
    {"type":"Feature","id":10,"geometry":{"type":"Point","coordinates":[1.0,1.0]},"properties":{"name":"Porto","population":230000}},
    {"type":"Feature","id":20,"geometry":{"type":"Point","coordinates":[5.0,5.0]},"properties":{"name":"Lisbon","population":545000}},
    {"type":"Feature","id":30,"geometry":{"type":"LineString","coordinates":[[20.0,20.0],[22.0,24.0]]},"properties":{"name":"Road","population":null}}
  ]
}"#;

    fn cities() -> GeoJsonLayer {
        GeoJsonLayer::from_bytes(1, CITIES, "cities", GeoJsonLayerOptions::new()).unwrap()
    }

    fn square(size: f64) -> Geometry<f64> {
        let poly: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: size, y: 0.0),
            (x: size, y: size),
            (x: 0.0, y: size),
            (x: 0.0, y: 0.0),
        ];
        Geometry::Polygon(poly)
    }

    #[tokio::test]
    async fn document_ids_and_labels() {
        let layer = cities();
        let result = layer.execute(&FeatureQuery::new()).await.unwrap();
        let ids: Vec<i64> = result.features().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(result.features()[0].label, "Porto");
        assert_eq!(layer.feature_label_field_id(), Some(1));
        assert_eq!(layer.display_name(), "layer 1");
    }

    #[tokio::test]
    async fn intersects_filters_geometries() {
        let layer = cities();
        let query = FeatureQuery::new().intersects(square(2.0), GEOJSON_SRID);
        let result = layer.execute(&query).await.unwrap();
        assert_eq!(result.total_count(), 1);
        assert_eq!(result.features()[0].id, 10);

        let query = FeatureQuery::new().intersects(Geometry::Point(Point::new(21.0, 22.0)), 4326);
        assert_eq!(layer.execute(&query).await.unwrap().total_count(), 1);
    }

    #[tokio::test]
    async fn foreign_srid_is_rejected() {
        let err = cities()
            .execute(&FeatureQuery::new().intersects(square(2.0), 3857))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Layer 1 cannot reproject geometry from SRID 3857 to SRID 4326"
        );
    }

    #[tokio::test]
    async fn like_is_case_insensitive() {
        let layer = cities();
        let result = layer.execute(&FeatureQuery::new().like("LIS")).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.features()[0].label, "Lisbon");
    }

    #[tokio::test]
    async fn window_keeps_total() {
        let layer = cities();
        let result = layer
            .execute(&FeatureQuery::new().limit(1, 1))
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.total_count(), 3);
        assert_eq!(result.features()[0].id, 20);
    }

    #[tokio::test]
    async fn field_projection_and_box() {
        let layer = cities();
        let query = FeatureQuery::new()
            .fields(["population"])
            .request_box()
            .filter_by_id(30);
        let feature = layer.execute(&query).await.unwrap().one().unwrap();
        let keys: Vec<&String> = feature.fields.keys().collect();
        assert_eq!(keys, vec!["population"]);
        assert_eq!(feature.field("population"), Some(&Value::Null));
        assert_eq!(feature.bbox.unwrap().bounds(), [20.0, 20.0, 22.0, 24.0]);

        let err = layer
            .execute(&FeatureQuery::new().fields(["missing"]))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { .. }));
    }

    #[tokio::test]
    async fn null_geometry_never_intersects() {
        let data = br#"{"type":"Feature","geometry":null,"properties":{"code":"A"}}"#;
        let layer = GeoJsonLayer::from_bytes(2, data, "table", GeoJsonLayerOptions::new()).unwrap();
        assert!(layer.capabilities().spatial.is_supported());

        let result = layer
            .execute(&FeatureQuery::new().intersects(square(1.0), 4326))
            .await
            .unwrap();
        assert_eq!(result.total_count(), 0);

        // numbered from 1 without document ids
        let feature = layer
            .execute(&FeatureQuery::new().request_box())
            .await
            .unwrap()
            .one()
            .unwrap();
        assert_eq!(feature.id, 1);
        assert!(feature.bbox.is_none());
    }

    #[tokio::test]
    async fn empty_collection_accepts_spatial_queries() {
        let data = br#"{"type":"FeatureCollection","features":[]}"#;
        let layer = GeoJsonLayer::from_bytes(3, data, "empty", GeoJsonLayerOptions::new()).unwrap();
        assert!(layer.is_empty());

        let query = FeatureQuery::new()
            .intersects(Geometry::Point(Point::new(0.0, 0.0)), GEOJSON_SRID)
            .request_box()
            .like("x");
        let result = layer.execute(&query).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total_count(), 0);
    }

    #[tokio::test]
    async fn label_field_and_descriptors_can_be_edited() {
        let layer = cities();
        layer
            .update_fields(&LayerFieldsPatch {
                feature_label_field_id: Some(2),
                fields: vec![FieldPatch {
                    id: 2,
                    display_name: Some("Population".to_string()),
                    grid_visibility: Some(false),
                }],
            })
            .unwrap();

        let fields = layer.fields();
        assert_eq!(fields[1].display_name, "Population");
        assert!(!fields[1].grid_visibility);

        let result = layer.execute(&FeatureQuery::new()).await.unwrap();
        assert_eq!(result.features()[0].label, "230000");
        assert_eq!(result.features()[2].label, "#30");
    }

    #[test]
    fn duplicate_ids_fall_back_to_numbering() {
        let data = br#"{"type":"Feature","id":5,"geometry":null,"properties":{}}
{"type":"Feature","id":5,"geometry":null,"properties":{}}"#;
        let layer = GeoJsonLayer::from_bytes(3, data, "dup", GeoJsonLayerOptions::new()).unwrap();
        let ids: Vec<i64> = layer.features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
