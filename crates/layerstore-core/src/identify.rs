//! Identify: which features of which layers intersect a geometry.
//!
//! The request geometry is parsed once and queried against every requested
//! layer with a per-layer result cap. A layer the caller may not read, a layer
//! without features, or a failing layer query produces a per-layer error
//! marker; only an unknown layer id or malformed input fails the request.

use std::collections::HashSet;

use futures::StreamExt;
use futures::stream;
use geo_types::Geometry;
use geozero::ToGeo;
use geozero::wkt::Wkt;
use layerstore_common::{Feature, JsonObject, Layer};
use log::{debug, info, warn};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::access::{Permission, Principal};
use crate::error::{InputError, LayerStoreError, Result};
use crate::service::FeatureService;

/// Marker of a layer the caller may not read.
pub const FORBIDDEN_MARKER: &str = "Forbidden";
/// Marker of a layer that holds no features.
pub const NOT_IMPLEMENTED_MARKER: &str = "Not implemented";
/// Marker of a layer whose query failed.
pub const QUERY_FAILED_MARKER: &str = "Query failed";

/// Identify request: a geometry in a spatial reference and the layers to search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyRequest {
    /// Spatial reference id of `geom`.
    pub srs: i32,
    /// Geometry as well-known text.
    pub geom: String,
    /// Layers to search, possibly with duplicates.
    pub layers: Vec<i64>,
}

impl IdentifyRequest {
    /// Parses a JSON body `{srs, geom, layers}`.
    ///
    /// `srs` and layer ids may be JSON integers or strings holding integers.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] for a missing member or a value of the wrong type.
    ///
    /// # Examples
    ///
    /// ```
    /// use layerstore_core::identify::IdentifyRequest;
    ///
    /// let body = serde_json::json!({"srs": "4326", "geom": "POINT (1 2)", "layers": [3, "4"]});
    /// let request = IdentifyRequest::from_json(&body).unwrap();
    /// assert_eq!(request.srs, 4326);
    /// assert_eq!(request.layers, vec![3, 4]);
    /// ```
    pub fn from_json(body: &Value) -> std::result::Result<Self, InputError> {
        let body = body.as_object().ok_or_else(|| InputError::InvalidBody {
            message: "expected a JSON object".to_string(),
        })?;

        let srs = body
            .get("srs")
            .ok_or(InputError::MissingParameter { name: "srs" })?;
        let srs = integer(srs)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| InputError::InvalidSrs {
                value: srs.to_string(),
            })?;

        let geom = body
            .get("geom")
            .ok_or(InputError::MissingParameter { name: "geom" })?
            .as_str()
            .ok_or_else(|| InputError::InvalidGeometry {
                message: "geometry must be a well-known text string".to_string(),
            })?
            .to_string();

        let layers = body
            .get("layers")
            .ok_or(InputError::MissingParameter { name: "layers" })?
            .as_array()
            .ok_or_else(|| InputError::InvalidBody {
                message: "layers must be an array".to_string(),
            })?
            .iter()
            .map(|value| {
                integer(value).ok_or_else(|| InputError::InvalidLayerId {
                    value: value.to_string(),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { srs, geom, layers })
    }

    /// Parses the geometry.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidGeometry`] if `geom` is not valid WKT.
    pub fn geometry(&self) -> std::result::Result<Geometry<f64>, InputError> {
        Wkt(self.geom.as_str())
            .to_geo()
            .map_err(|e| InputError::InvalidGeometry {
                message: e.to_string(),
            })
    }

    /// Returns the layer ids without duplicates, in request order.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<i64> {
        let mut seen = HashSet::new();
        self.layers
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A feature found by identify.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifiedFeature {
    /// Feature id.
    pub id: i64,
    /// Layer the feature belongs to.
    #[serde(rename = "layerId")]
    pub layer_id: i64,
    /// Display string.
    pub label: String,
    /// All field values.
    pub fields: JsonObject,
}

impl IdentifiedFeature {
    fn new(layer_id: i64, feature: Feature) -> Self {
        Self {
            id: feature.id,
            layer_id,
            label: feature.label,
            fields: feature.fields,
        }
    }
}

/// Identify outcome of one layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOutcome {
    /// The caller may not read the layer.
    Forbidden,
    /// The layer holds no features.
    NotImplemented,
    /// The layer query failed.
    Failed {
        /// Description of the failure
        message: String,
    },
    /// Features intersecting the geometry, at most the configured cap.
    Features(Vec<IdentifiedFeature>),
}

impl LayerOutcome {
    /// Number of features this layer contributes.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        match self {
            LayerOutcome::Features(features) => features.len(),
            _ => 0,
        }
    }

    /// Returns the error marker, if this outcome is an error.
    #[must_use]
    pub fn error(&self) -> Option<&'static str> {
        match self {
            LayerOutcome::Forbidden => Some(FORBIDDEN_MARKER),
            LayerOutcome::NotImplemented => Some(NOT_IMPLEMENTED_MARKER),
            LayerOutcome::Failed { .. } => Some(QUERY_FAILED_MARKER),
            LayerOutcome::Features(_) => None,
        }
    }
}

impl Serialize for LayerOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LayerOutcome::Features(features) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("features", features)?;
                map.serialize_entry("featureCount", &features.len())?;
                map.end()
            },
            LayerOutcome::Failed { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", QUERY_FAILED_MARKER)?;
                map.serialize_entry("message", message)?;
                map.end()
            },
            LayerOutcome::Forbidden | LayerOutcome::NotImplemented => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &self.error())?;
                map.end()
            },
        }
    }
}

/// Aggregated identify result.
///
/// Serializes as `{"<layer id>": <outcome>, ..., "featureCount": n}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifyResult {
    /// Per-layer outcomes in request order.
    pub layers: Vec<(i64, LayerOutcome)>,
    /// Sum of features returned over all layers.
    pub feature_count: usize,
}

impl IdentifyResult {
    /// Returns the outcome of one layer.
    #[must_use]
    pub fn get(&self, layer_id: i64) -> Option<&LayerOutcome> {
        self.layers
            .iter()
            .find(|(id, _)| *id == layer_id)
            .map(|(_, outcome)| outcome)
    }

    fn push(&mut self, layer_id: i64, outcome: LayerOutcome) {
        self.feature_count += outcome.feature_count();
        self.layers.push((layer_id, outcome));
    }
}

impl Serialize for IdentifyResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.layers.len() + 1))?;
        for (layer_id, outcome) in &self.layers {
            map.serialize_entry(&layer_id.to_string(), outcome)?;
        }
        map.serialize_entry("featureCount", &self.feature_count)?;
        map.end()
    }
}

impl FeatureService {
    /// Identifies features intersecting the request geometry on every
    /// requested layer.
    ///
    /// Layers are queried concurrently up to the configured width; the result
    /// keeps request order. If `cancel` fires first, no partial result is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] for an invalid geometry,
    /// `AccessError::LayerNotFound` for an unknown layer id, and
    /// [`LayerStoreError::Cancelled`] on cancellation.
    pub async fn identify(
        &self,
        principal: &Principal,
        request: &IdentifyRequest,
        cancel: &CancellationToken,
    ) -> Result<IdentifyResult> {
        let geometry = request.geometry()?;
        let layer_ids = request.layer_ids();
        let layers = layer_ids
            .iter()
            .map(|id| self.layer(*id))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let limit = self.settings.identify.feature_limit;
        info!(
            "Identify on {} layer(s) in SRID {} (limit {limit} per layer)",
            layers.len(),
            request.srs
        );

        let fan_out = stream::iter(layers.iter().map(|layer| {
            self.identify_layer(layer.as_ref(), principal, &geometry, request.srs, limit)
        }))
        .buffered(self.settings.identify.concurrency)
        .collect::<Vec<_>>();

        let outcomes = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Identify cancelled by caller");
                return Err(LayerStoreError::Cancelled);
            },
            outcomes = fan_out => outcomes,
        };

        let mut result = IdentifyResult::default();
        for (layer_id, outcome) in layer_ids.into_iter().zip(outcomes) {
            result.push(layer_id, outcome);
        }
        info!("Identify found {} feature(s)", result.feature_count);
        Ok(result)
    }

    async fn identify_layer(
        &self,
        layer: &dyn Layer,
        principal: &Principal,
        geometry: &Geometry<f64>,
        srid: i32,
        limit: usize,
    ) -> LayerOutcome {
        let layer_id = layer.id();
        if !self
            .authorizer
            .has_permission(layer, principal, Permission::DataRead)
        {
            debug!("Identify: layer {layer_id} forbidden for {principal}");
            return LayerOutcome::Forbidden;
        }
        let Some(features) = layer.as_feature_layer() else {
            debug!("Identify: layer {layer_id} is not a feature layer");
            return LayerOutcome::NotImplemented;
        };

        let query = features
            .feature_query()
            .intersects(geometry.clone(), srid)
            .limit(limit, 0);
        match features.execute(&query).await {
            Ok(found) => LayerOutcome::Features(
                found
                    .into_iter()
                    .take(limit)
                    .map(|feature| IdentifiedFeature::new(layer_id, feature))
                    .collect(),
            ),
            Err(e) => {
                warn!("Identify: query on layer {layer_id} failed: {e}");
                LayerOutcome::Failed {
                    message: e.to_string(),
                }
            },
        }
    }
}
