//! In-memory layers for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use layerstore_common::{
    Feature, FeatureLayer, FeatureQuery, FeatureSet, FieldDescriptor, FieldType, JsonObject,
    Layer, LayerFieldsPatch, QueryCapabilities, QueryError,
};
use serde_json::json;
use tokio::sync::Notify;

/// Feature layer over a fixed feature list.
///
/// Honours id, like (on labels) and window filters; a spatial filter matches
/// every feature.
pub struct StaticLayer {
    id: i64,
    features: Vec<Feature>,
    fields: RwLock<Vec<FieldDescriptor>>,
    label_field: RwLock<Option<i64>>,
    capabilities: QueryCapabilities,
    broken: bool,
}

impl StaticLayer {
    pub fn new(id: i64, features: Vec<Feature>) -> Self {
        Self {
            id,
            features,
            fields: RwLock::new(vec![FieldDescriptor::new(1, "name", FieldType::String)]),
            label_field: RwLock::new(None),
            capabilities: QueryCapabilities::spatial(),
            broken: false,
        }
    }

    /// Layer with `count` features named `f<n>`, ids starting at 1.
    pub fn numbered(id: i64, count: i64) -> Self {
        let features = (1..=count)
            .map(|n| {
                let mut fields = JsonObject::new();
                fields.insert("name".to_string(), json!(format!("f{n}")));
                Feature::new(n, format!("f{n}")).with_fields(fields)
            })
            .collect();
        Self::new(id, features)
    }

    pub fn with_capabilities(mut self, capabilities: QueryCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Every execution fails.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

impl Layer for StaticLayer {
    fn id(&self) -> i64 {
        self.id
    }

    fn display_name(&self) -> &str {
        "static"
    }

    fn as_feature_layer(&self) -> Option<&dyn FeatureLayer> {
        Some(self)
    }
}

#[async_trait]
impl FeatureLayer for StaticLayer {
    fn layer_id(&self) -> i64 {
        self.id
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields.read().unwrap().clone()
    }

    fn feature_label_field_id(&self) -> Option<i64> {
        *self.label_field.read().unwrap()
    }

    fn capabilities(&self) -> QueryCapabilities {
        self.capabilities
    }

    async fn execute(&self, query: &FeatureQuery) -> Result<FeatureSet, QueryError> {
        self.capabilities.check(self.id, query)?;
        if self.broken {
            return Err(QueryError::Execution {
                layer_id: self.id,
                message: "connection reset".to_string(),
            });
        }

        let matching: Vec<Feature> = self
            .features
            .iter()
            .filter(|f| query.id_filter().is_none_or(|id| f.id == id))
            .filter(|f| query.like_pattern().is_none_or(|p| f.label.contains(p)))
            .cloned()
            .collect();
        let total = matching.len();
        let window = match query.window() {
            Some(window) => window.slice(&matching).to_vec(),
            None => matching,
        };
        Ok(FeatureSet::new(window, total))
    }

    fn update_fields(&self, patch: &LayerFieldsPatch) -> Result<(), QueryError> {
        patch.apply_to(&mut self.fields.write().unwrap());
        if let Some(label) = patch.feature_label_field_id {
            *self.label_field.write().unwrap() = Some(label);
        }
        Ok(())
    }
}

/// Layer without the feature-layer capability.
pub struct PlainLayer(pub i64);

impl Layer for PlainLayer {
    fn id(&self) -> i64 {
        self.0
    }

    fn display_name(&self) -> &str {
        "plain"
    }
}

/// Feature layer whose queries park until [`GatedLayer::release`] is called.
///
/// `started` is notified when a query begins; `finished` is set only if a
/// query runs to completion.
pub struct GatedLayer {
    id: i64,
    pub started: Arc<Notify>,
    pub finished: Arc<AtomicBool>,
    gate: Arc<Notify>,
}

impl GatedLayer {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            started: Arc::new(Notify::new()),
            finished: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Handle that lets every parked query continue.
    pub fn release(&self) -> Arc<Notify> {
        Arc::clone(&self.gate)
    }
}

impl Layer for GatedLayer {
    fn id(&self) -> i64 {
        self.id
    }

    fn display_name(&self) -> &str {
        "gated"
    }

    fn as_feature_layer(&self) -> Option<&dyn FeatureLayer> {
        Some(self)
    }
}

#[async_trait]
impl FeatureLayer for GatedLayer {
    fn layer_id(&self) -> i64 {
        self.id
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        Vec::new()
    }

    fn feature_label_field_id(&self) -> Option<i64> {
        None
    }

    fn capabilities(&self) -> QueryCapabilities {
        QueryCapabilities::spatial()
    }

    async fn execute(&self, _: &FeatureQuery) -> Result<FeatureSet, QueryError> {
        self.started.notify_one();
        self.gate.notified().await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(FeatureSet::new(Vec::new(), 0))
    }

    fn update_fields(&self, _: &LayerFieldsPatch) -> Result<(), QueryError> {
        Err(QueryError::ReadOnly { layer_id: self.id })
    }
}
