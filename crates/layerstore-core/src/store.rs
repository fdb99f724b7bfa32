//! Single-layer feature operations: listing, single feature, field descriptors.
//!
//! Each operation rejects the whole request when the caller lacks read
//! permission on the layer or the layer holds no features.

use layerstore_common::{Feature, FeatureLayer, FeatureQuery, FieldDescriptor, JsonObject};
use log::{debug, info};
use serde::Serialize;

use crate::access::{Permission, Principal};
use crate::error::{AccessError, Result};
use crate::extensions::feature_extension_data;
use crate::request::{ItemRequest, StoreRequest};
use crate::service::FeatureService;
use crate::translator::{StoreResponse, project_item};

/// Compact description of one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    /// Feature id.
    pub id: i64,
    /// Layer id.
    #[serde(rename = "layerId")]
    pub layer_id: i64,
    /// Display string.
    pub label: String,
    /// Field values.
    pub fields: JsonObject,
}

impl FeatureService {
    /// Lists features of a layer according to the request's retrieval hints.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not resolve, access is denied, the
    /// layer holds no features, the hints are malformed, or the query fails.
    pub async fn list_features(
        &self,
        principal: &Principal,
        layer_id: i64,
        request: &StoreRequest,
    ) -> Result<StoreResponse> {
        let layer = self.layer(layer_id)?;
        let features = self.feature_layer(layer.as_ref(), principal, Permission::DataRead)?;
        let retrieval = request.parse()?;

        let query = retrieval.apply(features.feature_query());
        debug!("Listing features of layer {layer_id}: {query:?}");
        let result = features.execute(&query).await?;
        info!(
            "Layer {layer_id}: returning {} of {} matching features",
            result.len(),
            result.total_count()
        );

        Ok(StoreResponse::from_feature_set(&result, &retrieval))
    }

    /// Returns one feature with all its fields, optionally its box and
    /// extension data.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::FeatureNotFound`] for an unknown feature id, and
    /// the errors of [`FeatureService::list_features`].
    pub async fn get_feature(
        &self,
        principal: &Principal,
        layer_id: i64,
        feature_id: i64,
        request: ItemRequest,
    ) -> Result<JsonObject> {
        let layer = self.layer(layer_id)?;
        let features = self.feature_layer(layer.as_ref(), principal, Permission::DataRead)?;

        let mut query = features.feature_query().filter_by_id(feature_id);
        if request.feature_box {
            query = query.request_box();
        }
        let feature = self.fetch_one(features, &query, feature_id).await?;

        let ext = request
            .feature_ext
            .then(|| feature_extension_data(&self.registry, features, &feature));
        Ok(project_item(layer_id, &feature, request.feature_box, ext))
    }

    /// Returns the id, label and fields of one feature.
    ///
    /// # Errors
    ///
    /// Same as [`FeatureService::get_feature`].
    pub async fn show_feature(
        &self,
        principal: &Principal,
        layer_id: i64,
        feature_id: i64,
    ) -> Result<FeatureSummary> {
        let layer = self.layer(layer_id)?;
        let features = self.feature_layer(layer.as_ref(), principal, Permission::DataRead)?;
        let query = features.feature_query().filter_by_id(feature_id);
        let feature = self.fetch_one(features, &query, feature_id).await?;

        Ok(FeatureSummary {
            id: feature.id,
            layer_id,
            label: feature.label,
            fields: feature.fields,
        })
    }

    /// Returns the field descriptors of a layer in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not resolve, access is denied, or
    /// the layer holds no features.
    pub fn field_collection(
        &self,
        principal: &Principal,
        layer_id: i64,
    ) -> Result<Vec<FieldDescriptor>> {
        let layer = self.layer(layer_id)?;
        let features = self.feature_layer(layer.as_ref(), principal, Permission::DataRead)?;
        Ok(features.fields())
    }

    async fn fetch_one(
        &self,
        features: &dyn FeatureLayer,
        query: &FeatureQuery,
        feature_id: i64,
    ) -> Result<Feature> {
        let found = features.execute(query).await?.one();
        let feature = found.ok_or(AccessError::FeatureNotFound {
            layer_id: features.layer_id(),
            feature_id,
        })?;
        Ok(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::StaticAcl;
    use crate::catalog::MemoryCatalog;
    use crate::error::{InputError, LayerStoreError};
    use crate::extensions::{KeyedDataExtension, KeyedDataStore};
    use crate::test_support::{PlainLayer, StaticLayer};
    use layerstore_common::{ExtensionRegistry, ExtensionRegistryBuilder, QueryCapabilities};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn service(acl: StaticAcl, registry: ExtensionRegistry) -> FeatureService {
        let catalog = MemoryCatalog::new()
            .with(Arc::new(StaticLayer::numbered(1, 30)))
            .with(Arc::new(StaticLayer::numbered(2, 3)))
            .with(Arc::new(PlainLayer(3)))
            .with(Arc::new(
                StaticLayer::numbered(4, 3).with_capabilities(QueryCapabilities::attributes_only()),
            ));
        FeatureService::new(Arc::new(catalog), Arc::new(acl), registry)
    }

    fn user() -> Principal {
        Principal::User("tester".to_string())
    }

    fn range(value: &str) -> StoreRequest {
        StoreRequest {
            range: Some(value.to_string()),
            ..StoreRequest::default()
        }
    }

    #[tokio::test]
    async fn total_count_ignores_window() {
        let service = service(StaticAcl::new(), ExtensionRegistry::empty());
        for k in [1usize, 5, 29] {
            let response = service
                .list_features(&user(), 1, &range(&format!("items=0-{}", k - 1)))
                .await
                .unwrap();
            assert_eq!(response.records.len(), k);
            let content_range = response.content_range.unwrap();
            assert_eq!(content_range.total, 30);
            assert_eq!(content_range.to_string(), format!("items 0-{}/30", k - 1));
        }
    }

    #[tokio::test]
    async fn window_past_the_end_is_clamped() {
        let service = service(StaticAcl::new(), ExtensionRegistry::empty());
        let response = service
            .list_features(&user(), 2, &range("items=1-50"))
            .await
            .unwrap();
        assert_eq!(response.records.len(), 2);
        assert_eq!(
            response.content_range.unwrap().to_string(),
            "items 1-2/3"
        );
        assert_eq!(response.records[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn empty_like_returns_same_records_as_no_like() {
        let service = service(StaticAcl::new(), ExtensionRegistry::empty());
        let plain = service
            .list_features(&user(), 2, &StoreRequest::default())
            .await
            .unwrap();
        let empty_like = service
            .list_features(
                &user(),
                2,
                &StoreRequest {
                    like: Some(String::new()),
                    ..StoreRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(plain, empty_like);

        let filtered = service
            .list_features(
                &user(),
                1,
                &StoreRequest {
                    like: Some("f2".to_string()),
                    ..StoreRequest::default()
                },
            )
            .await
            .unwrap();
        // f2, f20..f29
        assert_eq!(filtered.records.len(), 11);
    }

    #[tokio::test]
    async fn single_layer_access_is_rejected_hard() {
        let service = service(
            StaticAcl::new().deny(2, Permission::DataRead),
            ExtensionRegistry::empty(),
        );

        let err = service
            .list_features(&user(), 2, &StoreRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let err = service.field_collection(&user(), 3).unwrap_err();
        assert!(matches!(
            err,
            LayerStoreError::Access(AccessError::NotImplemented { layer_id: 3, .. })
        ));

        let err = service
            .get_feature(&user(), 99, 1, ItemRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn malformed_range_is_client_error() {
        let service = service(StaticAcl::new(), ExtensionRegistry::empty());
        let err = service
            .list_features(&user(), 1, &range("items=9-2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LayerStoreError::Input(InputError::InvalidRange { .. })
        ));
    }

    #[tokio::test]
    async fn unsupported_filter_surfaces_query_error() {
        let service = service(StaticAcl::new(), ExtensionRegistry::empty());
        let err = service
            .list_features(
                &user(),
                4,
                &StoreRequest {
                    feature_box: true,
                    ..StoreRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LayerStoreError::Query(_)));
    }

    #[tokio::test]
    async fn get_feature_round_trips_through_id_filter() {
        let store = Arc::new(KeyedDataStore::new());
        store.set(1, 7, json!("seven")).unwrap();
        let mut builder = ExtensionRegistryBuilder::new();
        builder
            .register(Arc::new(KeyedDataExtension::new("description", store)))
            .unwrap();
        let service = service(StaticAcl::new(), builder.freeze());

        let item = service
            .get_feature(
                &user(),
                1,
                7,
                ItemRequest {
                    feature_box: false,
                    feature_ext: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(item["id"], json!(7));
        assert_eq!(item["layerId"], json!(1));
        assert_eq!(item["name"], json!("f7"));
        assert_eq!(item["fields"], json!({"name": "f7"}));
        assert_eq!(item["ext"], json!({"description": "seven"}));
        assert!(!item.contains_key("box"));

        let without_ext = service
            .get_feature(&user(), 1, 7, ItemRequest::default())
            .await
            .unwrap();
        assert!(!without_ext.contains_key("ext"));

        let err = service
            .get_feature(&user(), 1, 500, ItemRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LayerStoreError::Access(AccessError::FeatureNotFound {
                layer_id: 1,
                feature_id: 500
            })
        ));
    }

    #[tokio::test]
    async fn show_feature_summarises() {
        let service = service(StaticAcl::new(), ExtensionRegistry::empty());
        let summary = service.show_feature(&user(), 2, 3).await.unwrap();
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({"id": 3, "layerId": 2, "label": "f3", "fields": {"name": "f3"}})
        );
    }

    #[test]
    fn field_collection_lists_descriptors() {
        let service = service(StaticAcl::new(), ExtensionRegistry::empty());
        let fields = service.field_collection(&user(), 1).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(
            serde_json::to_value(&fields[0]).unwrap()["keyname"],
            Value::from("name")
        );
    }
}
