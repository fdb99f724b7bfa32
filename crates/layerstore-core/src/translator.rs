//! Projection of query results into transport-ready payloads.
//!
//! Key transforms (field prefix, `id`/`label`/`box`/`ext` members) happen here
//! on copies; the features returned by the backend are never modified.

use std::fmt;

use layerstore_common::{Feature, FeatureSet, JsonObject};
use serde_json::{Value, json};

use crate::request::Retrieval;

/// Response header carrying the [`ContentRange`].
pub const CONTENT_RANGE_HEADER: &str = "content-range";

/// Pagination metadata of a listing response: `items <first>-<last>/<total>`.
///
/// `last` is clamped to `total - 1`, so it is `-1` when nothing matched.
///
/// # Examples
///
/// ```
/// use layerstore_core::translator::ContentRange;
///
/// assert_eq!(ContentRange::new(0, 24, 100).to_string(), "items 0-24/100");
/// assert_eq!(ContentRange::new(90, 109, 100).to_string(), "items 90-99/100");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// Index of the first item of the window.
    pub first: usize,
    /// Index of the last item of the window, clamped to the result.
    pub last: i64,
    /// Number of matching items ignoring the window.
    pub total: usize,
}

impl ContentRange {
    /// Builds the descriptor for a requested window and the total match count.
    #[must_use]
    pub fn new(first: usize, requested_last: usize, total: usize) -> Self {
        let total_i = i64::try_from(total).unwrap_or(i64::MAX);
        let requested_i = i64::try_from(requested_last).unwrap_or(i64::MAX);
        Self {
            first,
            last: requested_i.min(total_i - 1),
            total,
        }
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "items {}-{}/{}", self.first, self.last, self.total)
    }
}

/// Projected feature listing plus its pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    /// One projected record per returned feature.
    pub records: Vec<JsonObject>,
    /// Present when the request carried an `items` range.
    pub content_range: Option<ContentRange>,
}

impl StoreResponse {
    /// Projects a query result according to the request's retrieval hints.
    #[must_use]
    pub fn from_feature_set(features: &FeatureSet, retrieval: &Retrieval) -> Self {
        let records = features
            .features()
            .iter()
            .map(|feature| project_feature(feature, retrieval))
            .collect();
        let content_range = retrieval
            .range
            .map(|range| range.content_range(features.total_count()));

        Self {
            records,
            content_range,
        }
    }

    /// Returns the JSON body: an array of records.
    #[must_use]
    pub fn body(&self) -> Value {
        Value::Array(self.records.iter().cloned().map(Value::Object).collect())
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("content-type", "application/json".to_string())];
        if let Some(range) = self.content_range {
            headers.push((CONTENT_RANGE_HEADER, range.to_string()));
        }
        headers
    }
}

/// Projects one feature of a listing: `{<prefix><field>..., id, label, box?}`.
///
/// Only fields selected by the retrieval are emitted, each under its
/// prefixed key.
#[must_use]
pub fn project_feature(feature: &Feature, retrieval: &Retrieval) -> JsonObject {
    let mut record = JsonObject::new();
    for (key, value) in &feature.fields {
        if !retrieval.fields.is_empty() && !retrieval.fields.contains(key) {
            continue;
        }
        record.insert(format!("{}{key}", retrieval.prefix), value.clone());
    }
    record.insert("id".to_string(), json!(feature.id));
    record.insert("label".to_string(), json!(feature.label));
    if retrieval.with_box {
        record.insert("box".to_string(), json!(feature.bbox));
    }
    record
}

/// Projects a single requested feature:
/// `{<field>..., id, layerId, fields: {...}, box?, ext?}`.
#[must_use]
pub fn project_item(
    layer_id: i64,
    feature: &Feature,
    with_box: bool,
    ext: Option<JsonObject>,
) -> JsonObject {
    let mut record = feature.fields.clone();
    record.insert("id".to_string(), json!(feature.id));
    record.insert("layerId".to_string(), json!(layer_id));
    record.insert("fields".to_string(), Value::Object(feature.fields.clone()));
    if with_box {
        record.insert("box".to_string(), json!(feature.bbox));
    }
    if let Some(ext) = ext {
        record.insert("ext".to_string(), Value::Object(ext));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ItemRange;
    use layerstore_common::FeatureBox;

    fn city(id: i64) -> Feature {
        let mut fields = JsonObject::new();
        fields.insert("name".to_string(), json!(format!("city {id}")));
        fields.insert("pop".to_string(), json!(id * 1000));
        Feature::new(id, format!("#{id}")).with_fields(fields)
    }

    #[test]
    fn content_range_end_is_clamped() {
        for total in [0usize, 1, 5, 30] {
            for (first, last) in [(0usize, 9usize), (0, 0), (3, 40), (25, 29)] {
                let range = ContentRange::new(first, last, total);
                let expected = i64::try_from(last)
                    .unwrap()
                    .min(i64::try_from(total).unwrap() - 1);
                assert_eq!(range.last, expected);
                assert_eq!(
                    range.to_string(),
                    format!("items {first}-{expected}/{total}")
                );
            }
        }
    }

    #[test]
    fn prefix_applies_to_every_field_key() {
        for prefix in ["", "f_", "attr:"] {
            let retrieval = Retrieval {
                prefix: prefix.to_string(),
                ..Retrieval::default()
            };
            let record = project_feature(&city(1), &retrieval);
            let field_keys: Vec<&String> = record
                .keys()
                .filter(|k| *k != "id" && *k != "label")
                .collect();
            assert_eq!(
                field_keys,
                vec![&format!("{prefix}name"), &format!("{prefix}pop")]
            );
            assert_eq!(record["id"], json!(1));
            assert_eq!(record["label"], json!("#1"));
        }
    }

    #[test]
    fn projection_honours_field_subset() {
        let retrieval = Retrieval {
            fields: vec!["pop".to_string()],
            prefix: "p_".to_string(),
            ..Retrieval::default()
        };
        let record = project_feature(&city(2), &retrieval);
        assert_eq!(
            Value::Object(record),
            json!({"p_pop": 2000, "id": 2, "label": "#2"})
        );
    }

    #[test]
    fn box_is_emitted_when_requested() {
        let mut feature = city(3);
        feature.bbox = Some(FeatureBox::new(0.0, 1.0, 2.0, 3.0));
        let retrieval = Retrieval {
            with_box: true,
            ..Retrieval::default()
        };
        let record = project_feature(&feature, &retrieval);
        assert_eq!(record["box"], json!([0.0, 1.0, 2.0, 3.0]));

        let record = project_feature(&feature, &Retrieval::default());
        assert!(!record.contains_key("box"));
    }

    #[test]
    fn response_carries_content_range_only_when_paginated() {
        let set = FeatureSet::new(vec![city(1), city(2)], 2);

        let unpaged = StoreResponse::from_feature_set(&set, &Retrieval::default());
        assert_eq!(unpaged.content_range, None);
        assert_eq!(unpaged.headers().len(), 1);

        let paged = StoreResponse::from_feature_set(
            &set,
            &Retrieval {
                range: Some(ItemRange { first: 0, last: 9 }),
                ..Retrieval::default()
            },
        );
        assert_eq!(
            paged.content_range.map(|r| r.to_string()),
            Some("items 0-1/2".to_string())
        );
        assert_eq!(paged.body().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn item_projection_nests_fields() {
        let mut ext = JsonObject::new();
        ext.insert("description".to_string(), json!("text"));
        let record = project_item(7, &city(4), false, Some(ext));
        assert_eq!(
            Value::Object(record),
            json!({
                "name": "city 4",
                "pop": 4000,
                "id": 4,
                "layerId": 7,
                "fields": {"name": "city 4", "pop": 4000},
                "ext": {"description": "text"}
            })
        );
    }
}
