//! Query description and result types for feature layers.
//!
//! A [`FeatureQuery`] is a plain value assembled field by field from any number
//! of independent sources (request headers, path parameters, the identify
//! fan-out) and then handed to [`FeatureLayer::execute`](crate::FeatureLayer::execute),
//! which returns a new [`FeatureSet`].
//!
//! # Examples
//!
//! ```
//! use layerstore_common::FeatureQuery;
//!
//! let query = FeatureQuery::new()
//!     .limit(10, 20)
//!     .fields(["name", "population"])
//!     .like("port")
//!     .filter_by_id(5);
//!
//! assert_eq!(query.id_filter(), Some(5));
//! assert_eq!(query.window().map(|w| (w.limit, w.offset)), Some((10, 20)));
//! assert_eq!(query.field_keys(), Some(&["name".to_string(), "population".to_string()][..]));
//! ```

use geo_types::Geometry;

use crate::model::Feature;

/// Pagination window of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Maximum number of features to return.
    pub limit: usize,
    /// Number of matching features to skip.
    pub offset: usize,
}

impl Window {
    /// Applies the window to a slice of already filtered items.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = start.saturating_add(self.limit).min(items.len());
        &items[start..end]
    }
}

/// Geometry a feature must intersect, with the spatial reference it is expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFilter {
    /// Filter geometry.
    pub geometry: Geometry<f64>,
    /// Spatial reference id of `geometry`.
    pub srid: i32,
}

/// Builder describing which features of one layer to fetch and how.
///
/// Every setter consumes and returns the query. Setters are idempotent for
/// equal arguments and independent of each other, so call order never
/// changes the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureQuery {
    id: Option<i64>,
    fields: Vec<String>,
    window: Option<Window>,
    with_box: bool,
    intersects: Option<SpatialFilter>,
    like: Option<String>,
}

impl FeatureQuery {
    /// Returns an unconfigured query matching every feature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to the feature with the given id.
    #[must_use]
    pub fn filter_by_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Restricts returned fields to `keys`. An empty list means all fields.
    #[must_use]
    pub fn fields<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the pagination window, replacing any previous one.
    #[must_use]
    pub fn limit(mut self, limit: usize, offset: usize) -> Self {
        self.window = Some(Window { limit, offset });
        self
    }

    /// Requests a bounding box for every returned feature.
    #[must_use]
    pub fn request_box(mut self) -> Self {
        self.with_box = true;
        self
    }

    /// Restricts the query to features intersecting `geometry`.
    #[must_use]
    pub fn intersects(mut self, geometry: Geometry<f64>, srid: i32) -> Self {
        self.intersects = Some(SpatialFilter { geometry, srid });
        self
    }

    /// Restricts the query to features matching a substring.
    ///
    /// Matching semantics belong to the backend. An empty pattern leaves the
    /// query unchanged.
    #[must_use]
    pub fn like(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if !pattern.is_empty() {
            self.like = Some(pattern);
        }
        self
    }

    /// Returns the id filter.
    #[must_use]
    pub fn id_filter(&self) -> Option<i64> {
        self.id
    }

    /// Returns the explicit field subset, or `None` when all fields are requested.
    #[must_use]
    pub fn field_keys(&self) -> Option<&[String]> {
        (!self.fields.is_empty()).then_some(self.fields.as_slice())
    }

    /// Returns `true` if the field `key` is part of the projection.
    #[must_use]
    pub fn selects(&self, key: &str) -> bool {
        self.fields.is_empty() || self.fields.iter().any(|f| f == key)
    }

    /// Returns the pagination window.
    #[must_use]
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    /// Returns `true` if bounding boxes were requested.
    #[must_use]
    pub fn box_requested(&self) -> bool {
        self.with_box
    }

    /// Returns the spatial filter.
    #[must_use]
    pub fn spatial_filter(&self) -> Option<&SpatialFilter> {
        self.intersects.as_ref()
    }

    /// Returns the substring filter.
    #[must_use]
    pub fn like_pattern(&self) -> Option<&str> {
        self.like.as_deref()
    }
}

/// Result of executing a [`FeatureQuery`].
///
/// `total_count` counts every feature matching the filters, ignoring the
/// pagination window, and is never smaller than the number of features held.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    features: Vec<Feature>,
    total_count: usize,
}

impl FeatureSet {
    /// Creates a result from the returned window and the unwindowed match count.
    #[must_use]
    pub fn new(features: Vec<Feature>, total_count: usize) -> Self {
        let total_count = total_count.max(features.len());
        Self {
            features,
            total_count,
        }
    }

    /// Returns the features in this window.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Returns the number of matching features ignoring the window.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Returns the number of features in this window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the window holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Consumes the set, returning the first feature.
    #[must_use]
    pub fn one(self) -> Option<Feature> {
        self.features.into_iter().next()
    }
}

impl IntoIterator for FeatureSet {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Point;

    #[test]
    fn empty_like_is_a_no_op() {
        assert_eq!(FeatureQuery::new().like(""), FeatureQuery::new());
        assert_eq!(
            FeatureQuery::new().like("abc").like(""),
            FeatureQuery::new().like("abc")
        );
    }

    #[test]
    fn setters_commute() {
        let geometry = Geometry::Point(Point::new(1.0, 2.0));
        let a = FeatureQuery::new()
            .limit(5, 10)
            .filter_by_id(3)
            .intersects(geometry.clone(), 4326)
            .request_box();
        let b = FeatureQuery::new()
            .request_box()
            .intersects(geometry, 4326)
            .filter_by_id(3)
            .limit(5, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn setters_are_idempotent() {
        let once = FeatureQuery::new().fields(["a"]).limit(1, 0);
        let twice = once.clone().fields(["a"]).limit(1, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_field_list_selects_everything() {
        let query = FeatureQuery::new().fields(Vec::<String>::new());
        assert_eq!(query.field_keys(), None);
        assert!(query.selects("anything"));

        let query = query.fields(["name"]);
        assert!(query.selects("name"));
        assert!(!query.selects("other"));
    }

    #[test]
    fn window_slice_clamps_to_items() {
        let items = [0, 1, 2, 3, 4];
        assert_eq!(Window { limit: 2, offset: 1 }.slice(&items), &[1, 2]);
        assert_eq!(Window { limit: 10, offset: 3 }.slice(&items), &[3, 4]);
        assert!(Window { limit: 2, offset: 9 }.slice(&items).is_empty());
        assert_eq!(
            Window {
                limit: usize::MAX,
                offset: 4
            }
            .slice(&items),
            &[4]
        );
    }

    #[test]
    fn feature_set_total_never_below_len() {
        let set = FeatureSet::new(vec![Feature::new(1, "a"), Feature::new(2, "b")], 1);
        assert_eq!(set.total_count(), 2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.one().map(|f| f.id), Some(1));
    }
}
