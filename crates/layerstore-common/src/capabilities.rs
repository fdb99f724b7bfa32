//! Query capabilities declared by layer backends.
//!
//! A backend states which optional query filters it can honour. The shared
//! [`QueryCapabilities::check`] rejects a query up front with a
//! [`QueryError`] instead of letting the backend silently ignore a filter.

use crate::error::QueryError;
use crate::query::FeatureQuery;

/// Support status of a single query capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The backend honours this capability.
    Supported,
    /// The backend cannot honour this capability.
    NotSupported,
}

impl SupportStatus {
    /// Returns `true` if the capability is supported.
    ///
    /// # Examples
    ///
    /// ```
    /// use layerstore_common::SupportStatus;
    ///
    /// assert!(SupportStatus::Supported.is_supported());
    /// assert!(!SupportStatus::NotSupported.is_supported());
    /// ```
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, SupportStatus::Supported)
    }

    /// Returns the string representation of this support status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::NotSupported => "Not Supported",
        }
    }
}

/// Optional query features a layer backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCapabilities {
    /// Intersection filtering against a geometry.
    pub spatial: SupportStatus,
    /// Substring filtering.
    pub like: SupportStatus,
    /// Per-feature bounding boxes.
    pub bbox: SupportStatus,
    /// Administrative field descriptor edits.
    pub write: SupportStatus,
}

impl QueryCapabilities {
    /// Creates a capability set.
    #[must_use]
    pub const fn new(
        spatial: SupportStatus,
        like: SupportStatus,
        bbox: SupportStatus,
        write: SupportStatus,
    ) -> Self {
        Self {
            spatial,
            like,
            bbox,
            write,
        }
    }

    /// Capabilities of a spatial layer supporting every filter.
    #[must_use]
    pub const fn spatial() -> Self {
        use SupportStatus::Supported;
        Self::new(Supported, Supported, Supported, Supported)
    }

    /// Capabilities of a layer without geometry.
    #[must_use]
    pub const fn attributes_only() -> Self {
        use SupportStatus::{NotSupported, Supported};
        Self::new(NotSupported, Supported, NotSupported, Supported)
    }

    /// Verifies that every filter set on `query` is supported.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedFilter`] naming the first filter the
    /// layer cannot honour.
    ///
    /// # Examples
    ///
    /// ```
    /// use geo_types::{Geometry, Point};
    /// use layerstore_common::{FeatureQuery, QueryCapabilities};
    ///
    /// let query = FeatureQuery::new().intersects(Geometry::Point(Point::new(0.0, 0.0)), 4326);
    /// assert!(QueryCapabilities::spatial().check(1, &query).is_ok());
    /// assert!(QueryCapabilities::attributes_only().check(1, &query).is_err());
    /// ```
    pub fn check(&self, layer_id: i64, query: &FeatureQuery) -> Result<(), QueryError> {
        let unsupported = |filter| QueryError::UnsupportedFilter { layer_id, filter };

        if query.spatial_filter().is_some() && !self.spatial.is_supported() {
            return Err(unsupported("spatial"));
        }
        if query.like_pattern().is_some() && !self.like.is_supported() {
            return Err(unsupported("like"));
        }
        if query.box_requested() && !self.bbox.is_supported() {
            return Err(unsupported("bounding box"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_query_passes_every_capability_set() {
        let query = FeatureQuery::new().limit(10, 0).filter_by_id(1);
        assert!(QueryCapabilities::spatial().check(1, &query).is_ok());
        assert!(QueryCapabilities::attributes_only().check(1, &query).is_ok());
    }

    #[test]
    fn box_on_attribute_layer_is_rejected() {
        let err = QueryCapabilities::attributes_only()
            .check(4, &FeatureQuery::new().request_box())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Layer 4 does not support bounding box filtering"
        );
        assert_eq!(err.layer_id(), 4);
    }

    #[test]
    fn like_rejected_when_not_supported() {
        use SupportStatus::{NotSupported, Supported};
        let caps = QueryCapabilities::new(Supported, NotSupported, Supported, NotSupported);
        assert!(caps.check(2, &FeatureQuery::new().like("x")).is_err());
        assert!(caps.check(2, &FeatureQuery::new().like("")).is_ok());
    }
}
