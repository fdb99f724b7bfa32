//! Transport-level retrieval hints and their parsing.
//!
//! [`StoreRequest`] and [`ItemRequest`] carry the raw header and parameter
//! values of a request. Parsing turns a `StoreRequest` into a typed
//! [`Retrieval`], which configures a [`FeatureQuery`] and later drives the
//! projection of the result.

use layerstore_common::FeatureQuery;

use crate::error::InputError;
use crate::translator::ContentRange;

/// Header carrying the pagination range, e.g. `items=0-24`.
pub const RANGE_HEADER: &str = "range";
/// Header carrying the JSON list of fields to return.
pub const FIELD_LIST_HEADER: &str = "x-field-list";
/// Header carrying the JSON string prepended to output field keys.
pub const FIELD_PREFIX_HEADER: &str = "x-field-prefix";
/// Header requesting per-feature bounding boxes.
pub const FEATURE_BOX_HEADER: &str = "x-feature-box";
/// Header requesting extension data on a single feature.
pub const FEATURE_EXT_HEADER: &str = "x-feature-ext";
/// Query parameter carrying the substring filter.
pub const LIKE_PARAM: &str = "like";

const RANGE_UNIT: &str = "items=";

/// Inclusive, zero-based window requested with `items=<first>-<last>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRange {
    /// Index of the first requested item.
    pub first: usize,
    /// Index of the last requested item.
    pub last: usize,
}

impl ItemRange {
    /// Parses a range expression.
    ///
    /// Returns `Ok(None)` when the expression uses a unit other than `items`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidRange`] if the bounds are not non-negative
    /// integers or `last < first`.
    ///
    /// # Examples
    ///
    /// ```
    /// use layerstore_core::request::ItemRange;
    ///
    /// let range = ItemRange::parse("items=10-19").unwrap().unwrap();
    /// assert_eq!((range.first, range.last, range.limit()), (10, 19, 10));
    ///
    /// assert!(ItemRange::parse("bytes=0-99").unwrap().is_none());
    /// assert!(ItemRange::parse("items=9-3").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Option<Self>, InputError> {
        let Some(bounds) = value.trim().strip_prefix(RANGE_UNIT) else {
            return Ok(None);
        };

        let invalid = |reason: &str| InputError::InvalidRange {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let (first, last) = bounds
            .split_once('-')
            .ok_or_else(|| invalid("expected '<first>-<last>'"))?;
        let first: usize = first
            .trim()
            .parse()
            .map_err(|_| invalid("first bound is not a non-negative integer"))?;
        let last: usize = last
            .trim()
            .parse()
            .map_err(|_| invalid("last bound is not a non-negative integer"))?;

        if last < first {
            return Err(invalid("last bound is before first bound"));
        }
        Ok(Some(Self { first, last }))
    }

    /// Number of items requested.
    #[must_use]
    pub fn limit(&self) -> usize {
        (self.last - self.first).saturating_add(1)
    }

    /// Describes the returned window for a result with `total` matches.
    #[must_use]
    pub fn content_range(&self, total: usize) -> ContentRange {
        ContentRange::new(self.first, self.last, total)
    }
}

/// Raw retrieval hints of a feature listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreRequest {
    /// Value of the range header.
    pub range: Option<String>,
    /// Value of the field list header (JSON array of strings).
    pub field_list: Option<String>,
    /// Value of the field prefix header (JSON string).
    pub field_prefix: Option<String>,
    /// Whether bounding boxes were requested.
    pub feature_box: bool,
    /// Value of the substring parameter.
    pub like: Option<String>,
}

impl StoreRequest {
    /// Collects the hints from header and parameter lookups.
    ///
    /// A flag header counts as set when present and non-empty.
    pub fn from_lookup<'a>(
        header: impl Fn(&str) -> Option<&'a str>,
        param: impl Fn(&str) -> Option<&'a str>,
    ) -> Self {
        Self {
            range: header(RANGE_HEADER).map(str::to_string),
            field_list: header(FIELD_LIST_HEADER).map(str::to_string),
            field_prefix: header(FIELD_PREFIX_HEADER).map(str::to_string),
            feature_box: flag(header(FEATURE_BOX_HEADER)),
            like: param(LIKE_PARAM).map(str::to_string),
        }
    }

    /// Parses the raw hints.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] for a malformed range, field list, or prefix.
    pub fn parse(&self) -> Result<Retrieval, InputError> {
        let range = match &self.range {
            Some(value) => ItemRange::parse(value)?,
            None => None,
        };

        let fields = match &self.field_list {
            Some(value) => {
                serde_json::from_str::<Vec<String>>(value).map_err(|e| {
                    InputError::InvalidFieldList {
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?
            },
            None => Vec::new(),
        };

        let prefix = match &self.field_prefix {
            Some(value) => serde_json::from_str::<String>(value).map_err(|e| {
                InputError::InvalidFieldPrefix {
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => String::new(),
        };

        let like = self.like.clone().filter(|like| !like.is_empty());

        Ok(Retrieval {
            range,
            fields,
            prefix,
            with_box: self.feature_box,
            like,
        })
    }
}

/// Typed retrieval hints of a feature listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieval {
    /// Requested window.
    pub range: Option<ItemRange>,
    /// Fields to return; empty means all.
    pub fields: Vec<String>,
    /// String prepended to every output field key.
    pub prefix: String,
    /// Whether to return bounding boxes.
    pub with_box: bool,
    /// Substring filter; never empty.
    pub like: Option<String>,
}

impl Retrieval {
    /// Configures `query` with these hints.
    ///
    /// The prefix is not applied here: it only affects output keys.
    #[must_use]
    pub fn apply(&self, mut query: FeatureQuery) -> FeatureQuery {
        if let Some(range) = self.range {
            query = query.limit(range.limit(), range.first);
        }
        if !self.fields.is_empty() {
            query = query.fields(self.fields.iter().cloned());
        }
        if self.with_box {
            query = query.request_box();
        }
        if let Some(like) = &self.like {
            query = query.like(like.clone());
        }
        query
    }
}

/// Raw hints of a single feature request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemRequest {
    /// Whether the bounding box was requested.
    pub feature_box: bool,
    /// Whether extension data was requested.
    pub feature_ext: bool,
}

impl ItemRequest {
    /// Collects the hints from a header lookup.
    pub fn from_lookup<'a>(header: impl Fn(&str) -> Option<&'a str>) -> Self {
        Self {
            feature_box: flag(header(FEATURE_BOX_HEADER)),
            feature_ext: flag(header(FEATURE_EXT_HEADER)),
        }
    }
}

fn flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}
