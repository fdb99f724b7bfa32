//! `GeoJSON` feature layers for `layerstore`.
//!
//! [`GeoJsonLayer`] loads a `FeatureCollection`, a single `Feature` or
//! geometry, or a newline-delimited `GeoJSON` sequence into memory and serves
//! it through the `layerstore-common` layer contract. Field descriptors are
//! inferred from feature properties; spatial filtering uses the `geo` crate.
//!
//! # Examples
//!
//! ```
//! use layerstore_common::{FeatureLayer, FeatureQuery};
//! use layerstore_geojson::{GeoJsonLayer, GeoJsonLayerOptions};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let data = br#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},"properties":{"name":"A"}}"#;
//! let layer = GeoJsonLayer::from_bytes(1, data, "inline", GeoJsonLayerOptions::new()).unwrap();
//!
//! let result = layer.execute(&FeatureQuery::new().like("a")).await.unwrap();
//! assert_eq!(result.total_count(), 1);
//! # }
//! ```

pub mod error;
pub mod layer;
pub mod parser;
mod schema;

pub use error::{GeoJsonReadError, GeoJsonResult, SourcePosition};
pub use layer::{GEOJSON_SRID, GeoJsonLayer, GeoJsonLayerOptions};
pub use parser::{FeatureRecord, parse_geojson_bytes};
