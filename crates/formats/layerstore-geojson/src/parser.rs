//! `GeoJSON` parsing into feature records.
//!
//! A document is read as a single `GeoJSON` object first (`FeatureCollection`,
//! `Feature` or bare geometry). If that fails it is retried as a `GeoJSON` text
//! sequence with one object per line.

use std::convert::TryInto;
use std::fmt;

use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{
    Feature, FeatureCollection, GeoJson, Geometry as GeoJsonGeometry, JsonObject, JsonValue,
};
use log::debug;

use crate::error::{GeoJsonReadError, GeoJsonResult, SourcePosition};

/// Parsed `GeoJSON` feature with materialized properties and geometry.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Integer feature id, if the document carries one.
    pub id: Option<i64>,
    pub properties: JsonObject,
    pub geometry: Option<Geometry<f64>>,
}

/// Parse raw bytes into a vector of `FeatureRecord`s.
///
/// # Errors
///
/// Returns [`GeoJsonReadError::Parse`] if the bytes are neither a `GeoJSON`
/// object nor a non-empty `GeoJSON` sequence.
pub fn parse_geojson_bytes(
    bytes: &[u8],
    context: impl Into<String>,
) -> GeoJsonResult<Vec<FeatureRecord>> {
    let context = context.into();
    let reader = std::io::Cursor::new(bytes);

    match GeoJson::from_reader(reader) {
        Ok(geojson) => geojson_to_records(geojson, &context),
        Err(primary_err) => {
            let primary_err_message = primary_err.to_string();
            match parse_geojson_sequence(bytes, &context) {
                Ok(records) => Ok(records),
                Err(sequence_err) => {
                    Err(combine_errors(&primary_err_message, &sequence_err, context))
                },
            }
        },
    }
}

fn geojson_to_records(geojson: GeoJson, context: &str) -> GeoJsonResult<Vec<FeatureRecord>> {
    match geojson {
        GeoJson::FeatureCollection(collection) => feature_collection_to_records(collection, context),
        GeoJson::Feature(feature) => Ok(vec![feature_to_record(feature, context)?]),
        GeoJson::Geometry(geometry) => {
            let geometry = convert_geometry(geometry, context)?;
            Ok(vec![FeatureRecord {
                id: None,
                properties: JsonObject::new(),
                geometry: Some(geometry),
            }])
        },
    }
}

fn feature_collection_to_records(
    collection: FeatureCollection,
    context: &str,
) -> GeoJsonResult<Vec<FeatureRecord>> {
    collection
        .features
        .into_iter()
        .map(|feature| feature_to_record(feature, context))
        .collect()
}

fn feature_to_record(feature: Feature, context: &str) -> GeoJsonResult<FeatureRecord> {
    let geometry = match feature.geometry {
        Some(geometry) => Some(convert_geometry(geometry, context)?),
        None => None,
    };

    Ok(FeatureRecord {
        id: feature.id.as_ref().and_then(integer_id),
        properties: feature.properties.unwrap_or_default(),
        geometry,
    })
}

fn integer_id(id: &Id) -> Option<i64> {
    let parsed = match id {
        Id::Number(n) => n.as_i64(),
        Id::String(s) => s.parse().ok(),
    };
    if parsed.is_none() {
        debug!("Ignoring non-integer feature id {id:?}");
    }
    parsed
}

fn convert_geometry(geometry: GeoJsonGeometry, context: &str) -> GeoJsonResult<Geometry<f64>> {
    geometry.try_into().map_err(|err| GeoJsonReadError::Parse {
        message: format!("Failed to convert GeoJSON geometry: {err}"),
        position: None,
        context: context.to_string(),
    })
}

fn parse_geojson_sequence(bytes: &[u8], context: &str) -> GeoJsonResult<Vec<FeatureRecord>> {
    let mut records = Vec::new();
    for (line_idx, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let position = SourcePosition {
            line: Some((line_idx + 1) as u64),
            record: Some((records.len() + 1) as u64),
        };
        let line = match std::str::from_utf8(raw_line) {
            Ok(line) => line.trim(),
            Err(err) => {
                return Err(GeoJsonReadError::Parse {
                    message: format!("GeoJSON line is not valid UTF-8: {err}"),
                    position: Some(position),
                    context: context.to_string(),
                });
            },
        };

        if line.is_empty() {
            continue;
        }

        let geojson = line
            .parse::<GeoJson>()
            .map_err(|err| GeoJsonReadError::Parse {
                message: format!("Failed to parse GeoJSON feature: {err}"),
                position: Some(position),
                context: context.to_string(),
            })?;

        records.append(&mut geojson_to_records(geojson, context)?);
    }

    if records.is_empty() {
        Err(GeoJsonReadError::Parse {
            message: "No GeoJSON features found".to_string(),
            position: None,
            context: context.to_string(),
        })
    } else {
        Ok(records)
    }
}

fn combine_errors(
    collection_err: &str,
    sequence_err: &GeoJsonReadError,
    context: String,
) -> GeoJsonReadError {
    let message = format!(
        "Failed to parse GeoJSON as FeatureCollection ({collection_err}); \
         also failed to parse as GeoJSON sequence: {sequence_err}"
    );
    GeoJsonReadError::Parse {
        message,
        position: None,
        context,
    }
}

/// Helper to describe JSON value kinds for log messages.
pub(crate) fn describe_value(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geom = if self.geometry.is_some() {
            "Some(Geometry)"
        } else {
            "None"
        };
        write!(
            f,
            "FeatureRecord(id={:?}, properties={} keys, geometry={geom})",
            self.id,
            self.properties.len()
        )
    }
}
