//! Field descriptor inference from feature properties.

use layerstore_common::{FieldDescriptor, FieldType};
use log::debug;
use serde_json::Value;

use crate::parser::{FeatureRecord, describe_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InferredScalarType {
    Null,
    Boolean,
    Integer,
    Real,
    String,
}

impl InferredScalarType {
    fn update(self, value: &Value) -> Self {
        match value {
            Value::Null => self,
            Value::Bool(_) => match self {
                Self::Null | Self::Boolean => Self::Boolean,
                _ => Self::String,
            },
            Value::Number(n) => {
                let is_int = n.is_i64();
                match self {
                    Self::Null | Self::Integer => {
                        if is_int {
                            Self::Integer
                        } else {
                            Self::Real
                        }
                    },
                    Self::Real => Self::Real,
                    _ => Self::String,
                }
            },
            Value::String(_) | Value::Array(_) | Value::Object(_) => Self::String,
        }
    }

    fn to_field_type(self) -> FieldType {
        match self {
            Self::Null | Self::String => FieldType::String,
            Self::Boolean => FieldType::Boolean,
            Self::Integer => FieldType::Integer,
            Self::Real => FieldType::Real,
        }
    }
}

/// Infers one field per property key, in order of first appearance.
///
/// Field ids are assigned from 1. A key whose values disagree on type
/// widens to a string field.
pub(crate) fn infer_fields(records: &[FeatureRecord]) -> Vec<FieldDescriptor> {
    let mut inferred: Vec<(String, InferredScalarType)> = Vec::new();

    for record in records {
        for (key, value) in &record.properties {
            let position = inferred.iter().position(|(name, _)| name == key);
            let index = position.unwrap_or_else(|| {
                inferred.push((key.clone(), InferredScalarType::Null));
                inferred.len() - 1
            });
            let entry = &mut inferred[index].1;
            let updated = entry.update(value);
            if *entry != InferredScalarType::Null && updated != *entry {
                debug!(
                    "Field '{key}' widened from {entry:?} to {updated:?} by a {} value",
                    describe_value(value)
                );
            }
            *entry = updated;
        }
    }

    inferred
        .into_iter()
        .zip(1..)
        .map(|((name, ty), id)| FieldDescriptor::new(id, name, ty.to_field_type()))
        .collect()
}
