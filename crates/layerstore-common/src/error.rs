//! Errors raised by layer backends and extensions.

use thiserror::Error;

/// A backend could not honour or execute a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The layer cannot apply a requested filter.
    #[error("Layer {layer_id} does not support {filter} filtering")]
    UnsupportedFilter {
        /// The queried layer
        layer_id: i64,
        /// The filter that cannot be applied (e.g., "spatial", "like")
        filter: &'static str,
    },

    /// A requested field does not exist on the layer.
    #[error("Layer {layer_id} has no field '{field}'")]
    UnknownField {
        /// The queried layer
        layer_id: i64,
        /// The requested field key
        field: String,
    },

    /// The filter geometry is in a spatial reference the backend cannot transform.
    #[error("Layer {layer_id} cannot reproject geometry from SRID {from} to SRID {to}")]
    Reprojection {
        /// The queried layer
        layer_id: i64,
        /// SRID of the filter geometry
        from: i32,
        /// Native SRID of the layer
        to: i32,
    },

    /// The layer does not accept edits.
    #[error("Layer {layer_id} is read-only")]
    ReadOnly {
        /// The layer
        layer_id: i64,
    },

    /// Execution failed inside the backend.
    #[error("Query on layer {layer_id} failed: {message}")]
    Execution {
        /// The queried layer
        layer_id: i64,
        /// Backend-provided description
        message: String,
    },
}

impl QueryError {
    /// Returns the id of the layer the error belongs to.
    #[must_use]
    pub fn layer_id(&self) -> i64 {
        match self {
            Self::UnsupportedFilter { layer_id, .. }
            | Self::UnknownField { layer_id, .. }
            | Self::Reprojection { layer_id, .. }
            | Self::ReadOnly { layer_id }
            | Self::Execution { layer_id, .. } => *layer_id,
        }
    }
}

/// An extension failed to produce its contribution.
#[derive(Debug, Error)]
#[error("Extension '{identity}' failed: {message}")]
pub struct ExtensionError {
    /// Identity of the failing extension
    pub identity: String,
    /// Description of the failure
    pub message: String,
}

impl ExtensionError {
    /// Creates an error for the extension with the given identity.
    #[must_use]
    pub fn new(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            message: message.into(),
        }
    }
}

/// Extension registration failed.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two extensions were registered under the same identity.
    #[error("Extension identity '{identity}' is already registered")]
    DuplicateIdentity {
        /// The conflicting identity
        identity: String,
    },
}
