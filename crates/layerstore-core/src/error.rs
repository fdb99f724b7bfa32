//! Custom error types for `layerstore` operations.
//!
//! Errors are split by who has to act on them: the caller ([`InputError`]),
//! the access layer ([`AccessError`]), the backend (`QueryError`), or the
//! operator ([`ConfigError`], `RegistryError`). A transport adapter turns any
//! of them into a response with [`LayerStoreError::status_code`].

use std::path::PathBuf;

use layerstore_common::{QueryError, RegistryError};
use thiserror::Error;

use crate::access::Permission;

/// Main error type for `layerstore` operations.
#[derive(Debug, Error)]
pub enum LayerStoreError {
    /// Malformed request input
    #[error(transparent)]
    Input(#[from] InputError),

    /// Missing layers or features, denied permissions, missing capabilities
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Backend query failures
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Extension registration errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The caller went away before the request completed
    #[error("Request cancelled before completion")]
    Cancelled,

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Client input errors.
///
/// These are always the caller's fault and never abort the process.
#[derive(Debug, Error)]
pub enum InputError {
    /// The range expression is not `items=<first>-<last>` with `first <= last`
    #[error("Invalid range '{value}': {reason}")]
    InvalidRange {
        /// The raw range expression
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The field list is not a JSON array of strings
    #[error("Invalid field list '{value}': {reason}")]
    InvalidFieldList {
        /// The raw field list
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The field prefix is not a JSON string
    #[error("Invalid field prefix '{value}': {reason}")]
    InvalidFieldPrefix {
        /// The raw prefix
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The geometry is not valid well-known text
    #[error("Invalid geometry: {message}")]
    InvalidGeometry {
        /// Parser message
        message: String,
    },

    /// A layer id is not an integer
    #[error("Layer id {value} is not an integer")]
    InvalidLayerId {
        /// The offending value, as JSON
        value: String,
    },

    /// The spatial reference id is not an integer
    #[error("Spatial reference id {value} is not an integer")]
    InvalidSrs {
        /// The offending value, as JSON
        value: String,
    },

    /// A required request member is absent
    #[error("Missing required parameter '{name}'")]
    MissingParameter {
        /// The parameter name
        name: &'static str,
    },

    /// The request body is not a JSON object of the expected shape
    #[error("Invalid request body: {message}")]
    InvalidBody {
        /// Why it was rejected
        message: String,
    },

    /// A field edit references a label field the layer does not have
    #[error("Layer {layer_id} has no field with id {field_id}")]
    UnknownLabelField {
        /// The edited layer
        layer_id: i64,
        /// The requested label field
        field_id: i64,
    },
}

/// Access errors for single-layer operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The layer id does not resolve
    #[error("Layer {layer_id} not found")]
    LayerNotFound {
        /// The requested layer
        layer_id: i64,
    },

    /// The feature id does not exist in the layer
    #[error("Feature {feature_id} not found in layer {layer_id}")]
    FeatureNotFound {
        /// The queried layer
        layer_id: i64,
        /// The requested feature
        feature_id: i64,
    },

    /// The caller lacks a permission on the layer
    #[error("Permission '{permission}' denied on layer {layer_id}")]
    Forbidden {
        /// The layer
        layer_id: i64,
        /// The missing permission
        permission: Permission,
    },

    /// The layer does not provide a required capability
    #[error("Layer {layer_id} does not provide {capability}")]
    NotImplemented {
        /// The layer
        layer_id: i64,
        /// The missing capability
        capability: &'static str,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },

    /// The settings file could not be read
    #[error("Failed to read settings file '{path}': {source}")]
    Read {
        /// The settings path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON of the expected shape
    #[error("Failed to parse settings file '{path}': {source}")]
    Parse {
        /// The settings path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for Results using `LayerStoreError`.
pub type Result<T> = std::result::Result<T, LayerStoreError>;

impl LayerStoreError {
    /// Returns the HTTP status a transport adapter should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Input(_)
            | Self::Query(QueryError::UnknownField { .. } | QueryError::UnsupportedFilter { .. }) => {
                400
            },
            Self::Access(AccessError::Forbidden { .. }) => 403,
            Self::Access(AccessError::LayerNotFound { .. } | AccessError::FeatureNotFound { .. }) => {
                404
            },
            Self::Query(QueryError::ReadOnly { .. }) => 405,
            Self::Cancelled => 499,
            Self::Access(AccessError::NotImplemented { .. }) => 501,
            Self::Query(_) | Self::Config(_) | Self::Registry(_) | Self::Other(_) => 500,
        }
    }

    /// Returns `true` if the caller can fix the error by changing the request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(e) => format!("Bad request: {e}"),
            Self::Access(e) => e.to_string(),
            Self::Query(e) => format!("Query error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Registry(e) => format!("Extension registry error: {e}"),
            Self::Cancelled => self.to_string(),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Input(e) => e.recovery_suggestion(),
            Self::Access(AccessError::Forbidden { permission, .. }) => Some(format!(
                "Ask the layer owner to grant the '{permission}' permission."
            )),
            Self::Access(AccessError::NotImplemented { .. }) => {
                Some("Use a layer that stores features.".to_string())
            },
            Self::Query(QueryError::UnsupportedFilter { .. }) => {
                Some("Remove the filter this layer cannot apply.".to_string())
            },
            Self::Registry(_) => {
                Some("Check that every extension identity is registered once.".to_string())
            },
            _ => None,
        }
    }
}

impl InputError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::InvalidRange { .. } => Some(
                "Use 'items=<first>-<last>' with zero-based, inclusive bounds.".to_string(),
            ),
            Self::InvalidFieldList { .. } => {
                Some("Send the field list as a JSON array of strings.".to_string())
            },
            Self::InvalidFieldPrefix { .. } => {
                Some("Send the field prefix as a JSON string, e.g. \"\\\"f_\\\"\".".to_string())
            },
            Self::InvalidGeometry { .. } => {
                Some("Send the geometry as well-known text, e.g. 'POINT(30 10)'.".to_string())
            },
            _ => None,
        }
    }
}
