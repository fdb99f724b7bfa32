//! Component settings and the client capability descriptor.
//!
//! Settings are read once at startup, from a JSON file or defaults, and
//! validated before the first request is served.

use std::path::Path;

use layerstore_common::{ExtensionRegistry, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ConfigError;

/// Default maximum number of features identify returns per layer.
pub const DEFAULT_IDENTIFY_LIMIT: usize = 10;

/// Default number of layers identify queries at the same time.
pub const DEFAULT_IDENTIFY_CONCURRENCY: usize = 4;

/// Settings of the identify service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifySettings {
    /// Attributes the front end shows for identified features.
    pub attributes: Vec<String>,
    /// Maximum number of features returned per layer.
    pub feature_limit: usize,
    /// Maximum number of layers queried concurrently.
    pub concurrency: usize,
}

impl Default for IdentifySettings {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            feature_limit: DEFAULT_IDENTIFY_LIMIT,
            concurrency: DEFAULT_IDENTIFY_CONCURRENCY,
        }
    }
}

/// Settings of the feature layer component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSettings {
    /// Identify service settings.
    pub identify: IdentifySettings,
}

impl ComponentSettings {
    /// Loads and validates settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, is not valid
    /// JSON, or holds invalid values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks option values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a zero identify limit or
    /// concurrency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identify.feature_limit == 0 {
            return Err(ConfigError::InvalidOption {
                option: "identify.feature_limit".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.identify.concurrency == 0 {
            return Err(ConfigError::InvalidOption {
                option: "identify.concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Read-only descriptor telling a front end which extensions exist and what
/// identify surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSettings {
    /// `{<identity>: {displayWidget: bool}}` in registration order.
    pub extensions: JsonObject,
    /// Identify service description.
    pub identify: IdentifyClientSettings,
}

/// Identify part of [`ClientSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifyClientSettings {
    /// Attributes the front end shows for identified features.
    pub attributes: Vec<String>,
}

/// Builds the client capability descriptor.
#[must_use]
pub fn client_settings(registry: &ExtensionRegistry, settings: &ComponentSettings) -> ClientSettings {
    let extensions = registry
        .iter()
        .map(|ext| {
            (
                ext.identity().to_string(),
                json!({ "displayWidget": ext.display_widget() }),
            )
        })
        .collect();

    ClientSettings {
        extensions,
        identify: IdentifyClientSettings {
            attributes: settings.identify.attributes.clone(),
        },
    }
}
