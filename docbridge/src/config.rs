//! Service configuration.
//!
//! A [`ServiceConfig`] selects one backend and carries its credentials. It is
//! plain serde data, so it can be embedded in a larger application config or
//! loaded on its own from JSON:
//!
//! ```ignore
//! use docbridge::config::ServiceConfig;
//!
//! let config = ServiceConfig::from_json_str(r#"{
//!     "backend": { "provider": "flat", "uri": "mongodb://localhost:27017", "database": "app" }
//! }"#)?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use docbridge_core::{
    backend::BackendKind,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Top-level configuration of a [`DataService`](crate::service::DataService).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub backend: BackendConfig,
}

impl ServiceConfig {
    pub fn new(backend: BackendConfig) -> Self {
        Self { backend }
    }

    /// Configuration for the hierarchical backend.
    pub fn hierarchical(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self::new(BackendConfig::Hierarchical(HierarchicalConfig {
            api_key: api_key.into(),
            project_id: project_id.into(),
            max_batch_writes: None,
        }))
    }

    /// Configuration for the flat backend, with transactions on.
    pub fn flat(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self::new(BackendConfig::Flat(FlatConfig {
            uri: uri.into(),
            database: database.into(),
            transactions: true,
        }))
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Serialization`] if the JSON is malformed
    /// or names an unknown provider.
    pub fn from_json_str(json: &str) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a configuration from an already decoded JSON value.
    pub fn from_json_value(value: Value) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Backend selection, tagged by `provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum BackendConfig {
    Hierarchical(HierarchicalConfig),
    Flat(FlatConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Hierarchical(_) => BackendKind::Hierarchical,
            BackendConfig::Flat(_) => BackendKind::Flat,
        }
    }

    /// Checks that every required credential field is present.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidCredentials`] naming the first blank field.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        let required = match self {
            BackendConfig::Hierarchical(config) => [("apiKey", &config.api_key), ("projectId", &config.project_id)],
            BackendConfig::Flat(config) => [("uri", &config.uri), ("database", &config.database)],
        };

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(DocumentStoreError::InvalidCredentials(format!(
                "{} is required for the {:?} backend",
                field,
                self.kind()
            ))),
            None => Ok(()),
        }
    }
}

/// Credentials and options of the hierarchical backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_id: String,
    /// Overrides the backend's default batch limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_writes: Option<usize>,
}

/// Credentials and options of the flat backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatConfig {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub database: String,
    /// Run batches in session transactions. Needs a replica set.
    #[serde(default = "default_transactions")]
    pub transactions: bool,
}

fn default_transactions() -> bool {
    true
}
