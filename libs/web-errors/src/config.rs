//! Startup configuration for the error layer.
//!
//! Values are layered with figment: built-in defaults, then an optional YAML
//! file, then `WEB_ERRORS_*` environment variables.

use std::path::Path;
use std::sync::Arc;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::registry::{CodeMap, CodeRegistry, ErrorRegistry};

/// Environment prefix for overrides, e.g. `WEB_ERRORS_SERVICE_NAME`.
pub const ENV_PREFIX: &str = "WEB_ERRORS_";

/// Configuration error for the error layer
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load error configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("runtime_status {0} is not an HTTP error status (400..=599)")]
    InvalidStatus(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Name stamped into `properties.service`.
    pub service_name: String,
    /// Status for unrecognized failures.
    pub runtime_status: u16,
    /// Copy the message of unrecognized failures into `detail`.
    pub expose_runtime_detail: bool,
    /// Service codes merged into the registry at startup.
    pub codes: CodeMap,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            runtime_status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            expose_runtime_detail: false,
            codes: CodeMap::new(),
        }
    }
}

impl ErrorsConfig {
    /// Load defaults, then `path` (when given), then the environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Load` when a layer cannot be read or has unknown
    /// keys, and `ConfigError::InvalidStatus` for a non-error `runtime_status`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(&figment)
    }

    /// # Errors
    /// See [`ErrorsConfig::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let cfg: Self = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if (400..=599).contains(&self.runtime_status) {
            Ok(())
        } else {
            Err(ConfigError::InvalidStatus(self.runtime_status))
        }
    }

    /// Status used for unrecognized failures.
    #[must_use]
    pub fn runtime_status(&self) -> StatusCode {
        StatusCode::from_u16(self.runtime_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Seeded registry with this service's codes merged in.
    #[must_use]
    pub fn build_registry(&self) -> Arc<dyn ErrorRegistry> {
        let registry = CodeRegistry::new();
        if !self.codes.is_empty() {
            registry.merge(std::slice::from_ref(&self.codes));
        }
        Arc::new(registry)
    }
}
