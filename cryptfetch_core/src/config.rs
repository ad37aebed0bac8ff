//! Registry configuration
//!
//! Configuration is layered with figment: built-in defaults, then the TOML
//! file (if it exists), then `CRYPTFETCH_*` environment variables.

use crate::error::{Result, ValidationError};
use crate::property::PropertyQuery;
use crate::store::DEFAULT_CACHE_CAPACITY;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CRYPTFETCH_";

/// Settings applied by [`Registry::from_config`](crate::Registry::from_config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Default property query merged under every fetch
    pub default_properties: String,
    /// Load the built-in "default" provider
    pub load_default_provider: bool,
    /// Fall back to legacy built-in digests when no provider offers a name
    pub legacy_fallback: bool,
    /// Maximum cached query results before the cache is flushed (0 disables it)
    pub cache_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_properties: String::new(),
            load_default_provider: true,
            legacy_fallback: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl RegistryConfig {
    /// Check that the configured values are usable
    pub fn validate(&self) -> Result<()> {
        PropertyQuery::parse(&self.default_properties).map_err(|e| {
            ValidationError::invalid_configuration(&format!("default_properties: {e}"))
        })?;
        Ok(())
    }
}

/// Loads [`RegistryConfig`] from XDG-compliant paths and the environment
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader reading the default configuration path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a loader reading a specific file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Default XDG-compliant configuration path
    pub fn default_config_path() -> PathBuf {
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("cryptfetch/config.toml");
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cryptfetch")
            .join("config.toml")
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<RegistryConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(RegistryConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: RegistryConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}
