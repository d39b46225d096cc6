//! Configuration loader using figment.
//!
//! Sources are layered, lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. TOML file (`courier.toml` in the working directory, or an explicit
//!    path) when the `toml-config` feature is enabled
//! 3. Environment variables
//! 4. Programmatic overrides via [`ConfigLoader::merge`]
//!
//! # Environment Variable Mapping
//!
//! Variables use the `COURIER_` prefix with `__` as the section separator:
//!
//! - `COURIER_API__TOKEN=123:abc` maps to `api.token`
//! - `COURIER_LOGGING__LEVEL=debug` maps to `logging.level`
//! - `COURIER_POLLER__DROP_PENDING=true` maps to `poller.drop_pending`

use std::path::PathBuf;

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use tracing::debug;

use super::schema::CourierConfig;
use crate::error::{ConfigError, ConfigResult};

/// Default config file name searched in the working directory.
#[cfg(feature = "toml-config")]
const DEFAULT_CONFIG_FILE: &str = "courier.toml";

/// Configuration loader with figment-based multi-source support.
///
/// # Example
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .file("config/courier.toml")
///     .load()?;
/// ```
pub struct ConfigLoader {
    /// Specific config file to load instead of the default search.
    config_file: Option<PathBuf>,
    /// Whether to layer environment variables on top.
    load_env: bool,
    /// Programmatic overrides, applied last.
    overrides: Option<CourierConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with defaults (working-directory file plus env).
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: true,
            overrides: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Enables layering environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables layering environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges programmatic overrides, applied with the highest priority.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.overrides = Some(config);
        self
    }

    /// Loads and extracts the configuration.
    pub fn load(self) -> ConfigResult<CourierConfig> {
        let mut figment = Figment::from(Serialized::defaults(CourierConfig::default()));

        #[cfg(feature = "toml-config")]
        {
            let path = self
                .config_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            debug!(path = %path.display(), "layering config file");
            figment = figment.merge(Toml::file(path));
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed("COURIER_").split("__"));
        }

        if let Some(overrides) = self.overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract().map_err(ConfigError::from)
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<CourierConfig> {
    ConfigLoader::new().load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_without_file_or_env() {
        let config = ConfigLoader::new().without_env().load().unwrap();
        assert_eq!(config.poller.limit, 100);
        assert!(config.api.token.is_empty());
    }

    #[test]
    fn programmatic_overrides_win() {
        let mut overrides = CourierConfig::default();
        overrides.api.token = "123:abc".to_string();
        overrides.poller.limit = 10;

        let config = ConfigLoader::new()
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();

        assert_eq!(config.api.token, "123:abc");
        assert_eq!(config.poller.limit, 10);
    }
}
