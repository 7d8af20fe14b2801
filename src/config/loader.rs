//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate.
//! Sources are layered, later ones winning:
//!
//! 1. Built-in defaults ([`StatusCacheConfig::default`])
//! 2. `<config_dir>/status-cache.toml` (optional)
//! 3. `<config_dir>/status-cache.<environment>.toml` (optional)
//! 4. `STATUS_CACHE__*` environment variables
//!    (e.g. `STATUS_CACHE__POLL_INTERVAL_SECONDS=10`)

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::StatusCacheConfig;

/// Base name of configuration files in the configuration directory
const CONFIG_FILE_STEM: &str = "status-cache";

/// Prefix of environment variable overrides
const ENV_PREFIX: &str = "STATUS_CACHE";

/// Separator between prefix and nested keys in environment overrides
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: StatusCacheConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Load configuration with an explicit set of `STATUS_CACHE__*` overrides
    /// standing in for the process environment
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let explicit_dir = config_dir.is_some();
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        if explicit_dir && !config_directory.is_dir() {
            return Err(ConfigurationError::directory_not_found(config_directory));
        }

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::build_config(&config_directory, environment, overrides)?;
        config.validate()?;

        crate::log_poller!(info, "Configuration loaded successfully",
            environment: environment,
            poll_interval_seconds: config.poll_interval_seconds,
            key_prefix: config.key_prefix.clone(),
            tick_failure_policy: config.tick_failure_policy
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &StatusCacheConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON, for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    fn build_config(
        config_directory: &Path,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<StatusCacheConfig> {
        let load_err = |e: config::ConfigError| ConfigurationError::load_error(environment, e);

        let defaults = Config::try_from(&StatusCacheConfig::default()).map_err(load_err)?;
        let base_file = config_directory.join(format!("{CONFIG_FILE_STEM}.toml"));
        let env_file = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.toml"));

        debug!(
            base_file = %base_file.display(),
            base_present = base_file.exists(),
            env_file = %env_file.display(),
            env_present = env_file.exists(),
            "Resolving configuration sources"
        );

        let env_source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(overrides);

        Config::builder()
            .add_source(defaults)
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(env_source)
            .build()
            .map_err(load_err)?
            .try_deserialize::<StatusCacheConfig>()
            .map_err(load_err)
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        env::var("STATUS_CACHE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// `./config` relative to the working directory
    fn default_config_directory() -> PathBuf {
        PathBuf::from("config")
    }
}
