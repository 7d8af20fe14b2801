//! # Status Cache Configuration
//!
//! Explicit configuration for the status poller and reader. Every knob lives
//! on [`StatusCacheConfig`], which is passed to constructors; nothing is read
//! from process globals after loading, so independently configured instances
//! can coexist (notably in tests).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use status_cache_manager::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! let interval = manager.config().poll_interval();
//! let prefix = &manager.config().key_prefix;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{keys, system};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// What a tick does after a runtime read or cache write fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickFailurePolicy {
    /// Abandon the rest of the tick; remaining namespaces wait for the next one
    #[default]
    AbortTick,
    /// Give up on the failing namespace only and carry on with the others
    SkipNamespace,
}

/// Root configuration for the status cache manager
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusCacheConfig {
    /// Whether the background poller runs at all
    pub enabled: bool,

    /// Seconds between poll ticks
    pub poll_interval_seconds: u64,

    /// First key component, including its trailing `/`
    pub key_prefix: String,

    /// Run the first tick immediately rather than after one interval
    pub poll_on_start: bool,

    pub tick_failure_policy: TickFailurePolicy,

    /// How long `stop()` waits for the loop to exit before aborting it
    pub shutdown_timeout_seconds: u64,
}

impl Default for StatusCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: system::DEFAULT_POLL_INTERVAL_SECONDS,
            key_prefix: keys::STATUS_PREFIX.to_string(),
            poll_on_start: false,
            tick_failure_policy: TickFailurePolicy::default(),
            shutdown_timeout_seconds: system::DEFAULT_SHUTDOWN_TIMEOUT_SECONDS,
        }
    }
}

impl StatusCacheConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    /// Validate the configuration
    ///
    /// The key prefix must be exactly one key component so that status keys
    /// keep splitting into three parts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.poll_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "poll_interval_seconds",
                "0",
                "poll interval must be greater than 0",
            ));
        }

        validate_key_prefix(&self.key_prefix)
    }
}

/// Check that `prefix` is a single non-empty key component ending in `/`
pub fn validate_key_prefix(prefix: &str) -> Result<(), ConfigurationError> {
    if prefix.is_empty() {
        return Err(ConfigurationError::missing_required_field(
            "key_prefix",
            "status cache configuration",
        ));
    }

    if !prefix.ends_with(keys::COMPONENT_SEPARATOR) {
        return Err(ConfigurationError::invalid_value(
            "key_prefix",
            prefix,
            "key prefix must end with '/'",
        ));
    }

    if prefix.matches(keys::COMPONENT_SEPARATOR).count() != 1 || prefix.len() == 1 {
        return Err(ConfigurationError::invalid_value(
            "key_prefix",
            prefix,
            "key prefix must be a single non-empty component followed by '/'",
        ));
    }

    Ok(())
}
