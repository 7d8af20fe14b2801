//! # System Constants
//!
//! Key grammar, metadata field names, and operational defaults shared by the
//! poller, the reader, and the configuration layer.

/// Key grammar for cached status records: `status/<namespace>/<name>:<version>`
pub mod keys {
    /// Prefix every status key is written under
    pub const STATUS_PREFIX: &str = "status/";

    /// Separator between key components
    pub const COMPONENT_SEPARATOR: char = '/';

    /// Separator between a service name and its version in the last component
    pub const VERSION_SEPARATOR: char = ':';

    /// Number of components a well-formed status key splits into
    pub const KEY_COMPONENTS: usize = 3;
}

/// Metadata entries a runtime reports service health through
pub mod metadata {
    pub const STATUS: &str = "status";
    pub const ERROR: &str = "error";
}

/// Operation names used in structured log records
pub mod operations {
    pub const TICK: &str = "status_poll.tick";
    pub const LIST_NAMESPACES: &str = "status_poll.list_namespaces";
    pub const READ_SERVICES: &str = "status_poll.read_services";
    pub const CACHE_STATUS: &str = "status_poll.cache_status";
    pub const LIST_STATUSES: &str = "status_read.list_statuses";
}

/// Operational defaults
pub mod system {
    /// Interval between poll ticks
    pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 30;

    /// Time `stop()` waits for the poll loop to wind down before aborting it
    pub const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix_is_single_component() {
        assert!(keys::STATUS_PREFIX.ends_with(keys::COMPONENT_SEPARATOR));
        assert_eq!(
            keys::STATUS_PREFIX
                .matches(keys::COMPONENT_SEPARATOR)
                .count(),
            1
        );
    }
}
