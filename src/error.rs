//! # Error Types
//!
//! Crate-level error covering both halves of the status cache: the poll loop
//! (which logs and survives these) and the read path (which surfaces them).

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::runtime::RuntimeError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum StatusCacheError {
    /// Namespace enumeration failed; the whole tick is abandoned
    #[error("Error listing namespaces: {source}")]
    NamespaceList {
        #[source]
        source: RuntimeError,
    },

    /// The runtime could not list the services of one namespace
    #[error("Error reading namespace {namespace}: {source}")]
    RuntimeRead {
        namespace: String,
        #[source]
        source: RuntimeError,
    },

    /// A derived status could not be serialized
    #[error("Error encoding status for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A derived status could not be written to the cache
    #[error("Error caching status under {key}: {source}")]
    CacheWrite {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The prefix query backing a status listing failed
    #[error("Error listing statuses from the store for namespace {namespace}: {source}")]
    CacheRead {
        namespace: String,
        #[source]
        source: StoreError,
    },

    /// A cached value is not a valid status record
    #[error("Error decoding status stored under {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl StatusCacheError {
    /// Whether the error came from the runtime or namespace collaborators
    pub fn is_collaborator_error(&self) -> bool {
        matches!(self, Self::NamespaceList { .. } | Self::RuntimeRead { .. })
    }

    /// Whether the error came from the cache itself or its contents
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            Self::CacheWrite { .. } | Self::CacheRead { .. } | Self::Decode { .. } | Self::Encode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StatusCacheError>;
