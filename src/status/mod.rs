//! # Service Status
//!
//! The cached value object and its byte encoding. Values are JSON; producer
//! and consumer are the same crate, so the encoding only has to round-trip
//! with itself.
//!
//! Key parsing and value parsing deliberately fail differently:
//! [`key::parse_key`] returns `Option` and never fails its caller, while
//! [`parse_value`] returns a `Result` that the read path propagates.

pub mod key;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::metadata;
use crate::error::{Result, StatusCacheError};

pub use key::{encode_key, namespace_prefix, parse_key, ParsedStatusKey};

/// Last observed health of one deployed service version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub error: String,
}

impl ServiceStatus {
    pub fn new(status: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            error: error.into(),
        }
    }

    /// Extract a status from runtime metadata; absent entries become empty
    pub fn from_metadata(md: &HashMap<String, String>) -> Self {
        let field = |name: &str| md.get(name).cloned().unwrap_or_default();
        Self {
            status: field(metadata::STATUS),
            error: field(metadata::ERROR),
        }
    }

    /// Whether the runtime reported an error for this service
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Serialize a status for storage under `key`
pub fn encode_value(key: &str, status: &ServiceStatus) -> Result<Vec<u8>> {
    serde_json::to_vec(status).map_err(|source| StatusCacheError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Deserialize the value stored under `key`
pub fn parse_value(key: &str, bytes: &[u8]) -> Result<ServiceStatus> {
    serde_json::from_slice(bytes).map_err(|source| StatusCacheError::Decode {
        key: key.to_string(),
        source,
    })
}
