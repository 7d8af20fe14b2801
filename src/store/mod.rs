//! # Status Store
//!
//! The key-value contract status records are cached in. Only two operations
//! are needed: an idempotent upsert and a prefix query. Backends provide their
//! own per-key atomicity; nothing above this trait takes locks around it.
//!
//! ```text
//! StatusStore (trait)
//!   └── MemoryStatusStore   <- ordered in-process map, range-scanned by prefix
//! ```

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStatusStore;

/// Errors that can occur during store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to reach the store backend
    #[error("Store connection error: {0}")]
    ConnectionError(String),

    /// Store operation timed out
    #[error("Store operation timed out: {0}")]
    Timeout(String),

    /// Generic backend error
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One key/value pair returned from a prefix read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRecord {
    pub key: String,
    pub value: Vec<u8>,
}

impl StoreRecord {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Insert or overwrite the value stored under `key`
    async fn write(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Every record whose key starts with `prefix`; empty when nothing matches
    async fn read_prefix(&self, prefix: &str) -> StoreResult<Vec<StoreRecord>>;

    /// Name of the backend, for logging
    fn provider_name(&self) -> &'static str;
}
