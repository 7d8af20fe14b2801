//! In-process status store
//!
//! Ordered map behind a `parking_lot::RwLock`. Prefix reads are range scans
//! starting at the prefix, so they touch only matching keys.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use super::{StatusStore, StoreRecord, StoreResult};

#[derive(Debug, Clone, Default)]
pub struct MemoryStatusStore {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Raw value under `key`, bypassing the prefix contract
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    /// Every record in key order
    pub fn snapshot(&self) -> Vec<StoreRecord> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| StoreRecord::new(k.clone(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn write(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn read_prefix(&self, prefix: &str) -> StoreResult<Vec<StoreRecord>> {
        let entries = self.entries.read();
        let records = entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| StoreRecord::new(k.clone(), v.clone()))
            .collect();
        Ok(records)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
