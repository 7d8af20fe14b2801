//! # Status Reader
//!
//! Answers "what is the last known status of every service in namespace N?"
//! straight from the cache, never touching the runtime. Results may lag the
//! runtime by up to one poll interval plus the duration of the last tick.
//!
//! Foreign keys that share the prefix but not the key shape are dropped
//! quietly; a value that does not decode fails the whole call.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::{validate_key_prefix, StatusCacheConfig};
use crate::constants::{keys, metadata, operations};
use crate::error::{Result, StatusCacheError};
use crate::runtime::ServiceDescriptor;
use crate::status::{namespace_prefix, parse_key, parse_value, ServiceStatus};
use crate::store::StatusStore;

#[derive(Clone)]
pub struct StatusReader {
    store: Arc<dyn StatusStore>,
    key_prefix: String,
}

impl std::fmt::Debug for StatusReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReader")
            .field("store", &self.store.provider_name())
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl StatusReader {
    /// Create a reader over `store`
    ///
    /// Fails if `key_prefix` is not a single key component, since keys under
    /// such a prefix would never parse back.
    pub fn new(store: Arc<dyn StatusStore>, key_prefix: impl Into<String>) -> Result<Self> {
        let key_prefix = key_prefix.into();
        validate_key_prefix(&key_prefix)?;
        Ok(Self { store, key_prefix })
    }

    pub fn from_config(store: Arc<dyn StatusStore>, config: &StatusCacheConfig) -> Result<Self> {
        Self::new(store, config.key_prefix.clone())
    }

    /// Every cached status in `namespace`, keyed by `name:version`
    pub async fn list_statuses(&self, namespace: &str) -> Result<HashMap<String, ServiceStatus>> {
        let prefix = namespace_prefix(&self.key_prefix, namespace);
        let records = self
            .store
            .read_prefix(&prefix)
            .await
            .map_err(|source| StatusCacheError::CacheRead {
                namespace: namespace.to_string(),
                source,
            })?;

        let mut statuses = HashMap::with_capacity(records.len());
        let mut foreign = 0usize;
        for record in records {
            let status = parse_value(&record.key, &record.value)?;

            match parse_key(&record.key) {
                Some(parsed) => {
                    statuses.insert(parsed.service_id.to_string(), status);
                }
                None => foreign += 1,
            }
        }

        crate::log_poller!(trace, operations::LIST_STATUSES,
            namespace: namespace,
            statuses: statuses.len(),
            ignored_keys: foreign
        );

        Ok(statuses)
    }

    /// Cached status of one service version, if any
    pub async fn get_status(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<Option<ServiceStatus>> {
        let service_id = format!("{name}{}{version}", keys::VERSION_SEPARATOR);
        let mut statuses = self.list_statuses(namespace).await?;
        Ok(statuses.remove(&service_id))
    }

    /// Fill `status` and `error` metadata on `services` from the cache
    ///
    /// Services with no cached status are left as they are. Returns how many
    /// services were annotated.
    pub async fn annotate_services(
        &self,
        namespace: &str,
        services: &mut [ServiceDescriptor],
    ) -> Result<usize> {
        let statuses = self.list_statuses(namespace).await?;

        let mut annotated = 0;
        for service in services.iter_mut() {
            let Some(status) = statuses.get(&service.service_id()) else {
                continue;
            };
            let md = service.metadata.get_or_insert_with(HashMap::new);
            md.insert(metadata::STATUS.to_string(), status.status.clone());
            md.insert(metadata::ERROR.to_string(), status.error.clone());
            annotated += 1;
        }

        debug!(
            namespace = %namespace,
            services = services.len(),
            annotated = annotated,
            "Annotated services with cached statuses"
        );

        Ok(annotated)
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}
