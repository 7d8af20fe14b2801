//! # Status Cache Manager
//!
//! Owns the poller's background task and the read side. This is the
//! entry point an embedding service constructs once and keeps for its
//! lifetime.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use status_cache_manager::{
//!     MemoryStatusStore, StaticNamespaces, StatusCacheConfig, StatusCacheManager,
//! };
//! # use status_cache_manager::ServiceRuntime;
//!
//! # async fn example(runtime: Arc<dyn ServiceRuntime>) -> status_cache_manager::Result<()> {
//! let mut manager = StatusCacheManager::new(
//!     StatusCacheConfig::default(),
//!     runtime,
//!     Arc::new(StaticNamespaces::new(["default"])),
//!     Arc::new(MemoryStatusStore::new()),
//! )?;
//!
//! manager.start()?;
//! let statuses = manager.list_statuses("default").await?;
//! manager.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::StatusCacheConfig;
use crate::error::Result;
use crate::poller::{StatusPoller, TickReport};
use crate::reader::StatusReader;
use crate::runtime::{NamespaceLister, ServiceDescriptor, ServiceRuntime};
use crate::status::ServiceStatus;
use crate::store::StatusStore;

pub struct StatusCacheManager {
    config: StatusCacheConfig,
    poller: Arc<StatusPoller>,
    reader: StatusReader,
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for StatusCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCacheManager")
            .field("poller_id", &self.poller.poller_id())
            .field("config", &self.config)
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl StatusCacheManager {
    /// Validate `config` and wire the poller and reader to the same store
    pub fn new(
        config: StatusCacheConfig,
        runtime: Arc<dyn ServiceRuntime>,
        namespaces: Arc<dyn NamespaceLister>,
        store: Arc<dyn StatusStore>,
    ) -> Result<Self> {
        let poller = Arc::new(StatusPoller::new(
            config.clone(),
            runtime,
            namespaces,
            Arc::clone(&store),
        )?);
        let reader = StatusReader::from_config(store, &config)?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            poller,
            reader,
            shutdown_tx,
            task: None,
        })
    }

    /// Spawn the poll loop on the current tokio runtime
    pub fn start(&mut self) -> Result<()> {
        if !self.config.enabled {
            info!(poller_id = %self.poller_id(), "Status polling disabled");
            return Ok(());
        }

        if self.is_running() {
            warn!(poller_id = %self.poller_id(), "Status poller already running");
            return Ok(());
        }

        let poller = Arc::clone(&self.poller);
        let shutdown_rx = self.shutdown_tx.subscribe();
        self.task = Some(tokio::spawn(async move { poller.run(shutdown_rx).await }));

        info!(
            poller_id = %self.poller_id(),
            interval_seconds = self.config.poll_interval_seconds,
            "Status poller started"
        );
        Ok(())
    }

    /// Signal the poll loop to stop and wait for it
    ///
    /// The loop is aborted if it has not exited within the configured
    /// shutdown timeout.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        info!(poller_id = %self.poller_id(), "Stopping status poller");
        // No receivers only means the loop already exited
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.config.shutdown_timeout(), &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(poller_id = %self.poller_id(), error = %e, "Status poll task ended abnormally");
            }
            Err(_) => {
                warn!(
                    poller_id = %self.poller_id(),
                    timeout_seconds = self.config.shutdown_timeout_seconds,
                    "Status poller did not stop in time, aborting"
                );
                task.abort();
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Run one tick immediately, outside the timer
    pub async fn poll_now(&self) -> TickReport {
        self.poller.run_tick().await
    }

    pub fn last_report(&self) -> Option<TickReport> {
        self.poller.last_report()
    }

    pub async fn list_statuses(&self, namespace: &str) -> Result<HashMap<String, ServiceStatus>> {
        self.reader.list_statuses(namespace).await
    }

    pub async fn annotate_services(
        &self,
        namespace: &str,
        services: &mut [ServiceDescriptor],
    ) -> Result<usize> {
        self.reader.annotate_services(namespace, services).await
    }

    pub fn reader(&self) -> &StatusReader {
        &self.reader
    }

    pub fn poller(&self) -> &Arc<StatusPoller> {
        &self.poller
    }

    pub fn config(&self) -> &StatusCacheConfig {
        &self.config
    }

    pub fn poller_id(&self) -> Uuid {
        self.poller.poller_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationError;
    use crate::error::StatusCacheError;
    use crate::runtime::{RuntimeError, StaticNamespaces};
    use crate::store::MemoryStatusStore;
    use async_trait::async_trait;

    struct EmptyRuntime;

    #[async_trait]
    impl ServiceRuntime for EmptyRuntime {
        async fn read(&self, _namespace: &str) -> std::result::Result<Vec<ServiceDescriptor>, RuntimeError> {
            Ok(Vec::new())
        }
    }

    fn manager(config: StatusCacheConfig) -> Result<StatusCacheManager> {
        StatusCacheManager::new(
            config,
            Arc::new(EmptyRuntime),
            Arc::new(StaticNamespaces::new(["default"])),
            Arc::new(MemoryStatusStore::new()),
        )
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = manager(StatusCacheConfig {
            key_prefix: "nested/prefix/".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            StatusCacheError::Configuration(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_disabled_manager_does_not_start() {
        let mut manager = manager(StatusCacheConfig {
            enabled: false,
            ..Default::default()
        })
        .unwrap();

        manager.start().unwrap();
        assert!(!manager.is_running());
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut manager = manager(StatusCacheConfig::default()).unwrap();

        manager.start().unwrap();
        assert!(manager.is_running());
        manager.start().unwrap();

        manager.stop().await.unwrap();
        assert!(!manager.is_running());
    }
}
