//! # Status Poller
//!
//! Background service that refreshes the status cache from the runtime.
//!
//! ## Poll Flow
//!
//! 1. Timer tick triggers a poll cycle
//! 2. The namespace lister enumerates namespaces
//! 3. The runtime lists each namespace's services
//! 4. Every service carrying metadata has its status written under
//!    `status/<namespace>/<name>:<version>`
//!
//! The poller is the only writer to the cache. It never deletes: a service
//! that disappears from the runtime keeps its last cached status.
//!
//! ## Failure Policy
//!
//! A namespace listing failure abandons the tick. A runtime read or cache
//! write failure abandons the rest of the tick under
//! [`TickFailurePolicy::AbortTick`], or only the failing namespace under
//! [`TickFailurePolicy::SkipNamespace`]. Either way the loop carries on with
//! the next tick; nothing here is fatal.

pub mod tick;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn, Level};
use uuid::Uuid;

use crate::config::{StatusCacheConfig, TickFailurePolicy};
use crate::constants::operations;
use crate::error::{Result, StatusCacheError};
use crate::runtime::{NamespaceLister, ServiceDescriptor, ServiceRuntime};
use crate::status::{encode_key, encode_value, key, ServiceStatus};
use crate::store::StatusStore;

pub use tick::{TickFailure, TickPhase, TickReport};
use tick::TickState;

/// What happened to one service during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Written,
    /// The runtime reported no metadata, so there is no status to record
    NoMetadata,
    /// Name or version would break the key grammar
    UnaddressableKey,
}

pub struct StatusPoller {
    config: StatusCacheConfig,
    runtime: Arc<dyn ServiceRuntime>,
    namespaces: Arc<dyn NamespaceLister>,
    store: Arc<dyn StatusStore>,
    poller_id: Uuid,
    last_report: Mutex<Option<TickReport>>,
    /// Set once a tick has written anything
    first_write_seen: AtomicBool,
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller")
            .field("poller_id", &self.poller_id)
            .field("config", &self.config)
            .field("store", &self.store.provider_name())
            .finish_non_exhaustive()
    }
}

impl StatusPoller {
    /// Create a poller over the given collaborators
    ///
    /// The configuration is validated here: a zero interval or a key prefix
    /// that is not a single component is rejected before any loop can start.
    pub fn new(
        config: StatusCacheConfig,
        runtime: Arc<dyn ServiceRuntime>,
        namespaces: Arc<dyn NamespaceLister>,
        store: Arc<dyn StatusStore>,
    ) -> Result<Self> {
        config.validate()?;
        let poller_id = Uuid::new_v4();

        debug!(
            poller_id = %poller_id,
            interval_seconds = config.poll_interval_seconds,
            key_prefix = %config.key_prefix,
            store = store.provider_name(),
            "Creating StatusPoller"
        );

        Ok(Self {
            config,
            runtime,
            namespaces,
            store,
            poller_id,
            last_report: Mutex::new(None),
            first_write_seen: AtomicBool::new(false),
        })
    }

    /// Run the poll loop until `shutdown` fires or its sender is dropped
    ///
    /// Shutdown is honoured both between ticks and during one; an in-flight
    /// tick is abandoned, leaving whatever it already wrote in place.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.config.poll_interval();
        let first_tick = if self.config.poll_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            poller_id = %self.poller_id,
            interval_seconds = self.config.poll_interval_seconds,
            poll_on_start = self.config.poll_on_start,
            policy = ?self.config.tick_failure_policy,
            "Starting status poll loop"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => {
                    info!(poller_id = %self.poller_id, "Status poll loop shutting down");
                    break;
                }
            }

            tokio::select! {
                _ = self.run_tick() => {}
                _ = shutdown.recv() => {
                    warn!(poller_id = %self.poller_id, "Status poll loop shutting down mid-tick");
                    break;
                }
            }
        }
    }

    /// Run one tick to completion and return what it did
    pub async fn run_tick(&self) -> TickReport {
        let started = std::time::Instant::now();
        let mut report = TickReport::begin();
        let mut state = TickState::Start;

        loop {
            trace!(poller_id = %self.poller_id, phase = %state.phase(), "Tick transition");
            state = match state {
                TickState::Start => TickState::ListNamespaces,
                TickState::ListNamespaces => match self.namespaces.list().await {
                    Ok(namespaces) => {
                        report.namespaces_listed = namespaces.len();
                        TickState::ReadServices {
                            pending: namespaces.into(),
                        }
                    }
                    Err(source) => {
                        let err = StatusCacheError::NamespaceList { source };
                        self.record_failure(&mut report, TickPhase::ListNamespaces, None, &err);
                        report.aborted_in = Some(TickPhase::ListNamespaces);
                        TickState::Idle
                    }
                },
                TickState::ReadServices { mut pending } => match pending.pop_front() {
                    None => TickState::Idle,
                    Some(namespace) if !key::is_valid_namespace(&namespace) => {
                        warn!(
                            poller_id = %self.poller_id,
                            namespace = %namespace,
                            "Skipping namespace that cannot form a status key"
                        );
                        TickState::ReadServices { pending }
                    }
                    Some(namespace) => match self.runtime.read(&namespace).await {
                        Ok(services) => {
                            crate::log_poller!(trace, operations::READ_SERVICES,
                                namespace: namespace,
                                services: services.len()
                            );
                            TickState::DeriveAndWrite {
                                namespace,
                                services: services.into(),
                                pending,
                            }
                        }
                        Err(source) => {
                            let err = StatusCacheError::RuntimeRead {
                                namespace: namespace.clone(),
                                source,
                            };
                            self.on_namespace_failure(
                                &mut report,
                                TickPhase::ReadServices,
                                namespace,
                                &err,
                                pending,
                            )
                        }
                    },
                },
                TickState::DeriveAndWrite {
                    namespace,
                    mut services,
                    pending,
                } => match services.pop_front() {
                    None => {
                        report.namespaces_refreshed += 1;
                        TickState::ReadServices { pending }
                    }
                    Some(service) => match self.cache_status(&namespace, &service).await {
                        Ok(outcome) => {
                            match outcome {
                                CacheOutcome::Written => report.services_written += 1,
                                CacheOutcome::NoMetadata | CacheOutcome::UnaddressableKey => {
                                    report.services_skipped += 1
                                }
                            }
                            TickState::DeriveAndWrite {
                                namespace,
                                services,
                                pending,
                            }
                        }
                        Err(err) => self.on_namespace_failure(
                            &mut report,
                            TickPhase::DeriveAndWrite,
                            namespace,
                            &err,
                            pending,
                        ),
                    },
                },
                TickState::Idle => break,
            };
        }

        report.duration = started.elapsed();
        self.log_report(&report);
        *self.last_report.lock() = Some(report.clone());
        report
    }

    /// Derive one service's status and write it to the cache
    ///
    /// Services without metadata are skipped, not treated as errors. Encoding
    /// and write failures are returned so the tick can apply its policy.
    pub async fn cache_status(
        &self,
        namespace: &str,
        service: &ServiceDescriptor,
    ) -> Result<CacheOutcome> {
        let metadata = match service.metadata.as_ref() {
            Some(md) if !md.is_empty() => md,
            _ => return Ok(CacheOutcome::NoMetadata),
        };

        if !key::is_valid_service(&service.name, &service.version) {
            warn!(
                poller_id = %self.poller_id,
                namespace = %namespace,
                service = %service.service_id(),
                "Skipping service whose name or version cannot form a status key"
            );
            return Ok(CacheOutcome::UnaddressableKey);
        }

        let key = encode_key(&self.config.key_prefix, namespace, &service.name, &service.version);
        let status = ServiceStatus::from_metadata(metadata);
        let bytes = encode_value(&key, &status)?;

        self.store
            .write(&key, bytes)
            .await
            .map_err(|source| StatusCacheError::CacheWrite {
                key: key.clone(),
                source,
            })?;

        crate::log_poller!(trace, operations::CACHE_STATUS,
            key: key,
            status: status.status,
            has_error: status.has_error()
        );

        Ok(CacheOutcome::Written)
    }

    /// Report from the most recent tick, if any has run
    pub fn last_report(&self) -> Option<TickReport> {
        self.last_report.lock().clone()
    }

    pub fn config(&self) -> &StatusCacheConfig {
        &self.config
    }

    pub fn poller_id(&self) -> Uuid {
        self.poller_id
    }

    fn on_namespace_failure(
        &self,
        report: &mut TickReport,
        phase: TickPhase,
        namespace: String,
        err: &StatusCacheError,
        pending: VecDeque<String>,
    ) -> TickState {
        self.record_failure(report, phase, Some(namespace), err);
        match self.config.tick_failure_policy {
            TickFailurePolicy::AbortTick => {
                report.aborted_in = Some(phase);
                TickState::Idle
            }
            TickFailurePolicy::SkipNamespace => TickState::ReadServices { pending },
        }
    }

    fn record_failure(
        &self,
        report: &mut TickReport,
        phase: TickPhase,
        namespace: Option<String>,
        err: &StatusCacheError,
    ) {
        let operation = match phase {
            TickPhase::ListNamespaces => operations::LIST_NAMESPACES,
            TickPhase::ReadServices => operations::READ_SERVICES,
            _ => operations::CACHE_STATUS,
        };
        warn!(
            poller_id = %self.poller_id,
            operation = operation,
            phase = %phase,
            namespace = namespace.as_deref().unwrap_or(""),
            error = %err,
            "Status poll step failed"
        );
        report.failures.push(TickFailure {
            phase,
            namespace,
            error: err.to_string(),
        });
    }

    /// Level for a tick summary: `warn` on failures, `info` for the first
    /// tick of this poller that wrote anything, `debug` otherwise
    fn summary_level(&self, report: &TickReport) -> Level {
        if !report.is_clean() {
            return Level::WARN;
        }
        if report.services_written > 0 && !self.first_write_seen.swap(true, Ordering::Relaxed) {
            return Level::INFO;
        }
        Level::DEBUG
    }

    fn log_report(&self, report: &TickReport) {
        match self.summary_level(report) {
            Level::INFO => crate::log_poller!(info, operations::TICK,
                poller_id: self.poller_id,
                namespaces: report.namespaces_refreshed,
                written: report.services_written,
                skipped: report.services_skipped,
                duration_ms: report.duration.as_millis()
            ),
            Level::WARN => crate::log_poller!(warn, operations::TICK,
                poller_id: self.poller_id,
                namespaces_listed: report.namespaces_listed,
                namespaces_refreshed: report.namespaces_refreshed,
                written: report.services_written,
                failures: report.failures.len(),
                aborted_in: report.aborted_in,
                duration_ms: report.duration.as_millis()
            ),
            _ => crate::log_poller!(debug, operations::TICK,
                poller_id: self.poller_id,
                namespaces: report.namespaces_refreshed,
                written: report.services_written,
                skipped: report.services_skipped,
                duration_ms: report.duration.as_millis()
            ),
        }
    }
}
