//! Scripted collaborators for status cache integration tests
//!
//! Each mock keeps its state behind `Arc<Mutex<..>>` so tests can inspect
//! calls and change behaviour between ticks.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use status_cache_manager::{
    MemoryStatusStore, NamespaceLister, RuntimeError, ServiceDescriptor, ServiceRuntime,
    StatusStore, StoreError, StoreRecord, StoreResult,
};

/// Mock runtime state for tracking calls and simulating behavior
#[derive(Debug, Default, Clone)]
pub struct MockRuntimeState {
    /// Services reported per namespace
    pub services: HashMap<String, Vec<ServiceDescriptor>>,
    /// Namespaces whose reads fail
    pub failing: HashSet<String>,
    /// Namespaces read, in call order
    pub reads: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<MockRuntimeState>>,
    /// Simulate slow runtime calls
    read_delay: Option<Duration>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn set_services(&self, namespace: &str, services: Vec<ServiceDescriptor>) {
        let mut state = self.state.lock().unwrap();
        state.services.insert(namespace.to_string(), services);
    }

    pub fn fail_namespace(&self, namespace: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing.insert(namespace.to_string());
    }

    pub fn recover_namespace(&self, namespace: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing.remove(namespace);
    }

    pub fn reads(&self) -> Vec<String> {
        self.state.lock().unwrap().reads.clone()
    }
}

#[async_trait]
impl ServiceRuntime for MockRuntime {
    async fn read(&self, namespace: &str) -> Result<Vec<ServiceDescriptor>, RuntimeError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.reads.push(namespace.to_string());

        if state.failing.contains(namespace) {
            return Err(RuntimeError::Unavailable(format!(
                "simulated failure reading {namespace}"
            )));
        }
        Ok(state.services.get(namespace).cloned().unwrap_or_default())
    }
}

/// Namespace lister whose result can be changed or broken between ticks
#[derive(Clone, Default)]
pub struct MockNamespaces {
    namespaces: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<bool>>,
    calls: Arc<Mutex<usize>>,
}

impl MockNamespaces {
    pub fn new(namespaces: &[&str]) -> Self {
        let lister = Self::default();
        lister.set(namespaces);
        lister
    }

    pub fn set(&self, namespaces: &[&str]) {
        *self.namespaces.lock().unwrap() = namespaces.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl NamespaceLister for MockNamespaces {
    async fn list(&self) -> Result<Vec<String>, RuntimeError> {
        *self.calls.lock().unwrap() += 1;
        if *self.failing.lock().unwrap() {
            return Err(RuntimeError::Backend("registry unavailable".to_string()));
        }
        Ok(self.namespaces.lock().unwrap().clone())
    }
}

/// Memory store that can be told to fail writes or reads
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStatusStore,
    /// Writes to keys containing any of these fragments fail
    failing_writes: Arc<Mutex<Vec<String>>>,
    failing_reads: Arc<Mutex<bool>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_matching(&self, fragment: &str) {
        self.failing_writes
            .lock()
            .unwrap()
            .push(fragment.to_string());
    }

    pub fn set_failing_reads(&self, failing: bool) {
        *self.failing_reads.lock().unwrap() = failing;
    }

    pub fn inner(&self) -> &MemoryStatusStore {
        &self.inner
    }

    /// Keys written successfully, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusStore for FlakyStore {
    async fn write(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let fails = self
            .failing_writes
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| key.contains(fragment.as_str()));
        if fails {
            return Err(StoreError::Backend(format!("simulated write failure for {key}")));
        }
        self.inner.write(key, value).await?;
        self.writes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn read_prefix(&self, prefix: &str) -> StoreResult<Vec<StoreRecord>> {
        if *self.failing_reads.lock().unwrap() {
            return Err(StoreError::ConnectionError("simulated read failure".to_string()));
        }
        self.inner.read_prefix(prefix).await
    }

    fn provider_name(&self) -> &'static str {
        "flaky-memory"
    }
}

pub fn running(name: &str, version: &str) -> ServiceDescriptor {
    ServiceDescriptor::new(name, version).with_status("running", "")
}

pub fn errored(name: &str, version: &str, error: &str) -> ServiceDescriptor {
    ServiceDescriptor::new(name, version).with_status("error", error)
}
