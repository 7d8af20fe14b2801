//! # Runtime Collaborators
//!
//! Contracts for the two external systems the poller reads from: the managed
//! runtime that knows which services are deployed (and how they are doing),
//! and the registry that enumerates namespaces.
//!
//! Both are object-safe async traits so the manager can hold them as
//! `Arc<dyn ...>` and tests can script them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::constants::{keys, metadata};

/// Errors reported by runtime and namespace collaborators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Runtime unavailable: {0}")]
    Unavailable(String),

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Runtime backend error: {0}")]
    Backend(String),
}

/// One deployed service version as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub version: String,
    /// Runtime-specific attributes; health is reported through the
    /// `status` and `error` entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            metadata: None,
        }
    }

    /// Attach a metadata entry, creating the map on first use
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Convenience for the common `status` / `error` pair
    #[must_use]
    pub fn with_status(self, status: impl Into<String>, error: impl Into<String>) -> Self {
        self.with_metadata(metadata::STATUS, status)
            .with_metadata(metadata::ERROR, error)
    }

    /// `name:version`, the identifier statuses are listed under
    pub fn service_id(&self) -> String {
        format!("{}{}{}", self.name, keys::VERSION_SEPARATOR, self.version)
    }
}

/// The managed runtime that owns deployed services
#[async_trait]
pub trait ServiceRuntime: Send + Sync {
    /// List every service visible in `namespace`
    async fn read(&self, namespace: &str) -> Result<Vec<ServiceDescriptor>, RuntimeError>;
}

/// Source of the namespaces the poller should refresh
#[async_trait]
pub trait NamespaceLister: Send + Sync {
    async fn list(&self) -> Result<Vec<String>, RuntimeError>;
}

/// Fixed namespace set, for deployments that only ever manage a known list
#[derive(Debug, Clone, Default)]
pub struct StaticNamespaces {
    namespaces: Vec<String>,
}

impl StaticNamespaces {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl NamespaceLister for StaticNamespaces {
    async fn list(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(self.namespaces.clone())
    }
}
