//! Per-tick state machine and its report
//!
//! A tick walks `Start -> ListNamespaces -> ReadServices -> DeriveAndWrite`
//! and ends in `Idle`. `DeriveAndWrite` loops until the namespace's services
//! are exhausted, then returns to `ReadServices` for the next namespace.
//! Failures move straight to `Idle`, or back to `ReadServices` when the
//! policy only skips the failing namespace.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::runtime::ServiceDescriptor;

/// Named phases of a tick, as recorded in reports and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPhase {
    Start,
    ListNamespaces,
    ReadServices,
    DeriveAndWrite,
    Idle,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ListNamespaces => "list_namespaces",
            Self::ReadServices => "read_services",
            Self::DeriveAndWrite => "derive_and_write",
            Self::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Working state carried between transitions
#[derive(Debug)]
pub(crate) enum TickState {
    Start,
    ListNamespaces,
    ReadServices {
        pending: VecDeque<String>,
    },
    DeriveAndWrite {
        namespace: String,
        services: VecDeque<ServiceDescriptor>,
        pending: VecDeque<String>,
    },
    Idle,
}

impl TickState {
    pub(crate) fn phase(&self) -> TickPhase {
        match self {
            Self::Start => TickPhase::Start,
            Self::ListNamespaces => TickPhase::ListNamespaces,
            Self::ReadServices { .. } => TickPhase::ReadServices,
            Self::DeriveAndWrite { .. } => TickPhase::DeriveAndWrite,
            Self::Idle => TickPhase::Idle,
        }
    }
}

/// One failure observed during a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickFailure {
    pub phase: TickPhase,
    /// Absent when namespace enumeration itself failed
    pub namespace: Option<String>,
    pub error: String,
}

/// What one tick did
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub namespaces_listed: usize,
    /// Namespaces whose every service was processed
    pub namespaces_refreshed: usize,
    pub services_written: usize,
    /// Services with no metadata, or whose identifiers cannot form a key
    pub services_skipped: usize,
    pub failures: Vec<TickFailure>,
    /// Phase the tick was abandoned in, if it did not run to completion
    pub aborted_in: Option<TickPhase>,
}

impl TickReport {
    pub(crate) fn begin() -> Self {
        Self {
            started_at: Utc::now(),
            duration: Duration::ZERO,
            namespaces_listed: 0,
            namespaces_refreshed: 0,
            services_written: 0,
            services_skipped: 0,
            failures: Vec::new(),
            aborted_in: None,
        }
    }

    /// Completed with no failures
    pub fn is_clean(&self) -> bool {
        self.aborted_in.is_none() && self.failures.is_empty()
    }

    pub fn failed_namespaces(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter_map(|f| f.namespace.as_deref())
            .collect()
    }
}
