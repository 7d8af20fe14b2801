#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Status Cache Manager
//!
//! Background poller that keeps a key-value cache of the live status of
//! every service a managed runtime is running, per namespace, so status
//! lookups never block on the runtime.
//!
//! ## Architecture
//!
//! ```text
//! NamespaceLister ─┐
//!                  ├─> StatusPoller ──write──> StatusStore <──read_prefix── StatusReader
//! ServiceRuntime ──┘   (timer-driven)          (key-value)                  (on demand)
//! ```
//!
//! - The poller is the only writer. Each tick lists namespaces, reads each
//!   namespace's services from the runtime, and writes one
//!   [`ServiceStatus`] per service under `status/<namespace>/<name>:<version>`.
//! - The reader lists a namespace's statuses with a single prefix query.
//! - Failures inside a tick are logged and the loop carries on; only the read
//!   path surfaces errors to callers.
//!
//! ## Module Organization
//!
//! - [`manager`] - Lifecycle of the background poll task plus the read side
//! - [`poller`] - Poll loop and per-tick state machine
//! - [`reader`] - Namespace listings and metadata enrichment from the cache
//! - [`status`] - Status value object, key grammar, value encoding
//! - [`store`] - Key-value store contract and in-memory implementation
//! - [`runtime`] - Runtime and namespace collaborator contracts
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod manager;
pub mod poller;
pub mod reader;
pub mod runtime;
pub mod status;
pub mod store;

pub use config::{ConfigManager, ConfigurationError, StatusCacheConfig, TickFailurePolicy};
pub use error::{Result, StatusCacheError};
pub use manager::StatusCacheManager;
pub use poller::{CacheOutcome, StatusPoller, TickFailure, TickPhase, TickReport};
pub use reader::StatusReader;
pub use runtime::{NamespaceLister, RuntimeError, ServiceDescriptor, ServiceRuntime, StaticNamespaces};
pub use status::ServiceStatus;
pub use store::{MemoryStatusStore, StatusStore, StoreError, StoreRecord, StoreResult};
