//! Tidecache - An in-process key-value cache
//!
//! Provides a concurrency-safe store with per-entry TTL, slot-based capacity
//! admission, background expiration sweeping, snapshot persistence and
//! wrapping numeric increments.

pub mod cache;
pub mod config;
pub mod error;
pub mod logger;
pub mod service;
pub mod tasks;

pub use cache::{Cache, Entry, Expiration, Ttl, Value};
pub use config::{BackupConfig, Config};
pub use error::{CacheError, Result};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use service::CacheService;
