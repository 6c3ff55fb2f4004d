//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent or logically expired on an operation that requires it
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Add called on a key that holds live data
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// No slot left in the capacity budget
    #[error("Capacity exceeded: all {capacity} slots are in use")]
    CapacityExceeded { capacity: usize },

    /// Numeric mutation on a value of the wrong type
    #[error("Type mismatch for {key}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Snapshot resource could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Value cannot round-trip through the snapshot format
    #[error("Unrepresentable value for {key}: {reason}")]
    Unrepresentable { key: String, reason: String },

    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
