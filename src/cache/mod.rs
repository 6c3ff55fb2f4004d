//! Cache Module
//!
//! Provides the in-memory entry store with TTL expiration, capacity
//! admission, numeric mutation and snapshot persistence.

mod capacity;
mod entry;
mod numeric;
mod snapshot;
mod store;
mod value;


// Re-export public types
pub use capacity::Slots;
pub use entry::{Entry, Expiration, Ttl};
pub use numeric::Numeric;
pub use store::{Cache, EvictionCallback};
pub use value::Value;
