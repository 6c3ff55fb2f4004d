//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use chrono::{DateTime, Duration, Utc};

use crate::cache::Value;

// == Expiration ==
/// Resolved expiration state of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Lives until explicitly removed
    Never,
    /// Logically absent once the current time is past this instant
    At(DateTime<Utc>),
}

impl Expiration {
    /// Returns true once `now` is strictly past the expiration instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiration::Never => false,
            Expiration::At(at) => now > *at,
        }
    }

    /// The absolute instant, None for entries that never expire.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiration::Never => None,
            Expiration::At(at) => Some(*at),
        }
    }
}

// == Ttl ==
/// Requested lifetime for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Use the cache's configured default
    Default,
    /// Never expire
    Never,
    /// Expire after this long; zero or negative stores an already expired entry
    After(Duration),
}

impl Ttl {
    pub fn seconds(secs: i64) -> Self {
        Ttl::After(Duration::seconds(secs))
    }

    pub fn millis(millis: i64) -> Self {
        Ttl::After(Duration::milliseconds(millis))
    }

    /// Resolves this TTL against `now`.
    ///
    /// `default` is substituted for `Ttl::Default` and must not itself be
    /// `Ttl::Default`; if it is, the entry never expires.
    pub fn resolve(self, default: Ttl, now: DateTime<Utc>) -> Expiration {
        let ttl = match self {
            Ttl::Default => default,
            other => other,
        };
        match ttl {
            Ttl::Default | Ttl::Never => Expiration::Never,
            Ttl::After(d) if d <= Duration::zero() => {
                // strictly in the past so the first read already misses
                let d = d.min(-Duration::nanoseconds(1));
                Expiration::At(now.checked_add_signed(d).unwrap_or(DateTime::<Utc>::MIN_UTC))
            }
            Ttl::After(d) => now
                .checked_add_signed(d)
                .map(Expiration::At)
                .unwrap_or(Expiration::Never),
        }
    }
}

impl From<std::time::Duration> for Ttl {
    fn from(d: std::time::Duration) -> Self {
        Duration::from_std(d).map(Ttl::After).unwrap_or(Ttl::Never)
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and expiration.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The stored value
    pub value: Value,
    /// Resolved expiration
    pub expiration: Expiration,
}

impl Entry {
    // == Constructor ==
    pub fn new(value: Value, expiration: Expiration) -> Self {
        Self { value, expiration }
    }

    // == Is Expired ==
    /// Checks expiry against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_expired_at(now)
    }
}
