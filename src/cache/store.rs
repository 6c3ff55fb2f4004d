//! Cache Store Module
//!
//! The entry store: one map of key to entry plus the slot counter, guarded by a
//! single reader-writer lock. Reads take the read lock, everything that mutates
//! takes the write lock. Eviction callbacks always run after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::Level;

use crate::cache::{Entry, Slots, Ttl, Value};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::logger::{SharedLogger, TracingLogger};

/// Callback fired with the key and value of a deleted or swept entry.
pub type EvictionCallback = Arc<dyn Fn(&str, Value) + Send + Sync>;

// == Store ==
/// State guarded by the cache lock.
pub(crate) struct Store {
    pub(crate) items: HashMap<String, Entry>,
    pub(crate) slots: Slots,
    pub(crate) on_evicted: Option<EvictionCallback>,
}

impl Store {
    /// The entry for `key` if it is present and not expired at `now`.
    pub(crate) fn live(&self, key: &str, now: DateTime<Utc>) -> Option<&Entry> {
        self.items.get(key).filter(|e| !e.is_expired_at(now))
    }

    pub(crate) fn live_mut(&mut self, key: &str, now: DateTime<Utc>) -> Option<&mut Entry> {
        self.items.get_mut(key).filter(|e| !e.is_expired_at(now))
    }

    /// Writes `entry` under `key`, taking a slot only when the key has no map slot yet.
    pub(crate) fn put(&mut self, key: String, entry: Entry) -> Result<()> {
        match self.items.get_mut(&key) {
            Some(existing) => *existing = entry,
            None => {
                self.slots.reserve()?;
                self.items.insert(key, entry);
            }
        }
        Ok(())
    }
}

struct Shared {
    store: RwLock<Store>,
    default_ttl: Ttl,
    logger: SharedLogger,
    verbose: bool,
}

// == Cache ==
/// Thread-safe key-value cache with per-entry TTL.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone)]
pub struct Cache {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("items", &self.item_count())
            .field("capacity", &self.capacity())
            .field("default_ttl", &self.shared.default_ttl)
            .finish()
    }
}

impl Cache {
    // == Constructor ==
    /// Creates an empty cache logging through the default tracing sink.
    pub fn new(config: &Config) -> Result<Self> {
        let logger = Arc::new(TracingLogger::new(config.tracing_level()));
        Self::with_items(config, HashMap::new(), logger)
    }

    /// Creates a cache pre-populated with `items`.
    ///
    /// Fails with `ConfigInvalid` if the config does not validate, and with
    /// `CapacityExceeded` if `items` does not fit the capacity budget.
    pub fn with_items(
        config: &Config,
        items: HashMap<String, Entry>,
        logger: SharedLogger,
    ) -> Result<Self> {
        config.validate()?;

        // a zero default means never, as when loaded from the environment
        let default_ttl = match config.default_expiration.filter(|ttl| !ttl.is_zero()) {
            Some(ttl) => Ttl::After(chrono::Duration::from_std(ttl).map_err(|e| {
                CacheError::ConfigInvalid(format!("default expiration: {}", e))
            })?),
            None => Ttl::Never,
        };

        let mut slots = Slots::new(config.capacity);
        slots.reserve_many(items.len())?;

        let on_evicted = if config.evicted {
            let sink = logger.clone();
            let callback: EvictionCallback = Arc::new(move |key: &str, value: Value| {
                sink.log(Level::INFO, &format!("evicted {} -> {:?}", key, value));
            });
            Some(callback)
        } else {
            None
        };

        logger.log(
            Level::INFO,
            &format!(
                "initialize new cache with default expiration {:?}, capacity {} and {} items",
                default_ttl,
                config.capacity,
                items.len()
            ),
        );

        Ok(Self {
            shared: Arc::new(Shared {
                store: RwLock::new(Store {
                    items,
                    slots,
                    on_evicted,
                }),
                default_ttl,
                logger,
                verbose: config.verbose,
            }),
        })
    }

    // == Locking ==
    // A panic inside a critical section cannot leave an entry half written,
    // so a poisoned lock is still safe to use.
    pub(crate) fn read_store(&self) -> RwLockReadGuard<'_, Store> {
        self.shared
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_store(&self) -> RwLockWriteGuard<'_, Store> {
        self.shared
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn logger(&self) -> &SharedLogger {
        &self.shared.logger
    }

    // Operation logging only happens in verbose mode and never under the lock.
    fn describe(&self, message: impl FnOnce() -> String) -> Option<String> {
        self.shared.verbose.then(message)
    }

    fn emit(&self, message: Option<String>) {
        if let Some(message) = message {
            self.shared.logger.log(Level::DEBUG, &message);
        }
    }

    fn log_op(&self, message: impl FnOnce() -> String) {
        let message = self.describe(message);
        self.emit(message);
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// Fails with `CapacityExceeded` if the key is new and no slot is left.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>, ttl: Ttl) -> Result<()> {
        let key = key.into();
        let entry = Entry::new(
            value.into(),
            ttl.resolve(self.shared.default_ttl, Utc::now()),
        );
        let message = self.describe(|| format!("set {} -> {:?}", key, entry.value));
        self.write_store().put(key, entry)?;
        self.emit(message);
        Ok(())
    }

    /// Stores a value with the default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.set(key, value, Ttl::Default)
    }

    // == Add ==
    /// Stores a value only if no live entry exists for the key.
    pub fn add(&self, key: impl Into<String>, value: impl Into<Value>, ttl: Ttl) -> Result<()> {
        let key = key.into();
        let now = Utc::now();
        let entry = Entry::new(value.into(), ttl.resolve(self.shared.default_ttl, now));

        let message = self.describe(|| format!("add {} -> {:?}", key, entry.value));
        {
            let mut store = self.write_store();
            if store.live(&key, now).is_some() {
                return Err(CacheError::AlreadyExists(key));
            }
            store.put(key, entry)?;
        }
        self.emit(message);
        Ok(())
    }

    // == Replace ==
    /// Overwrites the value of a live entry; usage is unchanged.
    pub fn replace(&self, key: impl Into<String>, value: impl Into<Value>, ttl: Ttl) -> Result<()> {
        let key = key.into();
        let now = Utc::now();
        let value = value.into();
        let expiration = ttl.resolve(self.shared.default_ttl, now);

        let message = self.describe(|| format!("replace {} -> {:?}", key, value));
        {
            let mut store = self.write_store();
            match store.live_mut(&key, now) {
                Some(entry) => *entry = Entry::new(value, expiration),
                None => return Err(CacheError::NotFound(key)),
            }
        }
        self.emit(message);
        Ok(())
    }

    // == Get ==
    /// Returns the value if the key is present and not expired.
    ///
    /// Expired entries are left in place for the janitor.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_store()
            .live(key, Utc::now())
            .map(|entry| entry.value.clone())
    }

    /// Returns the value and its absolute expiration, None meaning never.
    pub fn get_with_expiration(&self, key: &str) -> Option<(Value, Option<DateTime<Utc>>)> {
        self.read_store()
            .live(key, Utc::now())
            .map(|entry| (entry.value.clone(), entry.expiration.instant()))
    }

    // == Delete ==
    /// Removes the entry for `key`, returning its value.
    ///
    /// The eviction callback, if registered, runs after the lock is released.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let (removed, callback) = {
            let mut store = self.write_store();
            let removed = store.items.remove(key);
            if removed.is_some() {
                store.slots.release();
            }
            (removed, store.on_evicted.clone())
        };

        let value = removed.map(|entry| entry.value)?;
        self.log_op(|| format!("delete {}", key));
        if let Some(callback) = callback {
            callback(key, value.clone());
        }
        Some(value)
    }

    // == Delete Expired ==
    /// Physically removes every expired entry and returns how many were removed.
    ///
    /// Removed pairs are collected under the write lock and handed to the
    /// eviction callback only after it is released, so the callback may call
    /// back into the cache.
    pub fn delete_expired(&self) -> usize {
        let now = Utc::now();
        let (evicted, removed, callback) = {
            let mut store = self.write_store();
            let expired_keys: Vec<String> = store
                .items
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect();

            let notify = store.on_evicted.is_some();
            let mut evicted = Vec::new();
            let removed = expired_keys.len();
            for key in expired_keys {
                if let Some(entry) = store.items.remove(&key) {
                    store.slots.release();
                    if notify {
                        evicted.push((key, entry.value));
                    }
                }
            }
            (evicted, removed, store.on_evicted.clone())
        };

        if let Some(callback) = callback {
            for (key, value) in evicted {
                callback(&key, value);
            }
        }
        removed
    }

    // == Flush ==
    /// Drops every entry at once. The eviction callback is not invoked.
    pub fn flush(&self) {
        {
            let mut store = self.write_store();
            store.items = HashMap::new();
            store.slots.reset();
        }
        self.log_op(|| "flush".to_string());
    }

    // == Eviction Callback ==
    /// Registers the callback fired for deleted and swept entries, replacing
    /// any previous one.
    pub fn on_evicted<F>(&self, callback: F)
    where
        F: Fn(&str, Value) + Send + Sync + 'static,
    {
        self.write_store().on_evicted = Some(Arc::new(callback));
    }

    // == Inspection ==
    /// Number of map entries, including expired ones not yet swept.
    pub fn item_count(&self) -> usize {
        self.read_store().items.len()
    }

    /// Copies every unexpired entry into a new map.
    pub fn items(&self) -> HashMap<String, Entry> {
        let now = Utc::now();
        self.read_store()
            .items
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Slot budget.
    pub fn capacity(&self) -> usize {
        self.read_store().slots.budget()
    }

    /// Slots currently in use.
    pub fn used(&self) -> usize {
        self.read_store().slots.used()
    }

    /// The TTL substituted for `Ttl::Default`.
    pub fn default_ttl(&self) -> Ttl {
        self.shared.default_ttl
    }
}
