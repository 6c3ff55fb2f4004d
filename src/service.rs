//! Cache Service Module
//!
//! Owns a cache together with its background tasks and tears them down
//! explicitly.

use std::collections::HashMap;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::Level;

use crate::cache::{Cache, Entry};
use crate::config::Config;
use crate::error::Result;
use crate::logger::{SharedLogger, TracingLogger};
use crate::tasks::{spawn_backup_task, spawn_janitor, PeriodicTask};

// == Cache Service ==
/// A cache plus its janitor and periodic backup, if configured.
///
/// Background tasks run until `shutdown` is called. It consumes the service,
/// so each task is signalled exactly once.
#[derive(Debug)]
pub struct CacheService {
    cache: Cache,
    backup_path: Option<PathBuf>,
    janitor: Option<PeriodicTask>,
    backup: Option<PeriodicTask>,
}

impl CacheService {
    // == Constructor ==
    /// Builds an empty cache from `config` and starts its background tasks.
    ///
    /// Must be called from within a Tokio runtime when the janitor or the
    /// backup is enabled.
    pub fn start(config: &Config) -> Result<Self> {
        let logger = Arc::new(TracingLogger::new(config.tracing_level()));
        Self::start_with(config, HashMap::new(), logger)
    }

    /// Builds a cache seeded with `items`, logging to `logger`.
    pub fn start_with(
        config: &Config,
        items: HashMap<String, Entry>,
        logger: SharedLogger,
    ) -> Result<Self> {
        let cache = Cache::with_items(config, items, logger)?;

        let janitor = if config.cleanup_interval.is_zero() {
            None
        } else {
            Some(spawn_janitor(cache.clone(), config.cleanup_interval)?)
        };

        // on failure the janitor handle is dropped, which also ends its task
        let backup = if config.backup.in_use {
            Some(spawn_backup_task(
                cache.clone(),
                config.backup.path.clone(),
                config.backup.interval,
            )?)
        } else {
            None
        };

        Ok(Self {
            cache,
            backup_path: config.backup.in_use.then(|| config.backup.path.clone()),
            janitor,
            backup,
        })
    }

    /// The managed cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn janitor_running(&self) -> bool {
        self.janitor.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn backup_running(&self) -> bool {
        self.backup.as_ref().is_some_and(|task| !task.is_finished())
    }

    // == Backup ==
    /// Saves a snapshot to the configured backup path right away.
    ///
    /// Returns `None` when no backup path is configured.
    pub fn backup_save(&self) -> Option<Result<usize>> {
        self.backup_path
            .as_ref()
            .map(|path| self.cache.save_file(path))
    }

    /// Merges the snapshot at the configured backup path into the cache.
    pub fn backup_recover(&self) -> Option<Result<usize>> {
        self.backup_path
            .as_ref()
            .map(|path| self.cache.load_file(path))
    }

    // == Shutdown ==
    /// Stops the janitor and the backup task, then returns the cache.
    pub async fn shutdown(self) -> Cache {
        if let Some(janitor) = self.janitor {
            janitor.stop().await;
        }
        if let Some(backup) = self.backup {
            backup.stop().await;
        }
        self.cache
            .logger()
            .log(Level::INFO, "background tasks stopped");
        self.cache
    }
}

impl Deref for CacheService {
    type Target = Cache;

    fn deref(&self) -> &Cache {
        &self.cache
    }
}
