//! Configuration Module
//!
//! Handles loading, building and validating the cache configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Periodic snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Whether the periodic snapshot task runs
    pub in_use: bool,
    /// Snapshot file written on every tick
    pub path: PathBuf,
    /// Time between two snapshots
    pub interval: Duration,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            in_use: false,
            path: PathBuf::from("tidecache-backup.json"),
            interval: Duration::from_secs(60),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entry slots
    pub capacity: usize,
    /// TTL applied when a caller asks for the default, None = never expire
    pub default_expiration: Option<Duration>,
    /// Janitor period, zero disables the janitor
    pub cleanup_interval: Duration,
    /// Periodic snapshot settings
    pub backup: BackupConfig,
    /// Report every eviction to the log sink
    pub evicted: bool,
    /// Log every mutating operation
    pub verbose: bool,
    /// Minimum level of the default log sink, -1 (debug) to 5
    pub log_level: i8,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TIDECACHE_CAPACITY` - Maximum entry slots (default: 1024)
    /// - `TIDECACHE_DEFAULT_EXPIRATION` - Default TTL in seconds, <= 0 means never (default: never)
    /// - `TIDECACHE_CLEANUP_INTERVAL` - Janitor period in seconds, 0 disables (default: 300)
    /// - `TIDECACHE_BACKUP` - Enable periodic snapshots (default: false)
    /// - `TIDECACHE_BACKUP_PATH` - Snapshot file (default: tidecache-backup.json)
    /// - `TIDECACHE_BACKUP_INTERVAL` - Snapshot period in seconds (default: 60)
    /// - `TIDECACHE_EVICTED` - Log evictions (default: false)
    /// - `TIDECACHE_VERBOSE` - Log every mutation (default: false)
    /// - `TIDECACHE_LOG_LEVEL` - Minimum log level, -1 to 5 (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backup_defaults = BackupConfig::default();

        Self {
            capacity: parse_var("TIDECACHE_CAPACITY").unwrap_or(defaults.capacity),
            default_expiration: parse_var::<i64>("TIDECACHE_DEFAULT_EXPIRATION")
                .and_then(|secs| u64::try_from(secs).ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            cleanup_interval: parse_var("TIDECACHE_CLEANUP_INTERVAL")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            backup: BackupConfig {
                in_use: parse_var("TIDECACHE_BACKUP").unwrap_or(backup_defaults.in_use),
                path: env::var("TIDECACHE_BACKUP_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(backup_defaults.path),
                interval: parse_var("TIDECACHE_BACKUP_INTERVAL")
                    .map(Duration::from_secs)
                    .unwrap_or(backup_defaults.interval),
            },
            evicted: parse_var("TIDECACHE_EVICTED").unwrap_or(defaults.evicted),
            verbose: parse_var("TIDECACHE_VERBOSE").unwrap_or(defaults.verbose),
            log_level: parse_var("TIDECACHE_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    // == Builders ==
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_default_expiration(mut self, ttl: Option<Duration>) -> Self {
        self.default_expiration = ttl;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_backup(mut self, path: impl Into<PathBuf>, interval: Duration) -> Self {
        self.backup = BackupConfig {
            in_use: true,
            path: path.into(),
            interval,
        };
        self
    }

    pub fn with_evicted(mut self, evicted: bool) -> Self {
        self.evicted = evicted;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    // == Validate ==
    /// Checks every field once, before a cache is built from this config.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::ConfigInvalid(
                "capacity must be at least 1".to_string(),
            ));
        }
        if !(-1..=5).contains(&self.log_level) {
            return Err(CacheError::ConfigInvalid(format!(
                "{} is not a valid log level (expected -1 to 5)",
                self.log_level
            )));
        }
        if let Some(ttl) = self.default_expiration {
            if chrono::Duration::from_std(ttl).is_err() {
                return Err(CacheError::ConfigInvalid(format!(
                    "default expiration {:?} is out of range",
                    ttl
                )));
            }
        }
        if self.backup.in_use {
            if self.backup.interval.is_zero() {
                return Err(CacheError::ConfigInvalid(
                    "backup interval must be positive".to_string(),
                ));
            }
            if self.backup.path.as_os_str().is_empty() {
                return Err(CacheError::ConfigInvalid(
                    "backup path must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Minimum level for the default log sink.
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level {
            i8::MIN..=-1 => tracing::Level::DEBUG,
            0 => tracing::Level::INFO,
            1 => tracing::Level::WARN,
            _ => tracing::Level::ERROR,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            default_expiration: None,
            cleanup_interval: Duration::from_secs(300),
            backup: BackupConfig::default(),
            evicted: false,
            verbose: false,
            log_level: 0,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.default_expiration, None);
        assert_eq!(config.cleanup_interval, Duration::from_secs(300));
        assert!(!config.backup.in_use);
        assert!(!config.evicted);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("TIDECACHE_CAPACITY");
        env::remove_var("TIDECACHE_DEFAULT_EXPIRATION");
        env::remove_var("TIDECACHE_CLEANUP_INTERVAL");
        env::remove_var("TIDECACHE_BACKUP");

        let config = Config::from_env();
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.default_expiration, None);
        assert_eq!(config.cleanup_interval, Duration::from_secs(300));
        assert!(!config.backup.in_use);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = Config::default().with_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(CacheError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_log_level() {
        let mut config = Config::default();
        config.log_level = 6;
        assert!(matches!(
            config.validate(),
            Err(CacheError::ConfigInvalid(_))
        ));

        config.log_level = -2;
        assert!(config.validate().is_err());

        config.log_level = -1;
        assert!(config.validate().is_ok());
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_validate_rejects_bad_backup() {
        let config = Config::default().with_backup("snap.json", Duration::ZERO);
        assert!(config.validate().is_err());

        let config = Config::default().with_backup("", Duration::from_secs(1));
        assert!(config.validate().is_err());

        let config = Config::default().with_backup("snap.json", Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_default_expiration() {
        let config = Config::default().with_default_expiration(Some(Duration::MAX));
        assert!(config.validate().is_err());
    }
}
