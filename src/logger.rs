//! Logger Module
//!
//! The log sink the cache reports side effects to. Logging never changes the
//! outcome of a cache operation.

use std::sync::Arc;

use tracing::Level;

/// A sink for formatted log lines.
pub trait Logger: Send + Sync {
    /// Emits one line at the given level.
    fn log(&self, level: Level, message: &str);
}

// == Tracing Logger ==
/// Default sink, forwarding to the `tracing` macros.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    min_level: Level,
}

impl TracingLogger {
    /// Creates a sink that drops records below `min_level`.
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        // tracing orders levels by verbosity, TRACE is the greatest
        if level > self.min_level {
            return;
        }
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            Level::TRACE => tracing::trace!("{}", message),
        }
    }
}

// == Noop Logger ==
/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Shared logger handle.
pub type SharedLogger = Arc<dyn Logger>;
