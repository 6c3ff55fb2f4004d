//! Backup Task
//!
//! Background task that periodically writes a snapshot of the cache to a file.
//! Failures are reported to the log sink and never stop the task.

use std::path::PathBuf;
use std::time::Duration;

use tracing::Level;

use crate::cache::Cache;
use crate::error::Result;
use crate::tasks::PeriodicTask;

/// Spawns a background task that saves the cache to `path` every `interval`.
///
/// The snapshot is written on the blocking pool so file I/O never stalls the
/// runtime's worker threads.
pub fn spawn_backup_task(cache: Cache, path: PathBuf, interval: Duration) -> Result<PeriodicTask> {
    cache.logger().log(
        Level::INFO,
        &format!(
            "starting backup to {} with interval of {:?}",
            path.display(),
            interval
        ),
    );

    PeriodicTask::spawn("backup", interval, move || {
        let cache = cache.clone();
        let path = path.clone();
        async move {
            let saver = cache.clone();
            let target = path.clone();
            match tokio::task::spawn_blocking(move || saver.save_file(&target)).await {
                Ok(Ok(count)) => cache.logger().log(
                    Level::DEBUG,
                    &format!("backup: saved {} entries to {}", count, path.display()),
                ),
                Ok(Err(e)) => cache.logger().log(
                    Level::WARN,
                    &format!("backup: saving to {} failed: {}", path.display(), e),
                ),
                Err(e) => cache
                    .logger()
                    .log(Level::ERROR, &format!("backup: save task panicked: {}", e)),
            }
        }
    })
}
