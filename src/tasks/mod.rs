//! Background Tasks Module
//!
//! Periodic tasks that run beside the cache until explicitly stopped.
//!
//! # Tasks
//! - Janitor: sweeps expired entries at the configured interval
//! - Backup: writes a snapshot to the configured file at its own interval

mod backup;
mod janitor;
mod periodic;

pub use backup::spawn_backup_task;
pub use janitor::spawn_janitor;
pub use periodic::PeriodicTask;
