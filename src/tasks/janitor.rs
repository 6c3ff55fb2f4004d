//! Janitor Task
//!
//! Background task that periodically sweeps expired cache entries.

use std::time::Duration;

use tracing::Level;

use crate::cache::Cache;
use crate::error::Result;
use crate::tasks::PeriodicTask;

/// Spawns a background task that calls `Cache::delete_expired` every `interval`.
///
/// Each sweep runs on the blocking pool, and eviction callbacks run there once
/// the sweep has released the lock, so a slow callback never stalls the
/// runtime's worker threads.
///
/// # Example
/// ```ignore
/// let janitor = spawn_janitor(cache.clone(), Duration::from_secs(1))?;
/// // Later, during shutdown:
/// janitor.stop().await;
/// ```
pub fn spawn_janitor(cache: Cache, interval: Duration) -> Result<PeriodicTask> {
    cache.logger().log(
        Level::INFO,
        &format!("starting janitor with interval of {:?}", interval),
    );

    PeriodicTask::spawn("janitor", interval, move || {
        let cache = cache.clone();
        async move {
            let sweeper = cache.clone();
            match tokio::task::spawn_blocking(move || sweeper.delete_expired()).await {
                Ok(0) => cache
                    .logger()
                    .log(Level::DEBUG, "janitor: no expired entries found"),
                Ok(removed) => cache.logger().log(
                    Level::INFO,
                    &format!("janitor: removed {} expired entries", removed),
                ),
                Err(e) => cache
                    .logger()
                    .log(Level::ERROR, &format!("janitor: sweep task panicked: {}", e)),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Ttl, Value};
    use crate::config::Config;
    use std::sync::{Arc, Mutex};

    fn create_cache() -> Cache {
        Cache::new(&Config::default().with_capacity(100)).unwrap()
    }

    #[tokio::test]
    async fn test_janitor_removes_expired_entries() {
        let cache = create_cache();
        cache.set("expire_soon", "value", Ttl::millis(20)).unwrap();

        let janitor = spawn_janitor(cache.clone(), Duration::from_millis(50)).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.item_count(), 0, "Expired entry should have been swept");
        assert_eq!(cache.used(), 0);

        janitor.stop().await;
    }

    #[tokio::test]
    async fn test_janitor_preserves_valid_entries() {
        let cache = create_cache();
        cache.set("long_lived", "value", Ttl::seconds(3600)).unwrap();

        let janitor = spawn_janitor(cache.clone(), Duration::from_millis(20)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.get("long_lived"), Some(Value::from("value")));

        janitor.stop().await;
    }

    #[tokio::test]
    async fn test_janitor_notifies_and_allows_reentry() {
        let cache = create_cache();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let reentrant = cache.clone();
        cache.on_evicted(move |key, value| {
            recorder.lock().unwrap().push(key.to_string());
            reentrant.set("replacement", value, Ttl::Never).unwrap();
        });

        cache.set("foo", 3i32, Ttl::millis(1)).unwrap();
        let janitor = spawn_janitor(cache.clone(), Duration::from_millis(10)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        janitor.stop().await;

        assert_eq!(*seen.lock().unwrap(), vec!["foo".to_string()]);
        assert_eq!(cache.get("replacement"), Some(Value::I32(3)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_notifier_does_not_stall_runtime() {
        let cache = create_cache();
        cache.on_evicted(|_, _| std::thread::sleep(Duration::from_millis(300)));
        cache.set("slow", 1i32, Ttl::millis(1)).unwrap();

        let started = std::time::Instant::now();
        let janitor = spawn_janitor(cache.clone(), Duration::from_millis(10)).unwrap();

        // the single runtime thread keeps running timers while the callback sleeps
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(started.elapsed() < Duration::from_millis(250));
        assert_eq!(cache.item_count(), 0);

        janitor.stop().await;
    }

    #[tokio::test]
    async fn test_janitor_can_be_stopped() {
        let cache = create_cache();
        let janitor = spawn_janitor(cache, Duration::from_secs(1)).unwrap();

        assert!(!janitor.is_finished());
        janitor.stop().await;
    }
}
