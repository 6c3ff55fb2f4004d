//! Snapshot Persistence Module
//!
//! Saves the entry map as JSON and merges saved maps back in.
//!
//! The snapshot is an object keyed by cache key; each item holds the tagged
//! value and the expiration as an RFC 3339 instant, `null` meaning never.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::Level;

use crate::cache::{Cache, Entry, Expiration, Value};
use crate::error::{CacheError, Result};

// == Wire Format ==
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotItem {
    value: Value,
    expiration: Option<DateTime<Utc>>,
}

type Snapshot = BTreeMap<String, SnapshotItem>;

fn decode_expiration(expiration: Option<DateTime<Utc>>) -> Expiration {
    expiration.map_or(Expiration::Never, Expiration::At)
}

impl Cache {
    // == Save ==
    /// Writes every entry, expired ones included, to `writer`.
    ///
    /// The map is copied under the read lock and encoded after it is released.
    /// Returns the number of entries written. Nothing is written if any value
    /// cannot be represented.
    pub fn save<W: Write>(&self, writer: W) -> Result<usize> {
        let entries: Vec<(String, Entry)> = self
            .read_store()
            .items
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        let mut snapshot = Snapshot::new();
        for (key, entry) in entries {
            if let Some(reason) = entry.value.unrepresentable_reason() {
                return Err(CacheError::Unrepresentable { key, reason });
            }
            snapshot.insert(
                key,
                SnapshotItem {
                    value: entry.value,
                    expiration: entry.expiration.instant(),
                },
            );
        }

        let mut writer = BufWriter::new(writer);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;

        self.logger().log(
            Level::DEBUG,
            &format!("saved snapshot of {} items", snapshot.len()),
        );
        Ok(snapshot.len())
    }

    /// Saves to `path`, replacing it only once the new snapshot is complete.
    ///
    /// Each call writes through its own temporary file next to `path`, so
    /// concurrent saves to one path never see each other's partial output.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // dropped, and so removed, if the save fails
        let mut tmp = NamedTempFile::new_in(dir)?;
        let count = self.save(tmp.as_file_mut())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(count)
    }

    // == Load ==
    /// Merges a snapshot read from `reader` into the cache.
    ///
    /// A key is installed only if the cache holds no live entry for it, and
    /// entries already expired in the snapshot are skipped. Each new slot is
    /// charged against capacity; if capacity runs out the load stops with
    /// `CapacityExceeded` and keys merged so far stay in place.
    ///
    /// Returns the number of keys merged.
    pub fn load<R: Read>(&self, reader: R) -> Result<usize> {
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(reader))?;

        let now = Utc::now();
        let mut merged = 0;
        let outcome = {
            let mut store = self.write_store();
            let mut outcome = Ok(());
            for (key, item) in snapshot {
                let entry = Entry::new(item.value, decode_expiration(item.expiration));
                if entry.is_expired_at(now) || store.live(&key, now).is_some() {
                    continue;
                }
                if let Err(e) = store.put(key, entry) {
                    outcome = Err(e);
                    break;
                }
                merged += 1;
            }
            outcome
        };

        match outcome {
            Ok(()) => {
                self.logger()
                    .log(Level::INFO, &format!("loaded {} items from snapshot", merged));
                Ok(merged)
            }
            Err(e) => {
                self.logger().log(
                    Level::WARN,
                    &format!("snapshot load stopped after {} items: {}", merged, e),
                );
                Err(e)
            }
        }
    }

    /// Merges the snapshot stored at `path`.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.load(File::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Ttl;
    use crate::config::Config;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::logger::NoopLogger;

    fn create_cache(capacity: usize) -> Cache {
        let config = Config::default().with_capacity(capacity);
        Cache::with_items(&config, HashMap::new(), Arc::new(NoopLogger)).unwrap()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let source = create_cache(16);
        source.set("a", "a", Ttl::Default).unwrap();
        source.set("n", 42u16, Ttl::seconds(60)).unwrap();
        source.set("f", -0.25f32, Ttl::Never).unwrap();
        source.set("j", serde_json::json!({"k": [1, 2]}), Ttl::Never).unwrap();
        source.set("expired", "foo", Ttl::seconds(-1)).unwrap();

        let mut buf = Vec::new();
        assert_eq!(source.save(&mut buf).unwrap(), 5);

        let target = create_cache(16);
        assert_eq!(target.load(buf.as_slice()).unwrap(), 4);

        assert_eq!(target.get("a"), Some(Value::from("a")));
        assert_eq!(target.get("n"), Some(Value::U16(42)));
        assert_eq!(target.get("f"), Some(Value::F32(-0.25)));
        assert_eq!(
            target.get("j"),
            Some(Value::Json(serde_json::json!({"k": [1, 2]})))
        );
        assert!(target.get("expired").is_none());
        assert_eq!(target.item_count(), 4);
        assert_eq!(
            target.get_with_expiration("n").unwrap().1,
            source.get_with_expiration("n").unwrap().1
        );
    }

    #[test]
    fn test_load_never_overwrites_live_entries() {
        let source = create_cache(8);
        source.set("live", "from-snapshot", Ttl::Never).unwrap();
        source.set("stale", "from-snapshot", Ttl::Never).unwrap();
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();

        let target = create_cache(8);
        target.set("live", "current", Ttl::Never).unwrap();
        target.set("stale", "old", Ttl::seconds(-1)).unwrap();

        assert_eq!(target.load(buf.as_slice()).unwrap(), 1);
        assert_eq!(target.get("live"), Some(Value::from("current")));
        assert_eq!(target.get("stale"), Some(Value::from("from-snapshot")));
        assert_eq!(target.used(), 2);
    }

    #[test]
    fn test_load_partial_failure_keeps_merged() {
        let source = create_cache(8);
        for key in ["a", "b", "c"] {
            source.set(key, key, Ttl::Never).unwrap();
        }
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();

        let target = create_cache(2);
        let result = target.load(buf.as_slice());

        assert!(matches!(
            result,
            Err(CacheError::CapacityExceeded { capacity: 2 })
        ));
        // keys are merged in sorted order
        assert_eq!(target.get("a"), Some(Value::from("a")));
        assert_eq!(target.get("b"), Some(Value::from("b")));
        assert!(target.get("c").is_none());
        assert_eq!(target.used(), 2);
    }

    #[test]
    fn test_save_rejects_non_finite_float() {
        let cache = create_cache(4);
        cache.set("nan", f64::NAN, Ttl::Never).unwrap();

        let mut buf = Vec::new();
        let result = cache.save(&mut buf);
        assert!(matches!(result, Err(CacheError::Unrepresentable { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_load_malformed_snapshot() {
        let cache = create_cache(4);
        let result = cache.load("not json".as_bytes());
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_save_file_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let source = create_cache(4);
        source.set("k", 7i64, Ttl::Never).unwrap();
        source.save_file(&path).unwrap();

        let target = create_cache(4);
        assert_eq!(target.load_file(&path).unwrap(), 1);
        assert_eq!(target.get("k"), Some(Value::I64(7)));
    }

    #[test]
    fn test_file_errors_are_io() {
        let dir = tempfile::tempdir().unwrap();
        let cache = create_cache(4);

        let missing = dir.path().join("missing.json");
        assert!(matches!(cache.load_file(&missing), Err(CacheError::Io(_))));

        let bad_dir = dir.path().join("no-such-dir").join("snap.json");
        assert!(matches!(cache.save_file(&bad_dir), Err(CacheError::Io(_))));
    }

    #[test]
    fn test_expiration_encoding() {
        assert_eq!(decode_expiration(None), Expiration::Never);

        let epoch = DateTime::from_timestamp_nanos(0);
        assert_eq!(decode_expiration(Some(epoch)), Expiration::At(epoch));
    }

    #[test]
    fn test_save_far_future_expiration() {
        let source = create_cache(4);
        let three_centuries = 300 * 365 * 24 * 3600;
        source.set("long", 2i32, Ttl::seconds(three_centuries)).unwrap();
        let (_, expiration) = source.get_with_expiration("long").unwrap();

        let mut buf = Vec::new();
        assert_eq!(source.save(&mut buf).unwrap(), 1);

        let target = create_cache(4);
        assert_eq!(target.load(buf.as_slice()).unwrap(), 1);
        assert_eq!(
            target.get_with_expiration("long"),
            Some((Value::I32(2), expiration))
        );
    }

    #[test]
    fn test_never_expiring_items_are_written_as_null() {
        let cache = create_cache(4);
        cache.set("k", true, Ttl::Never).unwrap();

        let mut buf = Vec::new();
        cache.save(&mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert!(json["k"]["expiration"].is_null());
    }

    #[test]
    fn test_concurrent_save_file_to_one_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");

        let cache = create_cache(5000);
        for i in 0..5000 {
            cache.set(format!("k{}", i), i as u64, Ttl::Never).unwrap();
        }

        for _ in 0..5 {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let cache = cache.clone();
                    let path = path.clone();
                    std::thread::spawn(move || cache.save_file(&path))
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().expect("save panicked").unwrap(), 5000);
            }

            let restored = create_cache(5000);
            assert_eq!(restored.load_file(&path).unwrap(), 5000);
        }

        // no temporary files are left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
