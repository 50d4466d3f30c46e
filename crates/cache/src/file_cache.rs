use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CacheError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    data: Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub cache_duration_seconds: u64,
    pub cache_file: String,
}

/// A single file-backed TTL cache. `name` identifies the instance in
/// tracing spans so the three caches this workspace runs (scan/version/
/// update) don't conflate in logs.
pub struct FileCache {
    name: &'static str,
    path: PathBuf,
    ttl_seconds: u64,
}

impl FileCache {
    pub fn new(name: &'static str, path: impl Into<PathBuf>, ttl_seconds: u64) -> Self {
        Self {
            name,
            path: path.into(),
            ttl_seconds,
        }
    }

    /// Returns `(value, valid)`. A missing or corrupt file, or any I/O
    /// failure, is treated as an empty cache — the caller always gets a
    /// usable answer, never a propagated error.
    pub async fn get(&self, key: &str) -> (Option<Value>, bool) {
        let path = self.path.clone();
        let key = key.to_string();
        let ttl = self.ttl_seconds;
        let name = self.name;
        tokio::task::spawn_blocking(move || Self::get_sync(name, &path, &key, ttl))
            .await
            .unwrap_or((None, false))
    }

    fn get_sync(name: &str, path: &PathBuf, key: &str, ttl: u64) -> (Option<Value>, bool) {
        let map = match Self::read_locked(path) {
            Ok(m) => m,
            Err(e) => {
                warn!(cache = name, error = %e, "cache read failed, treating as empty");
                return (None, false);
            }
        };
        match map.get(key) {
            Some(entry) => {
                let valid = !kernel::time::is_stale(entry.timestamp, ttl, Utc::now());
                (Some(entry.data.clone()), valid)
            }
            None => (None, false),
        }
    }

    pub async fn set(&self, key: &str, value: Value) {
        let path = self.path.clone();
        let key = key.to_string();
        let name = self.name;
        let result = tokio::task::spawn_blocking(move || Self::set_sync(&path, &key, value)).await;
        if let Ok(Err(e)) = result {
            warn!(cache = name, error = %e, "cache write failed, discarding");
        }
    }

    fn set_sync(path: &PathBuf, key: &str, value: Value) -> Result<(), CacheError> {
        Self::modify_locked(path, |map| {
            map.insert(
                key.to_string(),
                StoredEntry {
                    data: value,
                    timestamp: Utc::now(),
                },
            );
        })
    }

    pub async fn delete(&self, key: &str) -> bool {
        let path = self.path.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let mut removed = false;
            let _ = Self::modify_locked(&path, |map| {
                removed = map.remove(&key).is_some();
            });
            removed
        })
        .await
        .unwrap_or(false)
    }

    pub async fn clear(&self) {
        let path = self.path.clone();
        let _ = tokio::task::spawn_blocking(move || std::fs::remove_file(&path)).await;
    }

    /// Removes every entry whose TTL has elapsed; returns the count removed.
    pub async fn prune_expired(&self) -> usize {
        let path = self.path.clone();
        let ttl = self.ttl_seconds;
        tokio::task::spawn_blocking(move || {
            let mut pruned = 0usize;
            let _ = Self::modify_locked(&path, |map| {
                let now = Utc::now();
                let before = map.len();
                map.retain(|_, entry| !kernel::time::is_stale(entry.timestamp, ttl, now));
                pruned = before - map.len();
            });
            pruned
        })
        .await
        .unwrap_or(0)
    }

    pub async fn stats(&self) -> CacheStats {
        let path = self.path.clone();
        let ttl = self.ttl_seconds;
        let file_display = self.path.display().to_string();
        tokio::task::spawn_blocking(move || {
            let map = Self::read_locked(&path).unwrap_or_default();
            let now = Utc::now();
            let mut valid = 0usize;
            let mut expired = 0usize;
            for entry in map.values() {
                if kernel::time::is_stale(entry.timestamp, ttl, now) {
                    expired += 1;
                } else {
                    valid += 1;
                }
            }
            CacheStats {
                total_entries: map.len(),
                valid_entries: valid,
                expired_entries: expired,
                cache_duration_seconds: ttl,
                cache_file: file_display,
            }
        })
        .await
        .unwrap_or_default()
    }

    fn read_locked(path: &PathBuf) -> Result<HashMap<String, StoredEntry>, CacheError> {
        let Ok(mut file) = File::open(path) else {
            return Ok(HashMap::new());
        };
        file.lock_shared().map_err(CacheError::Lock)?;
        let mut contents = String::new();
        let read_result = file.read_to_string(&mut contents);
        let _ = fs2::FileExt::unlock(&file);
        read_result.map_err(CacheError::Read)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                debug!(error = %e, "cache file is not valid JSON, treating as empty");
                Ok(HashMap::new())
            }
        }
    }

    /// Reads the whole map, applies `mutate`, writes it back — all under one
    /// exclusive lock, matching the "atomicity is per-operation" contract.
    fn modify_locked(
        path: &PathBuf,
        mutate: impl FnOnce(&mut HashMap<String, StoredEntry>),
    ) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(CacheError::Write)?;
        file.lock_exclusive().map_err(CacheError::Lock)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(CacheError::Read)?;
        let mut map: HashMap<String, StoredEntry> = if contents.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&contents).unwrap_or_default()
        };

        mutate(&mut map);

        let serialized = serde_json::to_string(&map).map_err(CacheError::Serialize)?;
        use std::io::Seek;
        file.set_len(0).map_err(CacheError::Write)?;
        file.seek(std::io::SeekFrom::Start(0)).map_err(CacheError::Write)?;
        file.write_all(serialized.as_bytes()).map_err(CacheError::Write)?;
        file.flush().map_err(CacheError::Write)?;
        let _ = fs2::FileExt::unlock(&file);
        Ok(())
    }
}
