//! Size- and age-bounded map of artifact keys to files on disk
//!
//! A single mutex guards the entry map, the aggregate size, and the activity
//! counters together, so the aggregate always equals the sum of entry sizes
//! outside of a critical section. Backing files are only deleted after the
//! lock is released.

use crate::cleanup::{self, remove_backing_file};
use crate::entry::{
    CacheEntry, CacheStatistics, EvictedEntry, EvictionReason, EvictionReport,
};
use crate::keys;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::task::JoinHandle;
use zpress_config::CacheConfig;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    current_size: u64,
    stats: CacheStatistics,
}

#[derive(Debug)]
pub(crate) struct CacheInner {
    pub(crate) config: CacheConfig,
    state: Mutex<CacheState>,
    pub(crate) sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

/// Artifact cache with LRU and retention-based eviction
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Debug, Clone)]
pub struct CacheManager {
    pub(crate) inner: Arc<CacheInner>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config,
                state: Mutex::new(CacheState::default()),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Cache over `config.dir`, re-tracking artifacts left there by earlier processes
    ///
    /// Files whose names were produced by [`CacheManager::path_for`] are indexed
    /// with their modification time as last access, then one eviction pass
    /// applies the size and age bounds to them. Other files are left alone.
    pub fn open(config: CacheConfig) -> io::Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let cache = Self::new(config);
        let now = Instant::now();
        let wall_now = SystemTime::now();

        let mut restored = 0usize;
        {
            let mut state = cache.inner.state.lock();
            for dir_entry in std::fs::read_dir(cache.dir())? {
                let dir_entry = dir_entry?;
                let metadata = dir_entry.metadata()?;
                if !metadata.is_file() {
                    continue;
                }
                let Some(key) = dir_entry.file_name().to_str().and_then(keys::key_for) else {
                    tracing::debug!(path = %dir_entry.path().display(), "ignoring foreign file in cache dir");
                    continue;
                };
                let age = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| wall_now.duration_since(modified).ok())
                    .unwrap_or_default();
                let last_access = now.checked_sub(age).unwrap_or(now);
                state.current_size += metadata.len();
                state.entries.insert(
                    key,
                    CacheEntry::new(dir_entry.path(), metadata.len(), last_access),
                );
                restored += 1;
            }
        }

        let report = cache.sweep_at(now);
        tracing::debug!(
            restored,
            evicted = report.evicted.len(),
            bytes = report.remaining_size,
            "opened cache directory"
        );
        Ok(cache)
    }

    /// Backing file location for `key` inside the cache directory
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir().join(keys::file_name_for(key))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Directory artifacts are expected to live in
    pub fn dir(&self) -> &Path {
        &self.inner.config.dir
    }

    /// Backing path for `key`, refreshing its last access on a hit
    pub fn get(&self, key: &str) -> Option<PathBuf> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let now = Instant::now();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                let path = entry.path.clone();
                state.stats.record_hit();
                Some(path)
            }
            None => {
                state.stats.record_miss();
                None
            }
        }
    }

    /// Track `path` under `key`, replacing any previous entry
    ///
    /// Runs an eviction pass when the insertion pushes the aggregate size
    /// over the configured maximum. The entry just inserted is never one of
    /// its victims; a later sweep evicts it if it alone exceeds the maximum.
    pub fn put(&self, key: impl Into<String>, path: impl Into<PathBuf>, size: u64) {
        self.put_at(key.into(), path.into(), size, Instant::now());
    }

    pub(crate) fn put_at(&self, key: String, path: PathBuf, size: u64, now: Instant) {
        let (replaced, evicted) = {
            let mut state = self.inner.state.lock();
            let replaced = state
                .entries
                .insert(key.clone(), CacheEntry::new(path.clone(), size, now));
            if let Some(old) = &replaced {
                state.current_size -= old.size;
            }
            state.current_size += size;
            state.stats.record_insertion();

            tracing::debug!(key = %key, bytes = size, total = state.current_size, "cached artifact");

            let evicted = if state.current_size > self.inner.config.max_size {
                Some(self.evict_locked(&mut state, now, Some(key.as_str())))
            } else {
                None
            };
            (replaced, evicted)
        };

        if let Some(old) = replaced {
            if old.path != path {
                remove_backing_file(&old.path);
            }
        }
        if let Some((report, victims)) = evicted {
            cleanup::remove_victims(&victims);
            tracing::debug!(
                evicted = report.evicted.len(),
                bytes = report.bytes_freed(),
                "evicted entries after insertion"
            );
        }
    }

    /// Drop the entry for `key` and delete its backing file
    pub fn remove(&self, key: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            let removed = state.entries.remove(key);
            if let Some(entry) = &removed {
                state.current_size -= entry.size;
            }
            removed
        };

        match removed {
            Some(entry) => {
                remove_backing_file(&entry.path);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().entries.is_empty()
    }

    /// Aggregate size of all tracked entries in bytes
    pub fn current_size(&self) -> u64 {
        self.inner.state.lock().current_size
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.inner.state.lock().stats.clone()
    }

    /// Remove every entry and delete all backing files
    pub fn clear(&self) {
        let entries: Vec<CacheEntry> = {
            let mut state = self.inner.state.lock();
            state.current_size = 0;
            state.entries.drain().map(|(_, entry)| entry).collect()
        };
        for entry in &entries {
            remove_backing_file(&entry.path);
        }
        tracing::debug!(removed = entries.len(), "cleared cache");
    }

    /// Run one eviction pass now
    pub fn sweep(&self) -> EvictionReport {
        self.sweep_at(Instant::now())
    }

    /// Run one eviction pass as if the current time were `now`
    pub fn sweep_at(&self, now: Instant) -> EvictionReport {
        let (report, victims) = {
            let mut state = self.inner.state.lock();
            self.evict_locked(&mut state, now, None)
        };
        cleanup::remove_victims(&victims);
        report
    }

    /// Select and unlink victims while the lock is held
    ///
    /// Entries are visited least recently accessed first. An entry is evicted
    /// if it is older than the retention period or the cache is over its
    /// maximum. A pass that started over the maximum stops as soon as the
    /// aggregate reaches the low watermark. `keep` is skipped.
    fn evict_locked(
        &self,
        state: &mut CacheState,
        now: Instant,
        keep: Option<&str>,
    ) -> (EvictionReport, Vec<CacheEntry>) {
        let config = &self.inner.config;
        let low_watermark = config.low_watermark_bytes();
        let capacity_driven = state.current_size > config.max_size;

        let mut order: Vec<(String, Instant)> = state
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_access))
            .collect();
        order.sort_by_key(|(_, last_access)| *last_access);

        let mut report = EvictionReport::default();
        let mut victims = Vec::new();

        for (key, last_access) in order {
            if keep == Some(key.as_str()) {
                continue;
            }
            if capacity_driven && state.current_size <= low_watermark {
                break;
            }

            let expired = now.saturating_duration_since(last_access) > config.retention;
            let over_capacity = state.current_size > config.max_size;
            if !expired && !over_capacity {
                break;
            }

            if let Some(entry) = state.entries.remove(&key) {
                state.current_size -= entry.size;
                report.evicted.push(EvictedEntry {
                    key,
                    size: entry.size,
                    reason: if expired {
                        EvictionReason::Expired
                    } else {
                        EvictionReason::Capacity
                    },
                });
                victims.push(entry);
            }
        }

        report.remaining_size = state.current_size;
        state.stats.record_sweep(&report);
        (report, victims)
    }
}
