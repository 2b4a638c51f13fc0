//! Cache entry bookkeeping and eviction results

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

/// One tracked artifact
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    pub last_access: Instant,
}

impl CacheEntry {
    pub fn new(path: impl Into<PathBuf>, size: u64, now: Instant) -> Self {
        Self {
            path: path.into(),
            size,
            last_access: now,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_access = now;
    }
}

/// Why an entry was evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Not accessed for longer than the retention period
    Expired,
    /// Removed to bring the cache back under its size limit
    Capacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictedEntry {
    pub key: String,
    pub size: u64,
    pub reason: EvictionReason,
}

/// Result of one eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionReport {
    /// Entries removed, least recently accessed first
    pub evicted: Vec<EvictedEntry>,
    /// Aggregate size once the pass finished
    pub remaining_size: u64,
}

impl EvictionReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty()
    }

    pub fn bytes_freed(&self) -> u64 {
        self.evicted.iter().map(|e| e.size).sum()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.evicted.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn count(&self, reason: EvictionReason) -> usize {
        self.evicted.iter().filter(|e| e.reason == reason).count()
    }
}

/// Counters of cache activity
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub bytes_evicted: u64,
    pub sweeps: u64,
    pub last_sweep: Option<SystemTime>,
}

impl CacheStatistics {
    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_insertion(&mut self) {
        self.insertions += 1;
    }

    pub(crate) fn record_sweep(&mut self, report: &EvictionReport) {
        self.sweeps += 1;
        self.evictions += report.evicted.len() as u64;
        self.bytes_evicted += report.bytes_freed();
        self.last_sweep = Some(SystemTime::now());
    }

    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
