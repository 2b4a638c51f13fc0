//! Configuration sections with their defaults

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use zpress_utils::xdg::XdgPaths;

/// Size of the blocks the compression engine streams through
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Complete zpress configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pool: PoolConfig,
    pub cache: CacheConfig,
    pub compression: CompressionConfig,
    pub store: StoreConfig,
}

/// Worker pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads; zero means one per hardware thread
    pub threads: usize,
}

impl PoolConfig {
    pub fn with_threads(threads: usize) -> Self {
        Self { threads }
    }

    /// Thread count actually spawned, never below one
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { threads: 0 }
    }
}

/// Bounds and timing of the artifact cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory decompressed artifacts are materialised into
    pub dir: PathBuf,
    /// Hard maximum of the aggregate tracked size in bytes
    pub max_size: u64,
    /// Entries not accessed for longer than this are evicted
    #[serde(with = "duration_secs")]
    pub retention: Duration,
    /// Period of the background sweep; zero disables it
    #[serde(with = "duration_secs")]
    pub sweep_interval: Duration,
    /// Fraction of `max_size` an eviction pass stops at
    pub low_watermark: f64,
}

impl CacheConfig {
    /// Aggregate size an eviction pass is allowed to stop at
    pub fn low_watermark_bytes(&self) -> u64 {
        (self.max_size as f64 * self.low_watermark.clamp(0.0, 1.0)) as u64
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: XdgPaths::cache_dir(),
            max_size: 1024 * 1024 * 1024, // 1GB
            retention: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            low_watermark: 0.8,
        }
    }
}

/// Thresholds of the compression decision layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Files smaller than this are never compressed
    pub min_size: u64,
    /// A compressed artifact is kept only below this fraction of the original
    pub benefit_threshold: f64,
    /// Streaming block size in bytes
    pub block_size: usize,
    /// Also feed non-beneficial outcomes into the statistics
    pub record_all_outcomes: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_size: 1024,
            benefit_threshold: 0.9,
            block_size: DEFAULT_BLOCK_SIZE,
            record_all_outcomes: false,
        }
    }
}

/// Locations of the files the CLI persists between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON task store
    pub path: Option<PathBuf>,
    /// Statistics snapshot
    pub stats_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(XdgPaths::task_store_file)
    }

    pub fn resolved_stats_path(&self) -> PathBuf {
        self.stats_path.clone().unwrap_or_else(XdgPaths::stats_file)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom(format!(
                "duration must be a non-negative number of seconds, got {secs}"
            )));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
