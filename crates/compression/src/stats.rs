//! Online statistics of compression outcomes
//!
//! Every beneficial compression is folded into running means, overall and
//! per file type. The per-type means drive [`StatisticsEngine::suggest_level`]
//! and [`StatisticsEngine::should_compress`], so types that historically
//! compress poorly stop being compressed while types that compress well are
//! pushed to maximum effort.

use crate::policy::{is_precompressed, DecisionPolicy};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use zpress_core::CompressionLevel;

/// Ratio reported for a file type with no history
pub const NEUTRAL_EFFICIENCY: f64 = 0.0;

/// Snapshot of aggregate compression statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub total_files: u64,
    #[serde(rename = "total_bytes_original")]
    pub total_original_bytes: u64,
    #[serde(rename = "total_bytes_compressed")]
    pub total_compressed_bytes: u64,
    /// Mean of compressed/original over all recorded outcomes
    #[serde(rename = "average_compression_ratio")]
    pub mean_ratio: f64,
    #[serde(rename = "average_compression_time_ms")]
    pub mean_duration_ms: f64,
    /// Level value to number of recorded outcomes at that level
    pub level_usage: BTreeMap<u32, u64>,
    /// File type to mean ratio
    #[serde(rename = "file_type_stats")]
    pub file_type_ratios: BTreeMap<String, f64>,
    /// File type to number of outcomes behind its mean
    #[serde(default)]
    pub file_type_counts: BTreeMap<String, u64>,
}

impl CompressionStats {
    pub fn mean_duration(&self) -> Duration {
        Duration::from_secs_f64(self.mean_duration_ms.max(0.0) / 1000.0)
    }

    /// Bytes not written thanks to compression
    pub fn bytes_saved(&self) -> u64 {
        self.total_original_bytes
            .saturating_sub(self.total_compressed_bytes)
    }
}

/// Thread-safe aggregator of compression outcomes
#[derive(Debug, Default)]
pub struct StatisticsEngine {
    stats: Mutex<CompressionStats>,
    policy: DecisionPolicy,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DecisionPolicy) -> Self {
        Self::from_snapshot(CompressionStats::default(), policy)
    }

    /// Continue aggregating from a previously taken snapshot
    ///
    /// Types missing from `file_type_counts` are assumed to have one sample.
    pub fn from_snapshot(mut stats: CompressionStats, policy: DecisionPolicy) -> Self {
        for file_type in stats.file_type_ratios.keys() {
            stats
                .file_type_counts
                .entry(file_type.clone())
                .or_insert(1);
        }
        Self {
            stats: Mutex::new(stats),
            policy,
        }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Fold one completed compression into the aggregates
    pub fn record_outcome(
        &self,
        file_type: &str,
        original_size: u64,
        compressed_size: u64,
        level: CompressionLevel,
        duration: Duration,
    ) {
        let ratio = if original_size == 0 {
            1.0
        } else {
            compressed_size as f64 / original_size as f64
        };
        let duration_ms = duration.as_secs_f64() * 1000.0;

        let mut guard = self.stats.lock();
        let stats = &mut *guard;

        stats.total_files += 1;
        stats.total_original_bytes += original_size;
        stats.total_compressed_bytes += compressed_size;

        let n = stats.total_files as f64;
        stats.mean_ratio = online_mean(stats.mean_ratio, n, ratio);
        stats.mean_duration_ms = online_mean(stats.mean_duration_ms, n, duration_ms);

        *stats.level_usage.entry(level.value()).or_insert(0) += 1;

        let samples = stats
            .file_type_counts
            .entry(file_type.to_string())
            .or_insert(0);
        *samples += 1;
        let samples = *samples;
        let type_mean = stats
            .file_type_ratios
            .entry(file_type.to_string())
            .or_insert(0.0);
        *type_mean = online_mean(*type_mean, samples as f64, ratio);

        tracing::debug!(
            file_type,
            ratio,
            level = level.value(),
            total_files = stats.total_files,
            "recorded compression outcome"
        );
    }

    /// Copy of the current aggregates
    pub fn snapshot(&self) -> CompressionStats {
        self.stats.lock().clone()
    }

    /// Learned mean ratio for `file_type`, if any outcome was recorded
    pub fn learned_ratio(&self, file_type: &str) -> Option<f64> {
        self.stats
            .lock()
            .file_type_ratios
            .get(file_type)
            .copied()
    }

    /// Learned mean ratio, or [`NEUTRAL_EFFICIENCY`] for unseen types
    pub fn efficiency_for(&self, file_type: &str) -> f64 {
        self.learned_ratio(file_type).unwrap_or(NEUTRAL_EFFICIENCY)
    }

    /// Level to compress a file of this type and size with
    pub fn suggest_level(&self, file_type: &str, size: u64) -> CompressionLevel {
        if let Some(ratio) = self.learned_ratio(file_type) {
            if ratio > self.policy.skip_ratio {
                return CompressionLevel::NONE;
            }
            if ratio < self.policy.max_effort_ratio {
                return CompressionLevel::MAX;
            }
        }
        self.policy.level_for_size(size)
    }

    /// Whether compressing a file of this type and size is worth attempting
    pub fn should_compress(&self, file_type: &str, size: u64) -> bool {
        if size < self.policy.min_size || is_precompressed(file_type) {
            return false;
        }
        match self.learned_ratio(file_type) {
            Some(ratio) => ratio < self.policy.skip_ratio,
            None => true,
        }
    }
}

fn online_mean(mean: f64, n: f64, sample: f64) -> f64 {
    (mean * (n - 1.0) + sample) / n
}
