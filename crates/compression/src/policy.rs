//! Thresholds that turn learned statistics into compression decisions

use zpress_config::CompressionConfig;
use zpress_core::CompressionLevel;

/// File types that are already compressed and not worth another pass
pub const PRECOMPRESSED_EXTENSIONS: &[&str] = &[
    // Archives
    "zip", "gz", "bz2", "xz", "7z", "rar", "zst", "lz4", "tgz", "z",
    // Images
    "jpg", "jpeg", "png", "gif", "webp", "heic", "avif",
    // Audio and video
    "mp3", "mp4", "aac", "ogg", "flac", "m4a", "mkv", "mov", "webm",
    // Documents
    "pdf", "docx", "xlsx", "pptx",
];

/// Whether `file_type` (a lowercase extension) names an already-compressed format
pub fn is_precompressed(file_type: &str) -> bool {
    PRECOMPRESSED_EXTENSIONS.contains(&file_type)
}

/// Decision thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPolicy {
    /// Files below this many bytes are never compressed
    pub min_size: u64,
    /// Ratio at or above which compression is considered not worthwhile
    pub skip_ratio: f64,
    /// Ratio below which a type is pushed to maximum effort
    pub max_effort_ratio: f64,
    /// Size ladder: below this, `FAST`
    pub fast_below: u64,
    /// Size ladder: below this, `BALANCED`; otherwise `MAX`
    pub balanced_below: u64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            min_size: 1024,
            skip_ratio: 0.9,
            max_effort_ratio: 0.5,
            fast_below: 1024 * 1024,
            balanced_below: 10 * 1024 * 1024,
        }
    }
}

impl From<&CompressionConfig> for DecisionPolicy {
    fn from(config: &CompressionConfig) -> Self {
        Self {
            min_size: config.min_size,
            skip_ratio: config.benefit_threshold,
            ..Self::default()
        }
    }
}

impl DecisionPolicy {
    /// Level chosen from the file size alone
    pub fn level_for_size(&self, size: u64) -> CompressionLevel {
        if size < self.fast_below {
            CompressionLevel::FAST
        } else if size < self.balanced_below {
            CompressionLevel::BALANCED
        } else {
            CompressionLevel::MAX
        }
    }
}
