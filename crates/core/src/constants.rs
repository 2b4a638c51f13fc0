//! Constants used throughout the zpress codebase
// Suffix appended to a file path to name its compressed artifact
pub const COMPRESSED_SUFFIX: &str = ".z";

// Environment variable names
pub const ZPRESS_LOG_VAR: &str = "ZPRESS_LOG";
pub const ZPRESS_CONFIG_VAR: &str = "ZPRESS_CONFIG";

// Status reported for a file that never had a task scheduled
pub const NO_COMPRESSION_TASK: &str = "NO_COMPRESSION_TASK";

// Explanatory note for a compression that was attempted but not applied
pub const NO_SIGNIFICANT_REDUCTION: &str = "Compression skipped: no significant size reduction";
