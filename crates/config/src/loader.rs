//! Configuration loader with precedence handling

use crate::config::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zpress_core::{Error, Result, ResultExt, ZPRESS_CONFIG_VAR};
use zpress_utils::xdg::XdgPaths;

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in defaults only
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// At least one environment variable
    EnvironmentVariable(String),
}

/// A loaded configuration and where its last layer came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
}

/// Loads configuration from defaults, then a JSON file, then `ZPRESS_*` variables
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full precedence handling
    pub fn load() -> Result<LoadedConfig> {
        let file = std::env::var(ZPRESS_CONFIG_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| XdgPaths::config_file());
        Self::load_with(Some(&file), |name| std::env::var(name).ok())
    }

    /// Load configuration from an explicit file and variable lookup
    pub fn load_with<F>(file: Option<&Path>, lookup: F) -> Result<LoadedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let mut source = ConfigSource::Default;

        if let Some(path) = file {
            if let Some(file_config) = Self::load_from_config_file(path)? {
                tracing::debug!(path = %path.display(), "loaded configuration file");
                config = file_config;
                source = ConfigSource::ConfigFile(path.to_path_buf());
            }
        }

        if Self::apply_env(&mut config, lookup)? {
            source = ConfigSource::EnvironmentVariable("ZPRESS_*".to_string());
        }

        Ok(LoadedConfig { config, source })
    }

    /// Load configuration from config file, `None` if it does not exist
    fn load_from_config_file(path: &Path) -> Result<Option<Config>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).fs_context(path, "read config file")?;

        let config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid config file '{}': {e}", path.display()))
        })?;

        Ok(Some(config))
    }

    /// Override values from environment variables; returns whether any applied
    fn apply_env<F>(config: &mut Config, lookup: F) -> Result<bool>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut has_env_config = false;

        if let Some(threads) = parse_var::<usize>(&lookup, "ZPRESS_THREADS")? {
            config.pool.threads = threads;
            has_env_config = true;
        }

        if let Some(dir) = lookup("ZPRESS_CACHE_DIR") {
            config.cache.dir = PathBuf::from(dir);
            has_env_config = true;
        }

        if let Some(max_size) = parse_var::<u64>(&lookup, "ZPRESS_CACHE_MAX_SIZE")? {
            config.cache.max_size = max_size;
            has_env_config = true;
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "ZPRESS_CACHE_RETENTION_SECS")? {
            config.cache.retention = Duration::from_secs(secs);
            has_env_config = true;
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "ZPRESS_CACHE_SWEEP_SECS")? {
            config.cache.sweep_interval = Duration::from_secs(secs);
            has_env_config = true;
        }

        if let Some(min_size) = parse_var::<u64>(&lookup, "ZPRESS_MIN_SIZE")? {
            config.compression.min_size = min_size;
            has_env_config = true;
        }

        if let Some(record_all) = parse_var::<bool>(&lookup, "ZPRESS_RECORD_ALL_OUTCOMES")? {
            config.compression.record_all_outcomes = record_all;
            has_env_config = true;
        }

        if let Some(path) = lookup("ZPRESS_STORE_PATH") {
            config.store.path = Some(PathBuf::from(path));
            has_env_config = true;
        }

        if let Some(path) = lookup("ZPRESS_STATS_PATH") {
            config.store.stats_path = Some(PathBuf::from(path));
            has_env_config = true;
        }

        Ok(has_env_config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .to_ascii_lowercase()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::configuration(format!("{name}='{raw}' is invalid: {e}"))),
    }
}
