use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for zpress
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/zpress or fallback
    pub fn config_dir() -> PathBuf {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .unwrap_or_else(|| PathBuf::from(".config"))
            })
            .join("zpress")
    }

    /// Get XDG_DATA_HOME/zpress or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/share"))
                    .unwrap_or_else(|| PathBuf::from(".local/share"))
            })
            .join("zpress")
    }

    /// Get XDG_CACHE_HOME/zpress or fallback
    pub fn cache_dir() -> PathBuf {
        env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".cache"))
                    .unwrap_or_else(|| PathBuf::from(".cache"))
            })
            .join("zpress")
    }

    /// Default location of the JSON configuration file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Default location of the JSON task store
    pub fn task_store_file() -> PathBuf {
        Self::data_dir().join("tasks.json")
    }

    /// Default location of the persisted statistics snapshot
    pub fn stats_file() -> PathBuf {
        Self::data_dir().join("stats.json")
    }
}
