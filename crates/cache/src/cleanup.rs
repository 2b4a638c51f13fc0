//! Backing-file removal and the periodic background sweep

use crate::entry::CacheEntry;
use crate::manager::CacheManager;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Delete an artifact, ignoring files that are already gone
pub(crate) fn remove_backing_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!("Failed to remove cached file {}: {}", path.display(), e);
        }
    }
}

pub(crate) fn remove_victims(victims: &[CacheEntry]) {
    for entry in victims {
        remove_backing_file(&entry.path);
    }
}

impl CacheManager {
    /// Start the periodic sweep on the current tokio runtime
    ///
    /// Returns `false` without spawning anything when the configured interval
    /// is zero or a sweeper is already running. The task stops on its own
    /// once every handle to the cache has been dropped.
    pub fn start_sweeper(&self) -> bool {
        let period = self.inner.config.sweep_interval;
        if period == Duration::ZERO {
            return false;
        }

        let mut slot = self.inner.sweeper.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let cache = CacheManager { inner };
                match tokio::task::spawn_blocking(move || cache.sweep()).await {
                    Ok(report) if !report.is_empty() => {
                        tracing::info!(
                            evicted = report.evicted.len(),
                            bytes = report.bytes_freed(),
                            remaining = report.remaining_size,
                            "cache sweep evicted entries"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Cache sweep error: {}", e);
                    }
                }
            }
        });

        *slot = Some(handle);
        tracing::debug!(period_secs = period.as_secs_f64(), "started cache sweeper");
        true
    }

    /// Abort the background sweep if one is running
    pub fn stop_sweeper(&self) {
        if let Some(handle) = self.inner.sweeper.lock().take() {
            handle.abort();
        }
    }

    pub fn sweeper_running(&self) -> bool {
        self.inner
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zpress_config::CacheConfig;

    #[test]
    fn test_remove_missing_file_is_silent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        remove_backing_file(&temp_dir.path().join("missing"));
    }

    #[tokio::test]
    async fn test_zero_interval_disables_sweeper() {
        let cache = CacheManager::new(CacheConfig {
            sweep_interval: Duration::ZERO,
            ..CacheConfig::default()
        });
        assert!(!cache.start_sweeper());
        assert!(!cache.sweeper_running());
    }

    #[tokio::test]
    async fn test_sweeper_starts_once() {
        let cache = CacheManager::new(CacheConfig {
            sweep_interval: Duration::from_secs(60),
            ..CacheConfig::default()
        });
        assert!(cache.start_sweeper());
        assert!(!cache.start_sweeper());
        assert!(cache.sweeper_running());

        cache.stop_sweeper();
        assert!(!cache.sweeper_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sweeper_does_not_keep_cache_alive() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let cache = CacheManager::new(CacheConfig {
            dir: temp_dir.path().to_path_buf(),
            sweep_interval: Duration::from_millis(10),
            ..CacheConfig::default()
        });
        assert!(cache.start_sweeper());
        // let a few sweeps run first
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.statistics().sweeps >= 1);

        let weak = Arc::downgrade(&cache.inner);
        drop(cache);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(weak.upgrade().is_none());
    }
}
