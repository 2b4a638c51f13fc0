//! Entry point used by an API layer or the CLI
//!
//! [`CompressionService`] owns the worker pool and shares the statistics
//! engine and task store with the processor running on the workers. Nothing
//! here is global; every instance is independent.

use crate::pool::{CompressionRunner, TaskHandle, WorkerPool};
use crate::processor::CompressionProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use zpress_cache::CacheManager;
use zpress_compression::{size_of, CompressionEngine, CompressionStats, StatisticsEngine};
use zpress_config::Config;
use zpress_core::{
    CompressionLevel, CompressionTask, Error, FileRef, Result, ResultExt, TaskId, TaskStatus,
    TaskStore, NO_COMPRESSION_TASK,
};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct CompressionService {
    store: Arc<dyn TaskStore>,
    stats: Arc<StatisticsEngine>,
    engine: CompressionEngine,
    pool: WorkerPool,
}

impl CompressionService {
    pub fn new(config: &Config, store: Arc<dyn TaskStore>) -> Self {
        let stats = Arc::new(StatisticsEngine::with_policy((&config.compression).into()));
        Self::with_stats(config, store, stats)
    }

    /// Build a service around an existing statistics engine
    pub fn with_stats(
        config: &Config,
        store: Arc<dyn TaskStore>,
        stats: Arc<StatisticsEngine>,
    ) -> Self {
        let processor: Arc<dyn CompressionRunner> = Arc::new(CompressionProcessor::new(
            Arc::clone(&store),
            Arc::clone(&stats),
            &config.compression,
        ));
        Self {
            pool: WorkerPool::new(&config.pool, processor),
            engine: CompressionEngine::new(config.compression.block_size),
            store,
            stats,
        }
    }

    pub fn statistics(&self) -> &Arc<StatisticsEngine> {
        &self.stats
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Persist a PENDING task for `file` and queue it
    ///
    /// A task whose initial state cannot be persisted is never queued; the
    /// store error is returned instead. Nothing is persisted once the pool is
    /// shutting down.
    pub fn schedule_compression(&self, file: &FileRef, level: CompressionLevel) -> Result<TaskId> {
        if self.pool.is_shutting_down() {
            return Err(Error::PoolShutdown);
        }

        let mut task = CompressionTask::new(file, level);
        let id = task.id.clone();

        self.store.save_task_state(&task)?;
        if let Err(e) = self.pool.enqueue_compression(task.clone()) {
            // shutdown raced the check above; the stored task would never run
            task.mark_failed(format!("Compression not started: {e}"));
            if let Err(store_err) = self.store.save_task_state(&task) {
                tracing::error!(task_id = %id, error = %store_err, "failed to persist task state");
            }
            return Err(e);
        }

        tracing::debug!(task_id = %id, file_id = %file.file_id, level = level.value(), "scheduled compression");
        Ok(id)
    }

    /// Schedule `file` at the level learned for its type, if worth it at all
    pub fn schedule_auto(&self, file: &FileRef) -> Result<Option<TaskId>> {
        let size = size_of(&file.path).fs_context(&file.path, "read metadata")?;
        let file_type = file.file_type();

        if !self.stats.should_compress(&file_type, size) {
            tracing::debug!(file_id = %file.file_id, file_type = %file_type, size, "compression not worthwhile");
            return Ok(None);
        }

        let level = self.stats.suggest_level(&file_type, size);
        if level == CompressionLevel::NONE {
            return Ok(None);
        }

        self.schedule_compression(file, level).map(Some)
    }

    pub fn query_compression_status(&self, id: &TaskId) -> Result<Option<CompressionTask>> {
        self.store.load_task(id)
    }

    /// Most recent task scheduled for a file
    pub fn query_status_for_file(&self, file_id: &str) -> Result<Option<CompressionTask>> {
        self.store.find_task_for_file(file_id)
    }

    /// Status string of the latest task for a file, or `NO_COMPRESSION_TASK`
    pub fn status_label(&self, file_id: &str) -> Result<String> {
        Ok(self
            .query_status_for_file(file_id)?
            .map(|task| task.status.as_str().to_string())
            .unwrap_or_else(|| NO_COMPRESSION_TASK.to_string()))
    }

    pub fn query_stats(&self) -> CompressionStats {
        self.stats.snapshot()
    }

    /// Run arbitrary work on the pool ahead of queued compression jobs
    pub fn submit<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.pool.submit(f)
    }

    /// Poll the store until the task is terminal or `timeout` elapses
    ///
    /// Returns the last stored state either way.
    pub fn wait_for(&self, id: &TaskId, timeout: Duration) -> Result<Option<CompressionTask>> {
        let deadline = Instant::now() + timeout;
        loop {
            let task = self.store.load_task(id)?;
            let done = task.as_ref().map_or(true, |t| t.status.is_terminal());
            if done || Instant::now() >= deadline {
                return Ok(task);
            }
            std::thread::sleep(STATUS_POLL_INTERVAL);
        }
    }

    /// Decompressed copy of a completed task's artifact, served from `cache`
    ///
    /// The copy is keyed by file id and stored at [`CacheManager::path_for`].
    /// A cache hit returns the tracked path without touching the compressed
    /// artifact.
    pub fn materialize(&self, task_id: &TaskId, cache: &CacheManager) -> Result<PathBuf> {
        let task = self
            .store
            .load_task(task_id)?
            .ok_or_else(|| Error::TaskNotFound {
                id: task_id.to_string(),
            })?;

        if let Some(path) = cache.get(&task.file_id) {
            if path.exists() {
                return Ok(path);
            }
            cache.remove(&task.file_id);
        }

        if task.status != TaskStatus::Completed || !task.output_path.exists() {
            let reason = match task.status {
                TaskStatus::Completed => "compression was not applied".to_string(),
                status => format!("task is {status}"),
            };
            return Err(Error::ArtifactUnavailable {
                task_id: task_id.to_string(),
                reason,
            });
        }

        std::fs::create_dir_all(cache.dir()).fs_context(cache.dir(), "create cache directory")?;
        let destination = cache.path_for(&task.file_id);

        self.engine
            .try_decompress(&task.output_path, &destination)
            .map_err(|e| {
                Error::file_system(
                    &task.output_path,
                    "decompress",
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                )
            })?;

        let size = size_of(&destination).fs_context(&destination, "read metadata")?;
        cache.put(task.file_id.clone(), destination.clone(), size);
        if !cache.contains(&task.file_id) {
            return Err(Error::ArtifactUnavailable {
                task_id: task_id.to_string(),
                reason: "decompressed copy was evicted from the cache".to_string(),
            });
        }

        tracing::debug!(task_id = %task_id, path = %destination.display(), bytes = size, "materialized artifact");
        Ok(destination)
    }

    /// Stop accepting work and wait for queued tasks to finish
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zpress_core::MemoryTaskStore;

    #[test]
    fn test_status_label_without_task() {
        let mut config = Config::default();
        config.pool.threads = 1;
        let service = CompressionService::new(&config, Arc::new(MemoryTaskStore::new()));
        assert_eq!(service.status_label("unknown").unwrap(), NO_COMPRESSION_TASK);
    }
}
