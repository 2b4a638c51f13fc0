//! Builds the components a command needs from the loaded configuration

use eyre::WrapErr;
use std::sync::Arc;
use zpress_cache::CacheManager;
use zpress_compression::{CompressionEngine, CompressionStats, DecisionPolicy, StatisticsEngine};
use zpress_config::Config;
use zpress_task::{CompressionService, JsonTaskStore};
use zpress_utils::write_atomic;

pub struct Context {
    pub config: Config,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn engine(&self) -> CompressionEngine {
        CompressionEngine::new(self.config.compression.block_size)
    }

    pub fn open_store(&self) -> eyre::Result<Arc<JsonTaskStore>> {
        let path = self.config.store.resolved_path();
        let store = JsonTaskStore::open(&path)
            .wrap_err_with(|| format!("failed to open task store '{}'", path.display()))?;
        Ok(Arc::new(store))
    }

    /// Statistics learned by earlier runs, or an empty engine
    pub fn load_statistics(&self) -> eyre::Result<Arc<StatisticsEngine>> {
        let policy = DecisionPolicy::from(&self.config.compression);
        let path = self.config.store.resolved_stats_path();
        if !path.exists() {
            return Ok(Arc::new(StatisticsEngine::with_policy(policy)));
        }

        let content = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("failed to read '{}'", path.display()))?;
        let snapshot: CompressionStats = serde_json::from_str(&content)
            .wrap_err_with(|| format!("invalid statistics file '{}'", path.display()))?;
        Ok(Arc::new(StatisticsEngine::from_snapshot(snapshot, policy)))
    }

    pub fn save_statistics(&self, stats: &CompressionStats) -> eyre::Result<()> {
        let path = self.config.store.resolved_stats_path();
        let content = serde_json::to_vec_pretty(stats)?;
        write_atomic(&path, &content)
            .wrap_err_with(|| format!("failed to write '{}'", path.display()))
    }

    pub fn service(&self) -> eyre::Result<CompressionService> {
        let store = self.open_store()?;
        let stats = self.load_statistics()?;
        Ok(CompressionService::with_stats(&self.config, store, stats))
    }

    /// Cache over the configured directory, restored from earlier runs
    ///
    /// Must be called inside the tokio runtime so the periodic sweep can start.
    pub fn cache(&self) -> eyre::Result<CacheManager> {
        let directory = self.config.cache.dir.clone();
        let cache = CacheManager::open(self.config.cache.clone())
            .wrap_err_with(|| format!("failed to open cache '{}'", directory.display()))?;
        cache.start_sweeper();
        Ok(cache)
    }
}
