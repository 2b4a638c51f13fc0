//! Runs one compression task to a terminal status
//!
//! Every status transition is mirrored to the [`TaskStore`]. Store failures
//! inside a worker are logged and otherwise ignored so one unreachable store
//! write never takes a worker down.

use crate::pool::CompressionRunner;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use zpress_compression::{size_of, CompressionEngine, StatisticsEngine};
use zpress_config::CompressionConfig;
use zpress_core::{CompressionTask, TaskStatus, TaskStore, NO_SIGNIFICANT_REDUCTION};
use zpress_utils::tracing::task_span;

/// How a processed task ended
#[derive(Debug, Clone, PartialEq)]
pub enum CompressionOutcome {
    /// Artifact kept and the file record updated
    Applied {
        original_size: u64,
        compressed_size: u64,
        duration: Duration,
    },
    /// Compression ran but saved too little; artifact discarded
    Skipped {
        original_size: u64,
        compressed_size: u64,
    },
    Failed(String),
}

impl CompressionOutcome {
    pub fn status(&self) -> TaskStatus {
        match self {
            CompressionOutcome::Applied { .. } | CompressionOutcome::Skipped { .. } => {
                TaskStatus::Completed
            }
            CompressionOutcome::Failed(_) => TaskStatus::Failed,
        }
    }
}

pub struct CompressionProcessor {
    store: Arc<dyn TaskStore>,
    stats: Arc<StatisticsEngine>,
    engine: CompressionEngine,
    benefit_threshold: f64,
    record_all_outcomes: bool,
}

impl CompressionProcessor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        stats: Arc<StatisticsEngine>,
        config: &CompressionConfig,
    ) -> Self {
        Self {
            store,
            stats,
            engine: CompressionEngine::new(config.block_size),
            benefit_threshold: config.benefit_threshold,
            record_all_outcomes: config.record_all_outcomes,
        }
    }

    /// Drive `task` from PENDING to COMPLETED or FAILED
    pub fn process(&self, task: &mut CompressionTask) -> CompressionOutcome {
        let file_type = task.file_type();
        let _span = task_span(task.id.as_str(), &file_type).entered();
        let started = Instant::now();

        task.mark_in_progress();
        self.persist(task);

        let outcome = match self.compress(task, started) {
            Ok(outcome) => outcome,
            Err(message) => CompressionOutcome::Failed(message),
        };

        match &outcome {
            CompressionOutcome::Applied {
                original_size,
                compressed_size,
                duration,
            } => {
                task.mark_completed(None);
                self.stats.record_outcome(
                    &file_type,
                    *original_size,
                    *compressed_size,
                    task.level,
                    *duration,
                );
                tracing::info!(
                    original = original_size,
                    compressed = compressed_size,
                    "compression applied"
                );
            }
            CompressionOutcome::Skipped {
                original_size,
                compressed_size,
            } => {
                task.mark_completed(Some(NO_SIGNIFICANT_REDUCTION.to_string()));
                if self.record_all_outcomes {
                    self.stats.record_outcome(
                        &file_type,
                        *original_size,
                        *compressed_size,
                        task.level,
                        started.elapsed(),
                    );
                }
                tracing::info!(
                    original = original_size,
                    compressed = compressed_size,
                    "compression skipped"
                );
            }
            CompressionOutcome::Failed(message) => {
                task.mark_failed(message.clone());
                tracing::warn!(error = %message, "compression task failed");
            }
        }

        self.persist(task);
        outcome
    }

    fn compress(
        &self,
        task: &CompressionTask,
        started: Instant,
    ) -> Result<CompressionOutcome, String> {
        let original_size = size_of(&task.input_path).map_err(|e| {
            format!(
                "Compression failed: cannot read '{}': {e}",
                task.input_path.display()
            )
        })?;

        self.engine
            .try_compress(&task.input_path, &task.output_path, task.level)
            .map_err(|e| format!("Compression failed: {e}"))?;

        let compressed_size = match size_of(&task.output_path) {
            Ok(size) => size,
            Err(e) => {
                discard_artifact(&task.output_path);
                return Err(format!(
                    "Compression failed: cannot read '{}': {e}",
                    task.output_path.display()
                ));
            }
        };

        if compressed_size as f64 >= original_size as f64 * self.benefit_threshold {
            discard_artifact(&task.output_path);
            return Ok(CompressionOutcome::Skipped {
                original_size,
                compressed_size,
            });
        }

        if let Err(e) = self
            .store
            .update_file_compression_info(&task.file_id, compressed_size, true)
        {
            discard_artifact(&task.output_path);
            return Err(format!("Compression failed: {e}"));
        }

        Ok(CompressionOutcome::Applied {
            original_size,
            compressed_size,
            duration: started.elapsed(),
        })
    }

    fn persist(&self, task: &CompressionTask) {
        if let Err(e) = self.store.save_task_state(task) {
            tracing::error!(
                status = task.status.as_str(),
                error = %e,
                "failed to persist task state"
            );
        }
    }
}

impl CompressionRunner for CompressionProcessor {
    fn run(&self, mut task: CompressionTask) {
        self.process(&mut task);
    }
}

fn discard_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!("Failed to remove artifact {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use zpress_core::{CompressionLevel, Error, FileRecord, FileRef, MemoryTaskStore, Result, TaskId};

    fn processor(store: Arc<dyn TaskStore>, config: &CompressionConfig) -> (CompressionProcessor, Arc<StatisticsEngine>) {
        let stats = Arc::new(StatisticsEngine::new());
        (CompressionProcessor::new(store, Arc::clone(&stats), config), stats)
    }

    fn text_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let line = "the quick brown fox jumps over the lazy dog\n";
        fs::write(&path, line.repeat(2000)).unwrap();
        path
    }

    /// Bytes that deflate cannot shrink
    fn noise_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        let mut state: u32 = 0x1234_5678;
        let bytes: Vec<u8> = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_beneficial_compression_is_applied() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryTaskStore::new());
        let (processor, stats) = processor(store.clone(), &CompressionConfig::default());

        let file = FileRef::new("f1", "u1", text_file(temp_dir.path(), "notes.txt"));
        let mut task = CompressionTask::new(&file, CompressionLevel::MAX);
        let outcome = processor.process(&mut task);

        assert!(matches!(outcome, CompressionOutcome::Applied { .. }));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.error_message.is_none());
        assert!(task.completed_at.is_some());
        assert!(task.output_path.exists());

        let stored = store.load_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);

        let record = store.file_record("f1").unwrap().unwrap();
        assert!(record.is_compressed);
        assert_eq!(record.compressed_size, Some(fs::metadata(&task.output_path).unwrap().len()));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_files, 1);
        assert_eq!(snapshot.level_usage.get(&9), Some(&1));
        assert!(stats.efficiency_for("txt") < 0.1);
    }

    #[test]
    fn test_insufficient_reduction_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryTaskStore::new());
        let (processor, stats) = processor(store.clone(), &CompressionConfig::default());

        let file = FileRef::new("f2", "u1", noise_file(temp_dir.path(), "blob.bin", 64 * 1024));
        let mut task = CompressionTask::new(&file, CompressionLevel::BALANCED);
        let outcome = processor.process(&mut task);

        assert!(matches!(outcome, CompressionOutcome::Skipped { .. }));
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.error_message.as_deref(), Some(NO_SIGNIFICANT_REDUCTION));
        assert!(!task.output_path.exists());
        assert_eq!(stats.snapshot().total_files, 0);
        assert!(store.file_record("f2").unwrap().is_none());
    }

    #[test]
    fn test_record_all_outcomes_includes_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let config = CompressionConfig {
            record_all_outcomes: true,
            ..CompressionConfig::default()
        };
        let (processor, stats) = processor(Arc::new(MemoryTaskStore::new()), &config);

        let file = FileRef::new("f3", "u1", noise_file(temp_dir.path(), "blob.bin", 16 * 1024));
        let mut task = CompressionTask::new(&file, CompressionLevel::FAST);
        processor.process(&mut task);

        assert_eq!(stats.snapshot().total_files, 1);
        assert!(stats.efficiency_for("bin") >= 0.9);
    }

    #[test]
    fn test_missing_input_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryTaskStore::new());
        let (processor, stats) = processor(store.clone(), &CompressionConfig::default());

        let file = FileRef::new("f4", "u1", temp_dir.path().join("gone.txt"));
        let mut task = CompressionTask::new(&file, CompressionLevel::FAST);
        let outcome = processor.process(&mut task);

        assert!(matches!(outcome, CompressionOutcome::Failed(_)));
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error_message.as_deref().unwrap().starts_with("Compression failed"));
        assert!(task.completed_at.is_some());
        assert!(!task.output_path.exists());
        assert_eq!(stats.snapshot().total_files, 0);
        assert_eq!(store.load_task(&task.id).unwrap().unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn test_unwritable_output_fails_without_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let (processor, _) = processor(Arc::new(MemoryTaskStore::new()), &CompressionConfig::default());

        let input = text_file(temp_dir.path(), "notes.txt");
        let file = FileRef::new("f5", "u1", &input);
        let mut task = CompressionTask::new(&file, CompressionLevel::FAST);
        task.output_path = temp_dir.path().join("missing-dir").join("notes.txt.z");

        processor.process(&mut task);
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(!task.output_path.exists());
    }

    struct FailingFileUpdates(MemoryTaskStore);

    impl TaskStore for FailingFileUpdates {
        fn save_task_state(&self, task: &CompressionTask) -> Result<()> {
            self.0.save_task_state(task)
        }
        fn load_task(&self, id: &TaskId) -> Result<Option<CompressionTask>> {
            self.0.load_task(id)
        }
        fn find_task_for_file(&self, file_id: &str) -> Result<Option<CompressionTask>> {
            self.0.find_task_for_file(file_id)
        }
        fn update_file_compression_info(&self, _: &str, _: u64, _: bool) -> Result<()> {
            Err(Error::persistence("update file", "database unavailable"))
        }
        fn file_record(&self, file_id: &str) -> Result<Option<FileRecord>> {
            self.0.file_record(file_id)
        }
    }

    #[test]
    fn test_file_update_failure_fails_task() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FailingFileUpdates(MemoryTaskStore::new()));
        let (processor, stats) = processor(store, &CompressionConfig::default());

        let file = FileRef::new("f6", "u1", text_file(temp_dir.path(), "notes.txt"));
        let mut task = CompressionTask::new(&file, CompressionLevel::FAST);
        processor.process(&mut task);

        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error_message.as_deref().unwrap().contains("database unavailable"));
        assert!(!task.output_path.exists());
        assert_eq!(stats.snapshot().total_files, 0);
    }

    #[test]
    fn test_empty_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let (processor, _) = processor(Arc::new(MemoryTaskStore::new()), &CompressionConfig::default());

        let path = temp_dir.path().join("empty.txt");
        fs::write(&path, b"").unwrap();
        let mut task = CompressionTask::new(&FileRef::new("f7", "u1", &path), CompressionLevel::MAX);

        assert!(matches!(processor.process(&mut task), CompressionOutcome::Skipped { .. }));
        assert_eq!(task.status, TaskStatus::Completed);
    }
}
