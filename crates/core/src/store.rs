//! Persistence boundary for task and file records
//!
//! zpress does not own a database. Everything it needs to remember about a
//! task or a file goes through [`TaskStore`], which the embedding
//! application implements on top of whatever storage it has.
//! [`MemoryTaskStore`] is the in-process implementation used by tests and
//! short-lived processes.

use crate::errors::Result;
use crate::types::{CompressionTask, FileRecord, TaskId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Persistence collaborator called at every task-status transition
pub trait TaskStore: Send + Sync {
    /// Insert or overwrite the stored state of `task`
    fn save_task_state(&self, task: &CompressionTask) -> Result<()>;

    /// Load a task by id
    fn load_task(&self, id: &TaskId) -> Result<Option<CompressionTask>>;

    /// Most recently created task for a file
    fn find_task_for_file(&self, file_id: &str) -> Result<Option<CompressionTask>>;

    /// Record the outcome of an applied compression on the file itself
    fn update_file_compression_info(
        &self,
        file_id: &str,
        compressed_size: u64,
        is_compressed: bool,
    ) -> Result<()>;

    /// Compression state of a file, if it was ever updated
    fn file_record(&self, file_id: &str) -> Result<Option<FileRecord>>;
}

#[derive(Debug, Default, Clone)]
struct Records {
    tasks: HashMap<TaskId, CompressionTask>,
    files: HashMap<String, FileRecord>,
}

/// In-memory [`TaskStore`]
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    records: RwLock<Records>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks stored
    pub fn task_count(&self) -> usize {
        self.records.read().tasks.len()
    }

    /// All stored tasks, oldest first
    pub fn tasks(&self) -> Vec<CompressionTask> {
        let mut tasks: Vec<_> = self.records.read().tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Build a store pre-populated with `tasks` and `files`
    pub fn from_parts(
        tasks: impl IntoIterator<Item = CompressionTask>,
        files: impl IntoIterator<Item = FileRecord>,
    ) -> Self {
        let records = Records {
            tasks: tasks.into_iter().map(|t| (t.id.clone(), t)).collect(),
            files: files.into_iter().map(|f| (f.file_id.clone(), f)).collect(),
        };
        Self {
            records: RwLock::new(records),
        }
    }

    /// All stored file records
    pub fn file_records(&self) -> Vec<FileRecord> {
        self.records.read().files.values().cloned().collect()
    }
}

impl TaskStore for MemoryTaskStore {
    fn save_task_state(&self, task: &CompressionTask) -> Result<()> {
        self.records
            .write()
            .tasks
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn load_task(&self, id: &TaskId) -> Result<Option<CompressionTask>> {
        Ok(self.records.read().tasks.get(id).cloned())
    }

    fn find_task_for_file(&self, file_id: &str) -> Result<Option<CompressionTask>> {
        Ok(self
            .records
            .read()
            .tasks
            .values()
            .filter(|t| t.file_id == file_id)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    fn update_file_compression_info(
        &self,
        file_id: &str,
        compressed_size: u64,
        is_compressed: bool,
    ) -> Result<()> {
        self.records.write().files.insert(
            file_id.to_string(),
            FileRecord {
                file_id: file_id.to_string(),
                compressed_size: Some(compressed_size),
                is_compressed,
            },
        );
        Ok(())
    }

    fn file_record(&self, file_id: &str) -> Result<Option<FileRecord>> {
        Ok(self.records.read().files.get(file_id).cloned())
    }
}
