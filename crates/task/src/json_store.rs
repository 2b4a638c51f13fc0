//! [`TaskStore`] persisted as a single JSON document

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zpress_core::{
    CompressionTask, Error, FileRecord, MemoryTaskStore, Result, ResultExt, TaskId, TaskStore,
};
use zpress_utils::write_atomic;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    tasks: Vec<CompressionTask>,
    #[serde(default)]
    files: Vec<FileRecord>,
}

/// Task store that rewrites its JSON file after every change
///
/// Lets task status survive across separate CLI invocations. Writes go
/// through a temporary file and a rename, so readers never see a torn
/// document. A change becomes visible in memory only after the document
/// containing it was written.
#[derive(Debug)]
pub struct JsonTaskStore {
    path: PathBuf,
    records: MemoryTaskStore,
    write_lock: Mutex<()>,
}

impl JsonTaskStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path).fs_context(&path, "read task store")?;
            let document: StoreDocument = serde_json::from_str(&content).map_err(|e| {
                Error::persistence(
                    "open task store",
                    format!("invalid store file '{}': {e}", path.display()),
                )
            })?;
            if document.version > STORE_VERSION {
                return Err(Error::persistence(
                    "open task store",
                    format!(
                        "store file '{}' has unsupported version {}",
                        path.display(),
                        document.version
                    ),
                ));
            }
            MemoryTaskStore::from_parts(document.tasks, document.files)
        } else {
            MemoryTaskStore::new()
        };

        tracing::debug!(path = %path.display(), tasks = records.task_count(), "opened task store");

        Ok(Self {
            path,
            records,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored tasks, oldest first
    pub fn tasks(&self) -> Vec<CompressionTask> {
        self.records.tasks()
    }

    /// Write `document`, then `apply` the same change to the in-memory records
    ///
    /// Callers hold the write lock from building `document` until this returns,
    /// so changes reach disk and memory in the same order.
    fn commit<F>(&self, operation: &str, document: StoreDocument, apply: F) -> Result<()>
    where
        F: FnOnce(&MemoryTaskStore) -> Result<()>,
    {
        let content = serde_json::to_vec_pretty(&document)?;
        write_atomic(&self.path, &content)
            .map_err(|e| Error::persistence(operation, e.to_string()))?;
        apply(&self.records)
    }
}

impl TaskStore for JsonTaskStore {
    fn save_task_state(&self, task: &CompressionTask) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut tasks = self.records.tasks();
        match tasks.iter_mut().find(|stored| stored.id == task.id) {
            Some(stored) => *stored = task.clone(),
            None => tasks.push(task.clone()),
        }
        let document = StoreDocument {
            version: STORE_VERSION,
            tasks,
            files: self.records.file_records(),
        };
        self.commit("save task state", document, |records| {
            records.save_task_state(task)
        })
    }

    fn load_task(&self, id: &TaskId) -> Result<Option<CompressionTask>> {
        self.records.load_task(id)
    }

    fn find_task_for_file(&self, file_id: &str) -> Result<Option<CompressionTask>> {
        self.records.find_task_for_file(file_id)
    }

    fn update_file_compression_info(
        &self,
        file_id: &str,
        compressed_size: u64,
        is_compressed: bool,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut files = self.records.file_records();
        let record = FileRecord {
            file_id: file_id.to_string(),
            compressed_size: Some(compressed_size),
            is_compressed,
        };
        match files.iter_mut().find(|stored| stored.file_id == file_id) {
            Some(stored) => *stored = record,
            None => files.push(record),
        }
        let document = StoreDocument {
            version: STORE_VERSION,
            tasks: self.records.tasks(),
            files,
        };
        self.commit("update file compression info", document, |records| {
            records.update_file_compression_info(file_id, compressed_size, is_compressed)
        })
    }

    fn file_record(&self, file_id: &str) -> Result<Option<FileRecord>> {
        self.records.file_record(file_id)
    }
}
