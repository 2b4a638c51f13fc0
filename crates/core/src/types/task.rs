//! Compression task records and the file references they point at

use super::level::CompressionLevel;
use crate::constants::COMPRESSED_SUFFIX;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, unique identifier of a compression task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle of a compression task
///
/// `Pending -> InProgress -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(crate::Error::configuration(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

/// Reference to a stored file that can be compressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    pub owner_id: String,
    pub path: PathBuf,
}

impl FileRef {
    pub fn new(
        file_id: impl Into<String>,
        owner_id: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            owner_id: owner_id.into(),
            path: path.into(),
        }
    }

    /// Where the compressed artifact for this file is written
    pub fn compressed_path(&self) -> PathBuf {
        compressed_path_for(&self.path)
    }

    /// Statistics key of this file
    pub fn file_type(&self) -> String {
        file_type_of(&self.path)
    }
}

/// A unit of scheduled compression work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionTask {
    pub id: TaskId,
    pub file_id: String,
    pub user_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub level: CompressionLevel,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompressionTask {
    /// Create a pending task for `file`
    pub fn new(file: &FileRef, level: CompressionLevel) -> Self {
        Self {
            id: TaskId::generate(),
            file_id: file.file_id.clone(),
            user_id: file.owner_id.clone(),
            input_path: file.path.clone(),
            output_path: file.compressed_path(),
            level,
            status: TaskStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Statistics key derived from the input path
    pub fn file_type(&self) -> String {
        file_type_of(&self.input_path)
    }

    pub fn mark_in_progress(&mut self) {
        self.status = TaskStatus::InProgress;
    }

    /// Completed, optionally with an explanatory note
    pub fn mark_completed(&mut self, note: Option<String>) {
        self.status = TaskStatus::Completed;
        self.error_message = note;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
    }
}

/// Compression state of a stored file, mirrored by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub compressed_size: Option<u64>,
    pub is_compressed: bool,
}

/// Lowercase extension without the dot, empty when the path has none
pub fn file_type_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// `<path>.z`
pub fn compressed_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(COMPRESSED_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_of() {
        assert_eq!(file_type_of(Path::new("/data/report.TXT")), "txt");
        assert_eq!(file_type_of(Path::new("archive.tar.gz")), "gz");
        assert_eq!(file_type_of(Path::new("Makefile")), "");
    }

    #[test]
    fn test_new_task_is_pending() {
        let file = FileRef::new("file-1", "user-1", "/data/notes.txt");
        let task = CompressionTask::new(&file, CompressionLevel::FAST);

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.output_path, PathBuf::from("/data/notes.txt.z"));
        assert_eq!(task.file_type(), "txt");
        assert!(task.completed_at.is_none());
        assert!(task.error_message.is_none());
    }

    #[test]
    fn test_status_transitions_set_completion_time() {
        let file = FileRef::new("file-1", "user-1", "/data/notes.txt");
        let mut task = CompressionTask::new(&file, CompressionLevel::MAX);

        task.mark_in_progress();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(!task.status.is_terminal());

        task.mark_failed("disk full");
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.status.is_terminal());
        assert_eq!(task.error_message.as_deref(), Some("disk full"));
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_task_json_shape() {
        let file = FileRef::new("file-1", "user-1", "/data/notes.txt");
        let mut task = CompressionTask::new(&file, CompressionLevel::BALANCED);
        task.mark_in_progress();

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["level"], 6);
        assert_eq!(json["file_id"], "file-1");
        assert!(json.get("error_message").is_none());

        let back: CompressionTask = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_status_parse() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("UNKNOWN".parse::<TaskStatus>().is_err());
    }
}
