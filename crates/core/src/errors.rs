use std::path::PathBuf;

/// Result type alias for zpress operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for zpress operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Failures reported by the persistence collaborator
    #[error("persistence operation '{operation}' failed: {message}")]
    Persistence { operation: String, message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Compression level outside 0..=9
    #[error("invalid compression level {level}: must be between 0 and 9")]
    InvalidLevel { level: i64 },

    /// The worker pool no longer accepts work
    #[error("worker pool is shutting down")]
    PoolShutdown,

    /// A submitted work item panicked while running
    #[error("task panicked: {message}")]
    TaskPanicked { message: String },

    /// A submitted work item was dropped before producing a result
    #[error("task was dropped before completing")]
    TaskCancelled,

    /// No compression task with this id is stored
    #[error("compression task '{id}' not found")]
    TaskNotFound { id: String },

    /// The task has no compressed artifact to read back
    #[error("no compressed artifact for task '{task_id}': {reason}")]
    ArtifactUnavailable { task_id: String, reason: String },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a persistence error
    #[must_use]
    pub fn persistence(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Persistence {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a panic error from a `catch_unwind` payload
    #[must_use]
    pub fn task_panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Error::TaskPanicked { message }
    }
}

// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Attach the path and operation to an I/O failure
    fn fs_context(self, path: impl Into<PathBuf>, operation: &str) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, path: impl Into<PathBuf>, operation: &str) -> Result<T> {
        self.map_err(|e| Error::file_system(path, operation, e))
    }
}
