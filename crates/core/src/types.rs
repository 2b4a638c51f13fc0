//! Domain types shared by every zpress crate

mod level;
mod task;

pub use level::CompressionLevel;
pub use task::{
    compressed_path_for, file_type_of, CompressionTask, FileRecord, FileRef, TaskId, TaskStatus,
};
