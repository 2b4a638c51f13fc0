//! Task scheduling and execution for zpress
//!
//! - [`pool`]: fixed worker pool with generic work prioritised over compression jobs
//! - [`processor`]: drives a single compression task to a terminal status
//! - [`service`]: the facade callers schedule and query through
//! - [`json_store`]: a file-backed persistence collaborator

pub mod json_store;
pub mod pool;
pub mod processor;
pub mod service;

pub use json_store::JsonTaskStore;
pub use pool::{CompressionRunner, Priority, TaskHandle, WorkerPool};
pub use processor::{CompressionOutcome, CompressionProcessor};
pub use service::CompressionService;
