//! Compression engine and statistics for zpress
//!
//! - [`engine`]: block-streaming zlib compression of whole files
//! - [`stats`]: online aggregation of compression outcomes per file type
//! - [`policy`]: the decisions derived from those statistics

pub mod engine;
pub mod policy;
pub mod stats;

pub use engine::{size_of, CompressionEngine, EngineError, StreamSummary};
pub use policy::{is_precompressed, DecisionPolicy, PRECOMPRESSED_EXTENSIONS};
pub use stats::{CompressionStats, StatisticsEngine};
