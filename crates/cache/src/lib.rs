//! Artifact cache for zpress
//!
//! [`CacheManager`] maps artifact keys to files on disk and keeps their
//! aggregate size under a configured maximum. Entries are evicted least
//! recently accessed first, either because the cache grew too large or
//! because they were not read for longer than the retention period. A
//! background sweep on the tokio runtime enforces the retention period even
//! when nothing is being inserted.

pub mod cleanup;
pub mod entry;
pub mod keys;
pub mod manager;

pub use entry::{CacheEntry, CacheStatistics, EvictedEntry, EvictionReason, EvictionReport};
pub use manager::CacheManager;
