//! Process- and cross-process-safe key/value cache backed by a single JSON
//! file per instance, with per-entry TTL.
//!
//! Several processes on the same node may share a cache file; writers take
//! an exclusive advisory lock, readers a shared one, for the whole
//! read-modify-write sequence of a single operation. There is no cache-wide
//! lock beyond that — two concurrent `set` calls on different keys still
//! serialize on the file lock, which is the cost of cross-process safety.

mod error;
mod file_cache;

pub use error::CacheError;
pub use file_cache::{CacheStats, FileCache};
