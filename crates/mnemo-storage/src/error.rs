//! Storage error types for mnemo-storage.
//!
//! The read path is deliberately forgiving -- corrupt index payloads trigger
//! a rebuild and corrupt data lines are skipped with a warning -- and lookup
//! misses return empty/absent values rather than failing. What remains are
//! the failures a caller must see: real I/O problems and serialization on
//! the write path.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file was unreadable or unwritable for a reason other than
    /// "does not exist". Not retried; the cached index is invalidated.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed while writing the index payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
