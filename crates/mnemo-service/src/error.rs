//! Service error types with the not-found / storage split.
//!
//! [`ServiceError`] is the unified error type for all façade operations.
//! Lookup misses are *not* errors (they return empty/absent results); the
//! `NotFound` variant exists for operations with a strict existence
//! precondition, currently only add-observations.

use thiserror::Error;

use mnemo_core::CoreError;
use mnemo_storage::StorageError;

/// Errors surfaced by façade operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A strict existence precondition missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// The persistence layer failed in a way the caller must see.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EntityNotFound { name } => {
                ServiceError::NotFound(format!("entity '{name}' does not exist"))
            }
        }
    }
}
