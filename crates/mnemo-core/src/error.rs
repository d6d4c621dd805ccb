//! Core error types for mnemo-core.
//!
//! Uses `thiserror` for structured, matchable error variants. The data model
//! is deliberately permissive (dangling relations are legal, duplicate
//! creates are no-ops), so the only hard failure mode is an operation with
//! an explicit existence precondition.

use thiserror::Error;

/// Core errors produced by the mnemo-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An operation required an entity that is not in the graph.
    #[error("entity not found: '{name}'")]
    EntityNotFound { name: String },
}
