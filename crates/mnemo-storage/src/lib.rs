//! Persistence layer for mnemo knowledge graphs.
//!
//! One flat UTF-8 file holds both a derived summary index and the
//! authoritative data records, in fixed order. [`StoreManager`] owns the
//! file and a cached copy of the index, and funnels every read and write
//! through a single load/parse/validate/rebuild path.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`format`]: on-disk layout -- markers, sections, line records, legacy
//!   detection
//! - [`index`]: GraphIndex, the derived projection of the graph
//! - [`manager`]: StoreManager -- load/save/rebuild, cache, lookups,
//!   single-record mutation primitives

pub mod error;
pub mod format;
pub mod index;
pub mod manager;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use index::{EndpointPair, EntitySummary, GraphIndex, IndexMetadata};
pub use manager::StoreManager;
