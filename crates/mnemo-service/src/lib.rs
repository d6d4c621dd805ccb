//! Service façade over the mnemo persistence layer.
//!
//! [`GraphService`] sequences one read-then-mutate-then-save pass per
//! external call and computes "what changed" results (newly created
//! entities, actually-appended observations). An external request
//! dispatcher translates transport calls into these operations; nothing in
//! this crate is responsible for transport framing.
//!
//! # Modules
//!
//! - [`error`]: ServiceError with the not-found / storage split
//! - [`schema`]: request and response shapes consumed by the dispatcher
//! - [`search`]: query parsing and the two filtering directions
//! - [`service`]: GraphService, the single coordinator

pub mod error;
pub mod schema;
pub mod search;
pub mod service;

// Re-export key types for ergonomic use.
pub use error::ServiceError;
pub use schema::{GraphView, HealthStatus, ObservationAdd, ObservationAdded, ObservationDelete};
pub use service::GraphService;
