//! Request and response shapes for the façade operations.
//!
//! These are the serializable views the external dispatcher exchanges with
//! [`crate::GraphService`], kept separate from the domain types so the wire
//! shapes can evolve without touching mnemo-core.

use serde::{Deserialize, Serialize};

use mnemo_core::{Entity, KnowledgeGraph, Relation};

/// Observations to append to one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationAdd {
    pub entity_name: String,
    pub contents: Vec<String>,
}

/// Per-entity result of an add-observations call: exactly the strings that
/// were actually appended, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationAdded {
    pub entity_name: String,
    pub added_observations: Vec<String>,
}

/// Observations to remove from one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDelete {
    pub entity_name: String,
    pub observations: Vec<String>,
}

/// A serializable projection of a graph (or subgraph) as flat record lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphView {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl From<&KnowledgeGraph> for GraphView {
    fn from(graph: &KnowledgeGraph) -> Self {
        GraphView {
            entities: graph.entities().cloned().collect(),
            relations: graph.relations().to_vec(),
        }
    }
}

/// Health report: where the store points and whether its index is usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub path: String,
    pub index_available: bool,
}
