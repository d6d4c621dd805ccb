//! GraphIndex: the derived summary projection of a knowledge graph.
//!
//! The index is a cacheable *projection*, never authoritative: it carries no
//! information the data section cannot reproduce, which is what makes
//! rebuild-on-corruption correct. [`GraphIndex::derive`] is the single
//! constructor -- every code path that needs an index builds it here, so the
//! fast load path and the rebuild path cannot drift apart.
//!
//! On disk the index maps serialize as arrays of `[key, value]` pairs (the
//! [`pairs`] serde adapter); in memory they are `IndexMap`s so candidate-key
//! lookups stay cheap and iteration order stays deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use mnemo_core::KnowledgeGraph;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Index metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    /// Format version of the index payload.
    pub version: u32,
    /// Cardinality of the entity set at derivation time.
    pub entity_count: usize,
    /// Cardinality of the relation set at derivation time.
    pub relation_count: usize,
    /// RFC 3339 timestamp of the derivation.
    pub last_updated: String,
    /// Reserved; always written `false` and never acted on.
    pub compressed: bool,
}

/// Outgoing adjacency entry: this entity is `from` in a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingEdge {
    pub relation_type: String,
    pub to: String,
}

/// Incoming adjacency entry: this entity is `to` in a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingEdge {
    pub relation_type: String,
    pub from: String,
}

/// Per-entity summary: enough to answer "what touches this entity" without
/// scanning the relation set, and to filter by type and observation count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub entity_type: String,
    pub observation_count: usize,
    pub outgoing: Vec<OutgoingEdge>,
    pub incoming: Vec<IncomingEdge>,
}

/// A `{from, to}` endpoint pair under a relation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPair {
    pub from: String,
    pub to: String,
}

/// The derived summary index of a knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphIndex {
    /// Counts, version, derivation timestamp.
    pub metadata: IndexMetadata,
    /// Entity name -> summary.
    #[serde(with = "pairs")]
    pub entity_indices: IndexMap<String, EntitySummary>,
    /// Entity type -> entity names of that type.
    #[serde(with = "pairs")]
    pub type_indices: IndexMap<String, Vec<String>>,
    /// Relation type -> endpoint pairs of that type.
    #[serde(with = "pairs")]
    pub relation_indices: IndexMap<String, Vec<EndpointPair>>,
}

impl GraphIndex {
    /// Derives the index from a graph. The single source of truth for
    /// "index from data": deterministic given the graph's record order.
    pub fn derive(graph: &KnowledgeGraph) -> Self {
        let mut entity_indices: IndexMap<String, EntitySummary> = IndexMap::new();
        let mut type_indices: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut relation_indices: IndexMap<String, Vec<EndpointPair>> = IndexMap::new();

        for entity in graph.entities() {
            entity_indices.insert(
                entity.name.clone(),
                EntitySummary {
                    entity_type: entity.entity_type.clone(),
                    observation_count: entity.observations.len(),
                    outgoing: Vec::new(),
                    incoming: Vec::new(),
                },
            );
            type_indices
                .entry(entity.entity_type.clone())
                .or_default()
                .push(entity.name.clone());
        }

        for relation in graph.relations() {
            // Adjacency entries exist only for entities that are actually in
            // the graph; a dangling endpoint gets no index entry.
            if let Some(summary) = entity_indices.get_mut(&relation.from) {
                summary.outgoing.push(OutgoingEdge {
                    relation_type: relation.relation_type.clone(),
                    to: relation.to.clone(),
                });
            }
            if let Some(summary) = entity_indices.get_mut(&relation.to) {
                summary.incoming.push(IncomingEdge {
                    relation_type: relation.relation_type.clone(),
                    from: relation.from.clone(),
                });
            }
            relation_indices
                .entry(relation.relation_type.clone())
                .or_default()
                .push(EndpointPair {
                    from: relation.from.clone(),
                    to: relation.to.clone(),
                });
        }

        GraphIndex {
            metadata: IndexMetadata {
                version: FORMAT_VERSION,
                entity_count: graph.entity_count(),
                relation_count: graph.relation_count(),
                last_updated: now_rfc3339(),
                compressed: false,
            },
            entity_indices,
            type_indices,
            relation_indices,
        }
    }

    /// Parses an index payload extracted from between the markers.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Serializes the index payload for the index section.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Structural equality ignoring the derivation timestamp.
    ///
    /// Two derivations of the same data differ only in
    /// `metadata.last_updated`; this is the comparison the coherence
    /// invariant is stated in terms of.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.metadata.version == other.metadata.version
            && self.metadata.entity_count == other.metadata.entity_count
            && self.metadata.relation_count == other.metadata.relation_count
            && self.metadata.compressed == other.metadata.compressed
            && self.entity_indices == other.entity_indices
            && self.type_indices == other.type_indices
            && self.relation_indices == other.relation_indices
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

/// Serde adapter: IndexMap as a JSON array of `[key, value]` pairs.
mod pairs {
    use indexmap::IndexMap;
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    pub fn serialize<S, V>(map: &IndexMap<String, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let entries: Vec<(String, V)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::{Entity, Relation};

    fn sample_graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.insert_entity(Entity::with_observations("Alice", "person", ["a", "b"]));
        graph.insert_entity(Entity::new("Bob", "person"));
        graph.insert_entity(Entity::new("Acme", "company"));
        graph.insert_relation(Relation::new("Alice", "Bob", "knows"));
        graph.insert_relation(Relation::new("Alice", "Acme", "works_at"));
        graph.insert_relation(Relation::new("Ghost", "Alice", "haunts"));
        graph
    }

    #[test]
    fn derive_matches_graph_cardinalities() {
        let index = GraphIndex::derive(&sample_graph());
        assert_eq!(index.metadata.version, FORMAT_VERSION);
        assert_eq!(index.metadata.entity_count, 3);
        assert_eq!(index.metadata.relation_count, 3);
        assert!(!index.metadata.compressed);
        assert_eq!(index.entity_indices.len(), 3);
    }

    #[test]
    fn derive_builds_adjacency_lists() {
        let index = GraphIndex::derive(&sample_graph());
        let alice = &index.entity_indices["Alice"];
        assert_eq!(alice.entity_type, "person");
        assert_eq!(alice.observation_count, 2);
        assert_eq!(alice.outgoing.len(), 2);
        assert_eq!(alice.outgoing[0].relation_type, "knows");
        assert_eq!(alice.outgoing[0].to, "Bob");
        // The dangling "haunts" relation still lands in Alice's incoming list.
        assert_eq!(alice.incoming.len(), 1);
        assert_eq!(alice.incoming[0].from, "Ghost");
    }

    #[test]
    fn derive_excludes_dangling_endpoints_from_entity_indices() {
        let index = GraphIndex::derive(&sample_graph());
        assert!(!index.entity_indices.contains_key("Ghost"));
        // But the relation itself is indexed by type.
        assert_eq!(index.relation_indices["haunts"].len(), 1);
    }

    #[test]
    fn derive_groups_types() {
        let index = GraphIndex::derive(&sample_graph());
        assert_eq!(index.type_indices["person"], vec!["Alice", "Bob"]);
        assert_eq!(index.type_indices["company"], vec!["Acme"]);
    }

    #[test]
    fn payload_round_trips_through_pair_arrays() {
        let index = GraphIndex::derive(&sample_graph());
        let payload = index.to_payload().unwrap();

        // Maps are written as arrays of [key, value] pairs, not objects.
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert!(value["entityIndices"].is_array());
        assert_eq!(value["entityIndices"][0][0], "Alice");
        assert!(value["typeIndices"].is_array());
        assert!(value["relationIndices"].is_array());

        let back = GraphIndex::parse(&payload).unwrap();
        assert_eq!(back, index);
    }

    #[test]
    fn content_eq_ignores_timestamp() {
        let graph = sample_graph();
        let mut a = GraphIndex::derive(&graph);
        let b = GraphIndex::derive(&graph);
        a.metadata.last_updated = String::from("2001-01-01T00:00:00Z");
        assert!(a.content_eq(&b));
        assert!(b.content_eq(&a));
    }

    #[test]
    fn derive_of_empty_graph_is_empty() {
        let index = GraphIndex::derive(&KnowledgeGraph::new());
        assert_eq!(index.metadata.entity_count, 0);
        assert_eq!(index.metadata.relation_count, 0);
        assert!(index.entity_indices.is_empty());
        assert!(index.type_indices.is_empty());
        assert!(index.relation_indices.is_empty());
    }
}
