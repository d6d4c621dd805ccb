//! Search query parsing and execution.
//!
//! Two mutually exclusive filtering directions per query:
//!
//! - **Entity-first** (the generic path): whitespace-split terms, OR
//!   semantics -- an entity matches if ANY term is a case-insensitive
//!   substring of its name, its type, or any observation. The result is the
//!   matched entities plus the relations induced between them.
//! - **Relation-first**: recognized keyword tokens (`relations <X>`,
//!   `from <X>`, `to <X>`, `type <R>`) switch the whole query to filtering
//!   the relation set by the conjunction of the recognized conditions, then
//!   deriving the entity set as the union of matching endpoints. Entity
//!   substring matching is skipped entirely.
//!
//! A two-token query `type <T>` is the structured entity-type lookup: exact
//! type match via the type index, not a substring scan.

use std::collections::HashSet;

use mnemo_core::{Entity, KnowledgeGraph, Relation};
use mnemo_storage::GraphIndex;

use crate::schema::GraphView;

/// A parsed search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Leading `type <T>`: entities of exactly type `T`.
    EntityType(String),
    /// Relation-oriented keyword tokens were recognized.
    Relations(RelationFilter),
    /// Generic substring terms, already lowercased. Empty means "match all".
    Terms(Vec<String>),
}

/// Conjunction of endpoint/type conditions for relation-first filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationFilter {
    pub relation_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RelationFilter {
    fn matches(&self, relation: &Relation) -> bool {
        self.relation_type
            .as_ref()
            .is_none_or(|ty| relation.relation_type == *ty)
            && self.from.as_ref().is_none_or(|from| relation.from == *from)
            && self.to.as_ref().is_none_or(|to| relation.to == *to)
    }
}

/// Parses a raw query string.
pub fn parse(query: &str) -> Query {
    let tokens: Vec<&str> = query.split_whitespace().collect();

    // `type <T>` alone is the structured entity-type lookup.
    if tokens.len() == 2 && tokens[0] == "type" {
        return Query::EntityType(tokens[1].to_string());
    }

    let mut filter = RelationFilter::default();
    let mut recognized = false;
    let mut i = 0;
    while i + 1 < tokens.len() {
        match tokens[i] {
            "relations" | "type" => {
                filter.relation_type = Some(tokens[i + 1].to_string());
                recognized = true;
                i += 2;
            }
            "from" => {
                filter.from = Some(tokens[i + 1].to_string());
                recognized = true;
                i += 2;
            }
            "to" => {
                filter.to = Some(tokens[i + 1].to_string());
                recognized = true;
                i += 2;
            }
            _ => i += 1,
        }
    }
    if recognized {
        return Query::Relations(filter);
    }

    Query::Terms(tokens.iter().map(|t| t.to_lowercase()).collect())
}

/// Executes a parsed query against a loaded graph and its index.
pub fn execute(query: &Query, index: &GraphIndex, graph: &KnowledgeGraph) -> GraphView {
    match query {
        Query::EntityType(entity_type) => {
            let names = index
                .type_indices
                .get(entity_type)
                .cloned()
                .unwrap_or_default();
            let entities: Vec<Entity> = names
                .iter()
                .filter_map(|name| graph.get_entity(name).cloned())
                .collect();
            with_induced(entities, graph)
        }
        Query::Relations(filter) => {
            let relations: Vec<Relation> = graph
                .relations()
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect();
            // Entity set = union of matching endpoints; dangling endpoints
            // have no record to return.
            let mut seen = HashSet::new();
            let mut entities = Vec::new();
            for relation in &relations {
                for name in [&relation.from, &relation.to] {
                    if seen.insert(name.as_str()) {
                        if let Some(entity) = graph.get_entity(name) {
                            entities.push(entity.clone());
                        }
                    }
                }
            }
            GraphView { entities, relations }
        }
        Query::Terms(terms) if terms.is_empty() => GraphView::from(graph),
        Query::Terms(terms) => {
            let entities: Vec<Entity> = graph
                .entities()
                .filter(|e| terms.iter().any(|t| matches_term(e, t)))
                .cloned()
                .collect();
            with_induced(entities, graph)
        }
    }
}

/// Case-insensitive substring match against name OR type OR any observation.
fn matches_term(entity: &Entity, term: &str) -> bool {
    entity.name.to_lowercase().contains(term)
        || entity.entity_type.to_lowercase().contains(term)
        || entity
            .observations
            .iter()
            .any(|o| o.to_lowercase().contains(term))
}

fn with_induced(entities: Vec<Entity>, graph: &KnowledgeGraph) -> GraphView {
    let names: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    GraphView {
        relations: graph.induced_relations(&names),
        entities,
    }
}
