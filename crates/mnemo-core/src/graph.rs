//! KnowledgeGraph: the authoritative in-memory graph container.
//!
//! [`KnowledgeGraph`] owns the entity and relation collections for one loaded
//! graph and is the single entry point for mutating them. All operations are
//! pure in-memory transforms -- no I/O lives in this crate. The persistence
//! layer reconstructs a graph from stored records via [`KnowledgeGraph::from_parts`]
//! and serializes it back out record by record.
//!
//! Entities live in an `IndexMap` keyed by name so that iteration order is
//! insertion order. That determinism matters: the storage layer derives a
//! summary index from the graph, and two derivations over the same records
//! must produce identical output.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::entity::Entity;
use crate::error::CoreError;
use crate::relation::Relation;

/// The pair (set of entities keyed by name, set of relations keyed by triple).
///
/// Equality compares as sets: entities by name, relations by triple,
/// independent of insertion order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    /// Entities keyed by name, insertion-ordered.
    entities: IndexMap<String, Entity>,
    /// Relations in insertion order; triple uniqueness is enforced by
    /// [`KnowledgeGraph::insert_relation`].
    relations: Vec<Relation>,
}

impl KnowledgeGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        KnowledgeGraph::default()
    }

    /// Reconstructs a graph from flat record lists, as loaded from storage.
    ///
    /// Later entity records replace earlier ones with the same name, and
    /// duplicate relation triples collapse, so a file with stray duplicate
    /// records still loads into a well-formed graph.
    pub fn from_parts(entities: Vec<Entity>, relations: Vec<Relation>) -> Self {
        let mut graph = KnowledgeGraph::new();
        for entity in entities {
            graph.upsert_entity(entity);
        }
        for relation in relations {
            graph.insert_relation(relation);
        }
        graph
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Returns `true` if the graph has no entities and no relations.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Iterates entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Looks up an entity by exact name.
    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Returns `true` if an entity with `name` exists.
    pub fn contains_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Returns `true` if an identical relation triple exists.
    pub fn contains_relation(&self, relation: &Relation) -> bool {
        self.relations.contains(relation)
    }

    /// The subset of relations whose endpoints are both in `names`.
    pub fn induced_relations(&self, names: &HashSet<&str>) -> Vec<Relation> {
        self.relations
            .iter()
            .filter(|r| names.contains(r.from.as_str()) && names.contains(r.to.as_str()))
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Entity mutations
    // -----------------------------------------------------------------------

    /// Inserts `entity` if no entity with that name exists.
    ///
    /// Returns `true` if inserted. An existing entity is left untouched
    /// (create semantics: pre-existing names are ignored, not updated).
    pub fn insert_entity(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity.name) {
            return false;
        }
        self.entities.insert(entity.name.clone(), entity);
        true
    }

    /// Inserts or replaces the entity with this name.
    pub fn upsert_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.name.clone(), entity);
    }

    /// Removes the entity named `name`, cascading removal of every relation
    /// where it is `from` or `to`. Returns `true` if the entity existed.
    ///
    /// A name that was never present is a no-op -- including for dangling
    /// relations that mention it, since the cascade only fires for an entity
    /// that is actually removed.
    pub fn remove_entity(&mut self, name: &str) -> bool {
        if self.entities.shift_remove(name).is_none() {
            return false;
        }
        self.relations.retain(|r| !r.touches(name));
        true
    }

    /// Appends each of `contents` to the named entity unless already present,
    /// in input order. Returns exactly the strings that were appended.
    ///
    /// Errors with [`CoreError::EntityNotFound`] if the entity does not exist;
    /// this operation has a strict existence precondition.
    pub fn add_observations(
        &mut self,
        name: &str,
        contents: &[String],
    ) -> Result<Vec<String>, CoreError> {
        let entity = self
            .entities
            .get_mut(name)
            .ok_or_else(|| CoreError::EntityNotFound {
                name: name.to_string(),
            })?;
        let mut added = Vec::new();
        for content in contents {
            if entity.add_observation(content) {
                added.push(content.clone());
            }
        }
        Ok(added)
    }

    /// Removes each of `contents` from the named entity if present.
    ///
    /// Returns `true` if the entity exists (regardless of how many strings
    /// were actually removed); `false` for an unknown name. Leniency toward
    /// unknown names is the caller's policy decision.
    pub fn remove_observations(&mut self, name: &str, contents: &[String]) -> bool {
        match self.entities.get_mut(name) {
            Some(entity) => {
                for content in contents {
                    entity.remove_observation(content);
                }
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Relation mutations
    // -----------------------------------------------------------------------

    /// Inserts `relation` unless an identical triple exists.
    ///
    /// Returns `true` if inserted. Endpoints are not checked for existence;
    /// dangling relations are legal.
    pub fn insert_relation(&mut self, relation: Relation) -> bool {
        if self.relations.contains(&relation) {
            return false;
        }
        self.relations.push(relation);
        true
    }

    /// Removes the exact triple `relation`. Returns `true` if it was present.
    pub fn remove_relation(&mut self, relation: &Relation) -> bool {
        let before = self.relations.len();
        self.relations.retain(|r| r != relation);
        self.relations.len() != before
    }
}

impl PartialEq for KnowledgeGraph {
    fn eq(&self, other: &Self) -> bool {
        // Set comparison: entity-by-name, relation-by-triple.
        if self.entities != other.entities {
            return false;
        }
        let ours: HashSet<&Relation> = self.relations.iter().collect();
        let theirs: HashSet<&Relation> = other.relations.iter().collect();
        ours == theirs
    }
}

impl Eq for KnowledgeGraph {}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(entities: &[(&str, &str)], relations: &[(&str, &str, &str)]) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for (name, ty) in entities {
            graph.insert_entity(Entity::new(*name, *ty));
        }
        for (from, to, ty) in relations {
            graph.insert_relation(Relation::new(*from, *to, *ty));
        }
        graph
    }

    #[test]
    fn insert_entity_ignores_existing_name() {
        let mut graph = KnowledgeGraph::new();
        assert!(graph.insert_entity(Entity::new("Alice", "person")));
        assert!(!graph.insert_entity(Entity::new("Alice", "robot")));
        // The original is untouched, not updated.
        assert_eq!(graph.get_entity("Alice").unwrap().entity_type, "person");
    }

    #[test]
    fn insert_relation_deduplicates_triples() {
        let mut graph = graph_with(&[("Alice", "person"), ("Bob", "person")], &[]);
        assert!(graph.insert_relation(Relation::new("Alice", "Bob", "knows")));
        assert!(!graph.insert_relation(Relation::new("Alice", "Bob", "knows")));
        assert_eq!(graph.relation_count(), 1);
    }

    #[test]
    fn remove_entity_cascades_incident_relations() {
        let mut graph = graph_with(
            &[("Alice", "person"), ("Bob", "person"), ("Carol", "person")],
            &[
                ("Alice", "Bob", "knows"),
                ("Bob", "Alice", "knows"),
                ("Bob", "Carol", "knows"),
            ],
        );
        assert!(graph.remove_entity("Alice"));
        assert_eq!(graph.relation_count(), 1);
        assert_eq!(graph.relations()[0], Relation::new("Bob", "Carol", "knows"));
    }

    #[test]
    fn remove_unknown_entity_leaves_dangling_relations_alone() {
        let mut graph = KnowledgeGraph::new();
        graph.insert_relation(Relation::new("Ghost", "Phantom", "haunts"));
        assert!(!graph.remove_entity("Ghost"));
        assert_eq!(graph.relation_count(), 1);
    }

    #[test]
    fn add_observations_reports_only_appended() {
        let mut graph = KnowledgeGraph::new();
        graph.insert_entity(Entity::with_observations("Alice", "person", ["a"]));
        let added = graph
            .add_observations(
                "Alice",
                &["a".to_string(), "a".to_string(), "b".to_string()],
            )
            .unwrap();
        assert_eq!(added, vec!["b"]);
        assert_eq!(
            graph.get_entity("Alice").unwrap().observations,
            vec!["a", "b"]
        );
    }

    #[test]
    fn add_observations_to_missing_entity_errors() {
        let mut graph = KnowledgeGraph::new();
        let err = graph
            .add_observations("Nobody", &["x".to_string()])
            .unwrap_err();
        assert!(matches!(err, CoreError::EntityNotFound { .. }));
    }

    #[test]
    fn remove_observations_is_silent_about_missing_strings() {
        let mut graph = KnowledgeGraph::new();
        graph.insert_entity(Entity::with_observations("Alice", "person", ["a", "b"]));
        assert!(graph.remove_observations("Alice", &["a".to_string(), "zz".to_string()]));
        assert_eq!(graph.get_entity("Alice").unwrap().observations, vec!["b"]);
        assert!(!graph.remove_observations("Nobody", &["a".to_string()]));
    }

    #[test]
    fn induced_relations_requires_both_endpoints() {
        let graph = graph_with(
            &[("Alice", "person"), ("Bob", "person"), ("Carol", "person")],
            &[("Alice", "Bob", "knows"), ("Bob", "Carol", "knows")],
        );
        let names: HashSet<&str> = ["Alice", "Bob"].into_iter().collect();
        let induced = graph.induced_relations(&names);
        assert_eq!(induced, vec![Relation::new("Alice", "Bob", "knows")]);
    }

    #[test]
    fn from_parts_collapses_duplicates() {
        let graph = KnowledgeGraph::from_parts(
            vec![
                Entity::new("Alice", "person"),
                Entity::new("Alice", "robot"),
            ],
            vec![
                Relation::new("Alice", "Bob", "knows"),
                Relation::new("Alice", "Bob", "knows"),
            ],
        );
        assert_eq!(graph.entity_count(), 1);
        // Last record wins for duplicated entity names.
        assert_eq!(graph.get_entity("Alice").unwrap().entity_type, "robot");
        assert_eq!(graph.relation_count(), 1);
    }

    #[test]
    fn equality_ignores_relation_order() {
        let a = graph_with(
            &[("Alice", "person"), ("Bob", "person")],
            &[("Alice", "Bob", "knows"), ("Bob", "Alice", "knows")],
        );
        let b = graph_with(
            &[("Bob", "person"), ("Alice", "person")],
            &[("Bob", "Alice", "knows"), ("Alice", "Bob", "knows")],
        );
        assert_eq!(a, b);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        // A small name alphabet so entities, relations, and the victim
        // actually collide.
        fn arb_name() -> impl Strategy<Value = String> {
            "[A-C][a-z]{0,2}"
        }

        proptest! {
            #[test]
            fn cascade_removes_exactly_the_incident_relations(
                entities in proptest::collection::vec((arb_name(), arb_name()), 1..6),
                relations in proptest::collection::vec((arb_name(), arb_name(), arb_name()), 0..10),
                victim in arb_name(),
            ) {
                let mut graph = KnowledgeGraph::from_parts(
                    entities.into_iter().map(|(n, t)| Entity::new(n, t)).collect(),
                    relations
                        .into_iter()
                        .map(|(f, t, ty)| Relation::new(f, t, ty))
                        .collect(),
                );
                let before = graph.relations().to_vec();
                let existed = graph.contains_entity(&victim);
                let removed = graph.remove_entity(&victim);
                prop_assert_eq!(removed, existed);
                if removed {
                    for relation in &before {
                        prop_assert_eq!(
                            graph.contains_relation(relation),
                            !relation.touches(&victim)
                        );
                    }
                } else {
                    // Unknown names are no-ops, dangling mentions included.
                    prop_assert_eq!(graph.relations(), before.as_slice());
                }
            }
        }
    }
}
