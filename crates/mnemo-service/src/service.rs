//! GraphService: the single coordinator between the external dispatcher and
//! the graph/storage crates.
//!
//! Every operation is one unbroken load -> mutate -> save sequence against
//! the owned [`StoreManager`]; there is no locking, so a multi-caller
//! deployment must serialize calls externally (one mutex per service).
//! Mutating operations return the diff the caller cares about: the subset of
//! entities/relations that were actually new, or the observation strings
//! that were actually appended.

use std::path::Path;

use mnemo_core::{Entity, Relation};
use mnemo_storage::{GraphIndex, StoreManager};

use crate::error::ServiceError;
use crate::schema::{GraphView, HealthStatus, ObservationAdd, ObservationAdded, ObservationDelete};
use crate::search;

/// Environment variable naming the graph file (see [`GraphService::from_env`]).
pub const FILE_PATH_ENV: &str = "MNEMO_FILE_PATH";
/// Default graph file when the environment variable is unset.
pub const DEFAULT_FILE_PATH: &str = "memory.jsonl";

/// The façade sequencing read-mutate-save for each external request.
#[derive(Debug)]
pub struct GraphService {
    store: StoreManager,
}

impl GraphService {
    /// Creates a service over the graph file at `path`.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        GraphService {
            store: StoreManager::new(path),
        }
    }

    /// Creates a service from the `MNEMO_FILE_PATH` environment variable,
    /// falling back to `memory.jsonl` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var(FILE_PATH_ENV).unwrap_or_else(|_| DEFAULT_FILE_PATH.to_string());
        GraphService::new(path)
    }

    // -----------------------------------------------------------------------
    // Create operations (silently idempotent)
    // -----------------------------------------------------------------------

    /// Creates the entities whose names do not already exist and returns
    /// exactly that subset. Pre-existing names are ignored -- not updated,
    /// not an error.
    pub fn create_entities(&mut self, entities: Vec<Entity>) -> Result<Vec<Entity>, ServiceError> {
        let mut graph = self.store.load_graph()?;
        let mut created = Vec::new();
        for entity in entities {
            if graph.insert_entity(entity.clone()) {
                created.push(entity);
            }
        }
        if !created.is_empty() {
            self.store.save_graph(&graph)?;
        }
        Ok(created)
    }

    /// Creates the relations not already present as an exact triple and
    /// returns exactly that subset. Endpoints may dangle.
    pub fn create_relations(
        &mut self,
        relations: Vec<Relation>,
    ) -> Result<Vec<Relation>, ServiceError> {
        let mut graph = self.store.load_graph()?;
        let mut created = Vec::new();
        for relation in relations {
            if graph.insert_relation(relation.clone()) {
                created.push(relation);
            }
        }
        if !created.is_empty() {
            self.store.save_graph(&graph)?;
        }
        Ok(created)
    }

    /// Appends observations per entity, skipping strings already present,
    /// and returns exactly what was appended for each entity.
    ///
    /// Strict: a nonexistent entity name fails the whole call with
    /// [`ServiceError::NotFound`] and nothing is saved.
    pub fn add_observations(
        &mut self,
        additions: Vec<ObservationAdd>,
    ) -> Result<Vec<ObservationAdded>, ServiceError> {
        let mut graph = self.store.load_graph()?;
        let mut results = Vec::new();
        for addition in &additions {
            let added = graph.add_observations(&addition.entity_name, &addition.contents)?;
            results.push(ObservationAdded {
                entity_name: addition.entity_name.clone(),
                added_observations: added,
            });
        }
        if results.iter().any(|r| !r.added_observations.is_empty()) {
            self.store.save_graph(&graph)?;
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Delete operations (lenient)
    // -----------------------------------------------------------------------

    /// Deletes entities by name, cascading removal of every relation where a
    /// deleted entity is `from` or `to`. Unknown names are no-ops.
    pub fn delete_entities(&mut self, names: Vec<String>) -> Result<(), ServiceError> {
        let mut graph = self.store.load_graph()?;
        let mut changed = false;
        for name in &names {
            changed |= graph.remove_entity(name);
        }
        if changed {
            self.store.save_graph(&graph)?;
        }
        Ok(())
    }

    /// Removes listed observation strings from the named entities where
    /// present. Unknown entity names are silently skipped (lenient, unlike
    /// add-observations).
    pub fn delete_observations(
        &mut self,
        deletions: Vec<ObservationDelete>,
    ) -> Result<(), ServiceError> {
        let mut graph = self.store.load_graph()?;
        let mut touched = false;
        for deletion in &deletions {
            touched |= graph.remove_observations(&deletion.entity_name, &deletion.observations);
        }
        if touched {
            self.store.save_graph(&graph)?;
        }
        Ok(())
    }

    /// Removes exact-triple matches; non-matching entries are no-ops.
    pub fn delete_relations(&mut self, relations: Vec<Relation>) -> Result<(), ServiceError> {
        let mut graph = self.store.load_graph()?;
        let mut changed = false;
        for relation in &relations {
            changed |= graph.remove_relation(relation);
        }
        if changed {
            self.store.save_graph(&graph)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read operations
    // -----------------------------------------------------------------------

    /// The full graph as flat record lists.
    pub fn read_graph(&mut self) -> Result<GraphView, ServiceError> {
        Ok(GraphView::from(&self.store.load_graph()?))
    }

    /// The current summary index (cached, migrated, or rebuilt as needed).
    pub fn read_index(&mut self) -> Result<GraphIndex, ServiceError> {
        Ok(self.store.load_index()?)
    }

    /// Single full-record fetch. Absent names are `None`, not an error.
    pub fn expand(&mut self, name: &str) -> Result<Option<Entity>, ServiceError> {
        Ok(self.store.get_entity_by_name(name)?)
    }

    /// Entities of exactly `entity_type`, via the type index.
    pub fn get_entities_by_type(
        &mut self,
        entity_type: &str,
    ) -> Result<Vec<Entity>, ServiceError> {
        Ok(self.store.get_entities_by_type(entity_type)?)
    }

    /// Relations of exactly `relation_type`, via the relation-type index.
    pub fn get_relations_by_type(
        &mut self,
        relation_type: &str,
    ) -> Result<Vec<Relation>, ServiceError> {
        Ok(self.store.get_relations_by_type(relation_type)?)
    }

    /// Batch expand: the named entities that exist (misses silently dropped)
    /// plus the relations induced between them.
    pub fn open(&mut self, names: Vec<String>) -> Result<GraphView, ServiceError> {
        let graph = self.store.load_graph()?;
        let mut seen = std::collections::HashSet::new();
        let mut entities = Vec::new();
        for name in &names {
            if seen.insert(name.as_str()) {
                if let Some(entity) = graph.get_entity(name) {
                    entities.push(entity.clone());
                }
            }
        }
        let names: std::collections::HashSet<&str> =
            entities.iter().map(|e| e.name.as_str()).collect();
        Ok(GraphView {
            relations: graph.induced_relations(&names),
            entities,
        })
    }

    /// Searches the graph; see [`crate::search`] for query semantics.
    pub fn search(&mut self, query: &str) -> Result<GraphView, ServiceError> {
        let index = self.store.load_index()?;
        let graph = self.store.load_graph()?;
        Ok(search::execute(&search::parse(query), &index, &graph))
    }

    // -----------------------------------------------------------------------
    // Store management
    // -----------------------------------------------------------------------

    /// The current graph file path.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Retargets the service at a different graph file, invalidating the
    /// manager's cached index.
    pub fn set_path(&mut self, path: impl Into<std::path::PathBuf>) {
        let path = path.into();
        tracing::info!(path = %path.display(), "retargeting graph file");
        self.store.set_path(path);
    }

    /// Current path plus whether an index can be produced for it.
    pub fn health(&mut self) -> HealthStatus {
        let index_available = self.store.load_index().is_ok();
        HealthStatus {
            path: self.store.path().display().to_string(),
            index_available,
        }
    }
}
