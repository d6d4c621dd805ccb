//! StoreManager: owns one on-disk graph file and its cached index.
//!
//! Every read funnels through the load/parse/validate/rebuild path in
//! [`StoreManager::load_index`], and every write funnels through
//! [`StoreManager::save_graph`], which re-derives the index from the graph
//! and replaces the whole file atomically (temp file + rename). There is no
//! incremental index update; a save is always a full re-derivation, which is
//! what keeps the index and the data from diverging.
//!
//! One `StoreManager` per path. The cache is explicit state owned by the
//! manager instance -- nothing ambient or global -- and is invalidated when
//! the path changes at runtime or when a write fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use mnemo_core::{Entity, KnowledgeGraph, Relation};

use crate::error::StorageError;
use crate::format::{self, IndexSection};
use crate::index::GraphIndex;

/// Identity stamp of the file at load time. A changed stamp means some
/// other writer touched the file and the cached index is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

#[derive(Debug, Clone)]
struct CachedIndex {
    index: GraphIndex,
    /// Stamp captured right after the load/write that produced the index.
    /// `None` when the file could not be stat'ed; such a cache never hits.
    stamp: Option<FileStamp>,
}

/// The persistence manager for one knowledge-graph file.
#[derive(Debug)]
pub struct StoreManager {
    path: PathBuf,
    cache: Option<CachedIndex>,
}

impl StoreManager {
    /// Creates a manager for `path`. Nothing is read until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreManager {
            path: path.into(),
            cache: None,
        }
    }

    /// The current file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Retargets the manager at a different file.
    ///
    /// The cache belongs to the old file and is dropped.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
        self.cache = None;
    }

    // -----------------------------------------------------------------------
    // Load / rebuild / save
    // -----------------------------------------------------------------------

    /// Loads the summary index, serving the cache when the file is unchanged.
    ///
    /// Recovery ladder, in order:
    /// - missing file: synthesize an empty graph and persist the new layout;
    /// - no index markers: whole content is the legacy line-record format --
    ///   parse it and persist the migrated layout;
    /// - malformed marker bounds or unparseable payload: rebuild from the
    ///   data section instead of failing the call;
    /// - otherwise: parse the payload between the markers.
    ///
    /// Migration and rebuild rewrite the file, so this call is not read-only.
    pub fn load_index(&mut self) -> Result<GraphIndex, StorageError> {
        let current = self.stamp();
        if let Some(cache) = &self.cache {
            if cache.stamp.is_some() && cache.stamp == current {
                return Ok(cache.index.clone());
            }
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // Absence of the file is equivalent to an empty graph.
                return self.persist(&KnowledgeGraph::new());
            }
            Err(err) => {
                // Never serve stale state after a failed operation.
                self.cache = None;
                return Err(err.into());
            }
        };

        match format::index_section(&content) {
            IndexSection::Missing => {
                tracing::info!(path = %self.path.display(), "no index markers, migrating legacy file");
                let graph = format::parse_graph(&content);
                self.persist(&graph)
            }
            IndexSection::Malformed => {
                tracing::warn!(path = %self.path.display(), "malformed index markers, rebuilding from data");
                self.rebuild_from(&content)
            }
            IndexSection::Payload(payload) => match GraphIndex::parse(payload) {
                Ok(index) => {
                    self.cache = Some(CachedIndex {
                        index: index.clone(),
                        stamp: current,
                    });
                    Ok(index)
                }
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), error = %err, "unparseable index payload, rebuilding from data");
                    self.rebuild_from(&content)
                }
            },
        }
    }

    /// Rebuilds the index from the data section and rewrites both sections.
    ///
    /// The data section is everything after the data marker; a file with no
    /// data marker is treated entirely as legacy format. This (via
    /// [`GraphIndex::derive`]) is the single "index from data" path; the
    /// markers-present fast path of [`StoreManager::load_index`] must agree
    /// with it for the same data.
    pub fn rebuild_index(&mut self) -> Result<GraphIndex, StorageError> {
        let content = self.read_or_empty()?;
        self.rebuild_from(&content)
    }

    fn rebuild_from(&mut self, content: &str) -> Result<GraphIndex, StorageError> {
        let graph = format::parse_graph(format::data_section(content));
        self.persist(&graph)
    }

    /// Loads the full graph from the data section.
    ///
    /// The index is loaded first for cache-freshness bookkeeping only (it may
    /// trigger migration or rebuild); the returned graph content always comes
    /// from the data section, never from the index. Malformed records are
    /// skipped with a warning -- a partially-loaded graph beats a failed load.
    pub fn load_graph(&mut self) -> Result<KnowledgeGraph, StorageError> {
        self.load_index()?;
        let content = self.read_or_empty()?;
        Ok(format::parse_graph(format::data_section(&content)))
    }

    /// Persists `graph`, deriving a fresh index and overwriting the file.
    ///
    /// This is the only write path; every mutation funnels through it.
    pub fn save_graph(&mut self, graph: &KnowledgeGraph) -> Result<(), StorageError> {
        self.persist(graph).map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Point lookups
    //
    // The index computes a cheap candidate key set; the full records for
    // exactly those keys are then materialized from the data section. The
    // index is a filter, never a data source for observation content.
    // -----------------------------------------------------------------------

    /// Fetches one full entity record by exact name. Misses are `None`.
    pub fn get_entity_by_name(&mut self, name: &str) -> Result<Option<Entity>, StorageError> {
        let index = self.load_index()?;
        if !index.entity_indices.contains_key(name) {
            return Ok(None);
        }
        let graph = self.load_graph()?;
        Ok(graph.get_entity(name).cloned())
    }

    /// Fetches all entities of exactly `entity_type`.
    pub fn get_entities_by_type(&mut self, entity_type: &str) -> Result<Vec<Entity>, StorageError> {
        let index = self.load_index()?;
        let Some(names) = index.type_indices.get(entity_type).cloned() else {
            return Ok(Vec::new());
        };
        let graph = self.load_graph()?;
        Ok(names
            .iter()
            .filter_map(|name| graph.get_entity(name).cloned())
            .collect())
    }

    /// Fetches all relations of exactly `relation_type`.
    pub fn get_relations_by_type(
        &mut self,
        relation_type: &str,
    ) -> Result<Vec<Relation>, StorageError> {
        let index = self.load_index()?;
        if !index.relation_indices.contains_key(relation_type) {
            return Ok(Vec::new());
        }
        let graph = self.load_graph()?;
        Ok(graph
            .relations()
            .iter()
            .filter(|r| r.relation_type == relation_type)
            .cloned()
            .collect())
    }

    /// Fetches entities whose name contains `needle`, case-insensitively.
    pub fn search_entities_by_name(&mut self, needle: &str) -> Result<Vec<Entity>, StorageError> {
        let index = self.load_index()?;
        let needle = needle.to_lowercase();
        let candidates: Vec<String> = index
            .entity_indices
            .keys()
            .filter(|name| name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let graph = self.load_graph()?;
        Ok(candidates
            .iter()
            .filter_map(|name| graph.get_entity(name).cloned())
            .collect())
    }

    // -----------------------------------------------------------------------
    // Single-record mutation primitives
    //
    // Each is one unbroken load -> edit -> save sequence. A no-op edit skips
    // the save; the file is rewritten only when something changed.
    // -----------------------------------------------------------------------

    /// Inserts or replaces one entity.
    pub fn upsert_entity(&mut self, entity: Entity) -> Result<(), StorageError> {
        let mut graph = self.load_graph()?;
        graph.upsert_entity(entity);
        self.save_graph(&graph)
    }

    /// Inserts one relation; a duplicate triple is a no-op.
    /// Returns `true` if the relation was actually added.
    pub fn upsert_relation(&mut self, relation: Relation) -> Result<bool, StorageError> {
        let mut graph = self.load_graph()?;
        if !graph.insert_relation(relation) {
            return Ok(false);
        }
        self.save_graph(&graph)?;
        Ok(true)
    }

    /// Deletes one entity, cascading to its incident relations.
    /// Returns `true` if the entity existed.
    pub fn delete_entity(&mut self, name: &str) -> Result<bool, StorageError> {
        let mut graph = self.load_graph()?;
        if !graph.remove_entity(name) {
            return Ok(false);
        }
        self.save_graph(&graph)?;
        Ok(true)
    }

    /// Deletes one exact relation triple. Returns `true` if it was present.
    pub fn delete_relation(&mut self, relation: &Relation) -> Result<bool, StorageError> {
        let mut graph = self.load_graph()?;
        if !graph.remove_relation(relation) {
            return Ok(false);
        }
        self.save_graph(&graph)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn stamp(&self) -> Option<FileStamp> {
        fs::metadata(&self.path).ok().map(|meta| FileStamp {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn read_or_empty(&mut self) -> Result<String, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => {
                self.cache = None;
                Err(err.into())
            }
        }
    }

    /// Derives the index for `graph`, writes both sections atomically, and
    /// refreshes the cache. On failure the cache is dropped so no state
    /// claiming a successful write survives.
    fn persist(&mut self, graph: &KnowledgeGraph) -> Result<GraphIndex, StorageError> {
        let index = GraphIndex::derive(graph);
        if let Err(err) = self.write_atomic(&index, graph) {
            self.cache = None;
            return Err(err);
        }
        self.cache = Some(CachedIndex {
            index: index.clone(),
            stamp: self.stamp(),
        });
        Ok(index)
    }

    /// Writes the full file content to a temporary sibling and renames it
    /// over the target, so a crash mid-write never leaves a half-written
    /// file visible under the real name.
    fn write_atomic(&self, index: &GraphIndex, graph: &KnowledgeGraph) -> Result<(), StorageError> {
        let payload = index.to_payload()?;
        let content = format::render(&payload, graph)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "mnemo".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> StoreManager {
        StoreManager::new(dir.path().join("graph.jsonl"))
    }

    #[test]
    fn missing_file_yields_empty_index_and_creates_layout() {
        let dir = TempDir::new().unwrap();
        let mut store = manager_in(&dir);
        let index = store.load_index().unwrap();
        assert_eq!(index.metadata.entity_count, 0);
        // The initial layout was persisted.
        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains(format::INDEX_START));
        assert!(content.contains(format::DATA_START));
    }

    #[test]
    fn cache_hits_while_file_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut store = manager_in(&dir);
        let first = store.load_index().unwrap();
        // Second call must not re-derive: timestamps would match anyway, but
        // the cheap check is that the cached value round-trips identically.
        let second = store.load_index().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn set_path_drops_the_cache() {
        let dir = TempDir::new().unwrap();
        let mut store = manager_in(&dir);
        let mut graph = KnowledgeGraph::new();
        graph.insert_entity(Entity::new("Alice", "person"));
        store.save_graph(&graph).unwrap();

        store.set_path(dir.path().join("other.jsonl"));
        let index = store.load_index().unwrap();
        assert_eq!(index.metadata.entity_count, 0);
    }

    #[test]
    fn no_tmp_file_left_behind_after_save() {
        let dir = TempDir::new().unwrap();
        let mut store = manager_in(&dir);
        let mut graph = KnowledgeGraph::new();
        graph.insert_entity(Entity::new("Alice", "person"));
        store.save_graph(&graph).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["graph.jsonl"]);
    }

    #[test]
    fn external_modification_invalidates_the_cache() {
        let dir = TempDir::new().unwrap();
        let mut store = manager_in(&dir);
        store.load_index().unwrap();

        // Another writer replaces the file with a legacy-format graph.
        fs::write(
            store.path(),
            "{\"type\":\"entity\",\"name\":\"Eve\",\"entityType\":\"person\",\"observations\":[]}\n",
        )
        .unwrap();

        let index = store.load_index().unwrap();
        assert_eq!(index.metadata.entity_count, 1);
        assert!(index.entity_indices.contains_key("Eve"));
    }
}
