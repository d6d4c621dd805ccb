//! Entity: a named, typed node carrying ordered free-text observations.
//!
//! The `name` field is the primary key (case-sensitive). Observations are an
//! ordered sequence: insertion order is meaningful (last-appended is most
//! recent) and duplicates within one entity are forbidden, enforced by the
//! append helpers here rather than by the collection type.

use serde::{Deserialize, Serialize};

/// A named, typed node in the knowledge graph.
///
/// Serialized field names are camelCase to match the on-disk record format
/// (`{"name": ..., "entityType": ..., "observations": [...]}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Primary key, case-sensitive.
    pub name: String,
    /// Free-text type label.
    pub entity_type: String,
    /// Ordered observation strings, no duplicates within one entity.
    #[serde(default)]
    pub observations: Vec<String>,
}

impl Entity {
    /// Creates an entity with no observations.
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Entity {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
        }
    }

    /// Creates an entity with the given observations, dropping duplicates
    /// while preserving first-occurrence order.
    pub fn with_observations<I, S>(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        observations: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entity = Entity::new(name, entity_type);
        for obs in observations {
            entity.add_observation(&obs.into());
        }
        entity
    }

    /// Returns `true` if `content` is already recorded on this entity.
    pub fn has_observation(&self, content: &str) -> bool {
        self.observations.iter().any(|o| o == content)
    }

    /// Appends `content` unless already present. Returns `true` if appended.
    pub fn add_observation(&mut self, content: &str) -> bool {
        if self.has_observation(content) {
            return false;
        }
        self.observations.push(content.to_string());
        true
    }

    /// Removes `content` if present. Returns `true` if removed.
    pub fn remove_observation(&mut self, content: &str) -> bool {
        let before = self.observations.len();
        self.observations.retain(|o| o != content);
        self.observations.len() != before
    }
}
