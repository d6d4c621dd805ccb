//! Relation: a directed, typed edge identified by its full triple.
//!
//! A relation has no surrogate identity -- the `(from, to, relation_type)`
//! triple *is* the identity, so the relation set is a set (not a multiset)
//! keyed by full equality. `from`/`to` are entity names and are allowed to
//! dangle: referential integrity is enforced only at entity-deletion time
//! (cascade), never at insert time.

use serde::{Deserialize, Serialize};

/// A directed, typed edge between two entity names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Free-text relation type label.
    pub relation_type: String,
}

impl Relation {
    /// Creates a relation triple.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Relation {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }

    /// Returns `true` if `name` is either endpoint of this relation.
    pub fn touches(&self, name: &str) -> bool {
        self.from == name || self.to == name
    }
}
