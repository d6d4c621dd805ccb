//! On-disk layout: section markers, line records, and legacy detection.
//!
//! The file is UTF-8 text with sections in fixed order, each preceded by a
//! unique marker line:
//!
//! ```text
//! ===INDEX_START===
//! <JSON index payload>
//! ===INDEX_END===
//! ===DATA_START===
//! <one JSON object per line>
//! ```
//!
//! Data lines carry a `"type"` discriminator (`"entity"` or `"relation"`).
//! A file with no `===INDEX_START===` marker is the legacy format: the same
//! newline-delimited records with no index section at all. Parsing is
//! best-effort -- a malformed line is skipped with a warning, and a line
//! whose discriminator is unrecognized is ignored -- so one bad record never
//! makes the rest of the file unusable.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use mnemo_core::{Entity, KnowledgeGraph, Relation};

/// Marker line opening the index section.
pub const INDEX_START: &str = "===INDEX_START===";
/// Marker line closing the index section.
pub const INDEX_END: &str = "===INDEX_END===";
/// Marker line opening the data section.
pub const DATA_START: &str = "===DATA_START===";

/// One line of the data section (or of a legacy file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataRecord {
    /// `{"type": "entity", "name": ..., "entityType": ..., "observations": [...]}`
    Entity(Entity),
    /// `{"type": "relation", "from": ..., "to": ..., "relationType": ...}`
    Relation(Relation),
}

/// Outcome of locating the index payload between its markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSection<'a> {
    /// No `===INDEX_START===` marker: the whole file is legacy format.
    Missing,
    /// Markers present but unusable (end marker absent or before the start
    /// marker). The caller falls back to rebuild-from-data.
    Malformed,
    /// The substring between the start and end markers.
    Payload(&'a str),
}

/// Locates the index payload in `content`.
pub fn index_section(content: &str) -> IndexSection<'_> {
    let Some(start) = content.find(INDEX_START) else {
        return IndexSection::Missing;
    };
    let payload_start = start + INDEX_START.len();
    match content[payload_start..].find(INDEX_END) {
        Some(offset) => IndexSection::Payload(content[payload_start..payload_start + offset].trim()),
        None => {
            // Covers both a missing end marker and one that precedes the
            // start marker (it would not be found in the remainder).
            IndexSection::Malformed
        }
    }
}

/// Returns the data section of `content`: everything after the
/// `===DATA_START===` marker, or the entire content when the marker is
/// absent (legacy format).
pub fn data_section(content: &str) -> &str {
    match content.find(DATA_START) {
        Some(start) => &content[start + DATA_START.len()..],
        None => content,
    }
}

/// Parses one data line. Returns `None` for lines that should be skipped:
/// malformed JSON, records missing required fields, and unrecognized
/// discriminators.
pub fn parse_line(line: &str) -> Option<DataRecord> {
    match serde_json::from_str::<DataRecord>(line) {
        Ok(record) => Some(record),
        Err(err) => {
            // Unrecognized discriminators are ignored without noise; anything
            // else is a corrupt record worth flagging.
            let discriminator = serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(String::from));
            match discriminator.as_deref() {
                Some(other) if other != "entity" && other != "relation" => {
                    tracing::debug!(record_type = other, "ignoring unrecognized record type");
                }
                _ => {
                    tracing::warn!(error = %err, "skipping malformed data line");
                }
            }
            None
        }
    }
}

/// Parses a data section (or a whole legacy file) into a graph, skipping
/// malformed records.
pub fn parse_graph(data: &str) -> KnowledgeGraph {
    let mut entities = Vec::new();
    let mut relations = Vec::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(DataRecord::Entity(entity)) => entities.push(entity),
            Some(DataRecord::Relation(relation)) => relations.push(relation),
            None => {}
        }
    }
    KnowledgeGraph::from_parts(entities, relations)
}

/// Renders the complete file content: index section followed by the data
/// section, entities before relations, one JSON record per line.
///
/// Both sections are always written together -- a split write would let the
/// index and data diverge, which the load path treats as corruption.
pub fn render(index_payload: &str, graph: &KnowledgeGraph) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    out.push_str(INDEX_START);
    out.push('\n');
    out.push_str(index_payload);
    out.push('\n');
    out.push_str(INDEX_END);
    out.push('\n');
    out.push_str(DATA_START);
    out.push('\n');
    for entity in graph.entities() {
        let record = serde_json::to_string(&DataRecord::Entity(entity.clone()))?;
        let _ = writeln!(out, "{record}");
    }
    for relation in graph.relations() {
        let record = serde_json::to_string(&DataRecord::Relation(relation.clone()))?;
        let _ = writeln!(out, "{record}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_record_round_trips_with_discriminator() {
        let record = DataRecord::Entity(Entity::with_observations("Alice", "person", ["a"]));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""type":"entity""#));
        assert!(json.contains(r#""entityType":"person""#));
        assert_eq!(parse_line(&json), Some(record));
    }

    #[test]
    fn relation_record_round_trips_with_discriminator() {
        let record = DataRecord::Relation(Relation::new("Alice", "Bob", "knows"));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""type":"relation""#));
        assert_eq!(parse_line(&json), Some(record));
    }

    #[test]
    fn parse_line_skips_unknown_discriminator() {
        assert_eq!(parse_line(r#"{"type":"widget","name":"x"}"#), None);
    }

    #[test]
    fn parse_line_skips_malformed_json() {
        assert_eq!(parse_line(r#"{"type":"entity","name":"#), None);
        assert_eq!(parse_line("not json at all"), None);
    }

    #[test]
    fn parse_line_skips_record_missing_required_fields() {
        assert_eq!(parse_line(r#"{"type":"entity","observations":[]}"#), None);
        assert_eq!(parse_line(r#"{"type":"relation","from":"A"}"#), None);
    }

    #[test]
    fn index_section_missing_without_start_marker() {
        assert_eq!(index_section("{\"type\":\"entity\"}\n"), IndexSection::Missing);
    }

    #[test]
    fn index_section_malformed_without_end_marker() {
        let content = format!("{INDEX_START}\n{{}}\n");
        assert_eq!(index_section(&content), IndexSection::Malformed);
    }

    #[test]
    fn index_section_malformed_when_end_precedes_start() {
        let content = format!("{INDEX_END}\n{INDEX_START}\n{{}}\n");
        assert_eq!(index_section(&content), IndexSection::Malformed);
    }

    #[test]
    fn index_section_extracts_payload_between_markers() {
        let content = format!("{INDEX_START}\n{{\"k\":1}}\n{INDEX_END}\n{DATA_START}\n");
        assert_eq!(index_section(&content), IndexSection::Payload("{\"k\":1}"));
    }

    #[test]
    fn data_section_falls_back_to_whole_content() {
        let legacy = "{\"type\":\"entity\",\"name\":\"A\",\"entityType\":\"t\"}\n";
        assert_eq!(data_section(legacy), legacy);
    }

    #[test]
    fn parse_graph_is_best_effort() {
        let data = concat!(
            "{\"type\":\"entity\",\"name\":\"Alice\",\"entityType\":\"person\",\"observations\":[]}\n",
            "garbage line\n",
            "{\"type\":\"widget\",\"name\":\"ignored\"}\n",
            "{\"type\":\"relation\",\"from\":\"Alice\",\"to\":\"Bob\",\"relationType\":\"knows\"}\n",
        );
        let graph = parse_graph(data);
        assert_eq!(graph.entity_count(), 1);
        assert_eq!(graph.relation_count(), 1);
    }

    #[test]
    fn render_writes_sections_in_fixed_order() {
        let mut graph = KnowledgeGraph::new();
        graph.insert_entity(Entity::new("Alice", "person"));
        graph.insert_relation(Relation::new("Alice", "Bob", "knows"));
        let content = render("{}", &graph).unwrap();

        let index_pos = content.find(INDEX_START).unwrap();
        let end_pos = content.find(INDEX_END).unwrap();
        let data_pos = content.find(DATA_START).unwrap();
        assert!(index_pos < end_pos && end_pos < data_pos);

        let parsed = parse_graph(data_section(&content));
        assert_eq!(parsed, graph);
    }
}
