//! Graph document interpretation for context actions.
//!
//! # Responsibility
//! - Parse the opaque graph payload into a typed read model.
//! - Derive prerequisite statements among currently visible subnodes.
//!
//! # Invariants
//! - Malformed payloads and malformed edges degrade to empty output,
//!   never to an error: prerequisite display is best-effort.
//! - Edges referencing subnodes that are removed or no longer visible are
//!   silently dropped.
//! - Output ordering is stable: sources in first-appearance order over the
//!   document's edge order, targets in document order.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Prefix of every prerequisite statement, consumed as user-facing text.
const PREREQUISITE_STATEMENT_PREFIX: &str = "This node is a prerequisite for these nodes:";

/// Typed read model of a stored graph document payload.
///
/// Edges keep the document's member order: statement ordering follows the
/// position of each edge in the stored JSON, not its key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphDocumentPayload {
    /// Node records keyed by node key. Opaque to the interpreter.
    #[serde(default)]
    pub nodes: BTreeMap<String, serde_json::Value>,
    /// Edge records as `(key, edge)` pairs in document order.
    #[serde(default, deserialize_with = "edges_in_document_order")]
    pub edges: Vec<(String, GraphEdge)>,
}

fn edges_in_document_order<'de, D>(deserializer: D) -> Result<Vec<(String, GraphEdge)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EdgeMapVisitor;

    impl<'de> Visitor<'de> for EdgeMapVisitor {
        type Value = Vec<(String, GraphEdge)>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map of edge records")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut edges = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                edges.push(entry);
            }
            Ok(edges)
        }
    }

    deserializer.deserialize_map(EdgeMapVisitor)
}

/// One directed edge of the document.
///
/// Endpoint fields are optional so that individually malformed edges are
/// skipped instead of poisoning the whole document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphEdge {
    /// Source node public id, verbatim as stored.
    #[serde(default)]
    pub source: Option<String>,
    /// Target node public id, verbatim as stored.
    #[serde(default)]
    pub target: Option<String>,
}

/// One derived prerequisite statement, attributed to its source subnode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAction {
    /// Source node identifier, verbatim from the document.
    pub source: String,
    /// User-facing statement text.
    pub statement: String,
}

/// Parses a raw payload, returning `None` when the document is malformed.
pub fn parse_payload(raw: &str) -> Option<GraphDocumentPayload> {
    serde_json::from_str(raw).ok()
}

/// Derives prerequisite statements from `payload` among `visible_subnodes`.
///
/// Only edges whose source and target are both currently visible subnode
/// identifiers produce output. Statements are grouped by source; repeated
/// identical targets for one source collapse to a single mention.
pub fn compute_context_actions(
    payload: &GraphDocumentPayload,
    visible_subnodes: &HashSet<String>,
) -> Vec<ContextAction> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();

    for (_, edge) in &payload.edges {
        let (Some(source), Some(target)) = (edge.source.as_deref(), edge.target.as_deref()) else {
            continue;
        };
        if !visible_subnodes.contains(source) || !visible_subnodes.contains(target) {
            continue;
        }

        match grouped.iter_mut().find(|(key, _)| key == source) {
            Some((_, targets)) => {
                if !targets.iter().any(|existing| existing == target) {
                    targets.push(target.to_string());
                }
            }
            None => grouped.push((source.to_string(), vec![target.to_string()])),
        }
    }

    grouped
        .into_iter()
        .map(|(source, targets)| ContextAction {
            statement: format!("{PREREQUISITE_STATEMENT_PREFIX} {}", targets.join(", ")),
            source,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compute_context_actions, parse_payload};
    use std::collections::HashSet;

    fn visible(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn malformed_payload_parses_to_none() {
        assert!(parse_payload("{\"edges\": 5}").is_none());
        assert!(parse_payload("not json").is_none());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let payload = parse_payload("{}").unwrap();
        assert!(payload.nodes.is_empty());
        assert!(payload.edges.is_empty());
    }

    #[test]
    fn edge_with_missing_endpoint_is_skipped() {
        let payload =
            parse_payload(r#"{"edges": {"e1": {"source": "a"}, "e2": {"target": "b"}}}"#).unwrap();
        let actions = compute_context_actions(&payload, &visible(&["a", "b"]));
        assert!(actions.is_empty());
    }

    #[test]
    fn statements_group_targets_per_source_in_document_order() {
        let payload = parse_payload(
            r#"{"edges": {
                "e1": {"source": "a", "target": "b"},
                "e2": {"source": "a", "target": "c"},
                "e3": {"source": "b", "target": "c"}
            }}"#,
        )
        .unwrap();
        let actions = compute_context_actions(&payload, &visible(&["a", "b", "c"]));
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].source, "a");
        assert_eq!(
            actions[0].statement,
            "This node is a prerequisite for these nodes: b, c"
        );
        assert_eq!(actions[1].source, "b");
        assert_eq!(
            actions[1].statement,
            "This node is a prerequisite for these nodes: c"
        );
    }

    #[test]
    fn edge_order_follows_the_document_not_the_key_text() {
        // "e10" sorts before "e2" lexicographically; the document wins.
        let payload = parse_payload(
            r#"{"edges": {
                "e2": {"source": "a", "target": "b"},
                "e10": {"source": "a", "target": "c"}
            }}"#,
        )
        .unwrap();
        assert_eq!(payload.edges[0].0, "e2");
        let actions = compute_context_actions(&payload, &visible(&["a", "b", "c"]));
        assert_eq!(
            actions[0].statement,
            "This node is a prerequisite for these nodes: b, c"
        );
    }

    #[test]
    fn invisible_endpoints_drop_the_edge_silently() {
        let payload = parse_payload(r#"{"edges": {"e1": {"source": "a", "target": "b"}}}"#).unwrap();
        assert!(compute_context_actions(&payload, &visible(&["a"])).is_empty());
        assert!(compute_context_actions(&payload, &visible(&["b"])).is_empty());
        assert_eq!(compute_context_actions(&payload, &visible(&["a", "b"])).len(), 1);
    }

    #[test]
    fn duplicate_edges_collapse_to_one_mention() {
        let payload = parse_payload(
            r#"{"edges": {
                "e1": {"source": "a", "target": "b"},
                "e2": {"source": "a", "target": "b"}
            }}"#,
        )
        .unwrap();
        let actions = compute_context_actions(&payload, &visible(&["a", "b"]));
        assert_eq!(actions.len(), 1);
        assert_eq!(
            actions[0].statement,
            "This node is a prerequisite for these nodes: b"
        );
    }
}
